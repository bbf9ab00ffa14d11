use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub rate_limit: RateLimitSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiConfig {
    /// Server-side default API key; callers may override per request.
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// JWT validation is disabled when no secret is configured (guest-only mode).
    pub jwt_secret: Option<String>,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// History falls back to the in-memory store when unset.
    pub url: Option<String>,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_db_connect_timeout")]
    pub connect_timeout_seconds: u64,
}

/// One fixed-window budget for an endpoint class.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct WindowSettings {
    pub window_seconds: u64,
    pub max_requests: u32,
}

impl WindowSettings {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSettings {
    /// Video analysis is the most expensive operation, so the strictest budget.
    #[serde(default = "default_analyze_window")]
    pub analyze: WindowSettings,
    #[serde(default = "default_question_window")]
    pub question: WindowSettings,
    #[serde(default = "default_transcript_window")]
    pub transcript: WindowSettings,
    #[serde(default = "default_summarize_window")]
    pub summarize: WindowSettings,
    #[serde(default = "default_history_window")]
    pub history: WindowSettings,
    #[serde(default = "default_auth_window")]
    pub auth: WindowSettings,
    /// Interval of the expired-window sweep task in seconds.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_request_timeout() -> u64 {
    120
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_pool_size() -> u32 {
    5
}

fn default_db_connect_timeout() -> u64 {
    5
}

fn default_analyze_window() -> WindowSettings {
    WindowSettings {
        window_seconds: 3600,
        max_requests: 10,
    }
}

fn default_question_window() -> WindowSettings {
    WindowSettings {
        window_seconds: 3600,
        max_requests: 50,
    }
}

fn default_transcript_window() -> WindowSettings {
    WindowSettings {
        window_seconds: 3600,
        max_requests: 20,
    }
}

fn default_summarize_window() -> WindowSettings {
    WindowSettings {
        window_seconds: 3600,
        max_requests: 30,
    }
}

fn default_history_window() -> WindowSettings {
    WindowSettings {
        window_seconds: 60,
        max_requests: 60,
    }
}

fn default_auth_window() -> WindowSettings {
    WindowSettings {
        window_seconds: 900,
        max_requests: 10,
    }
}

fn default_sweep_interval() -> u64 {
    60
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("gemini.model", "gemini-2.5-flash")?
            .set_default(
                "gemini.base_url",
                "https://generativelanguage.googleapis.com/v1beta",
            )?
            .set_default("rate_limit.sweep_interval_seconds", 60)?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Load from environment variables
            // SERVER_HOST, SERVER_PORT, GEMINI_API_KEY, GEMINI_MODEL, DATABASE_URL, etc.
            .add_source(
                Environment::default()
                    .separator("_")
                    .try_parsing(true)
                    .list_separator(","),
            );

        // Multi-word keys do not round-trip through the "_" separator; map
        // the common ones explicitly.
        let mut builder = builder;
        if let Ok(key) = env::var("GEMINI_API_KEY") {
            builder = builder.set_override("gemini.api_key", key)?;
        }
        if let Ok(secret) = env::var("AUTH_JWT_SECRET") {
            builder = builder.set_override("auth.jwt_secret", secret)?;
        }

        builder.build()?.try_deserialize()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            base_url: default_base_url(),
            request_timeout_seconds: default_request_timeout(),
            connect_timeout_seconds: default_connect_timeout(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            pool_size: default_pool_size(),
            connect_timeout_seconds: default_db_connect_timeout(),
        }
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            analyze: default_analyze_window(),
            question: default_question_window(),
            transcript: default_transcript_window(),
            summarize: default_summarize_window(),
            history: default_history_window(),
            auth: default_auth_window(),
            sweep_interval_seconds: default_sweep_interval(),
        }
    }
}
