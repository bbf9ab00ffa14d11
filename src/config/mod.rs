mod settings;

pub use settings::{
    AuthConfig, DatabaseConfig, GeminiConfig, RateLimitSettings, ServerConfig, Settings,
    WindowSettings,
};
