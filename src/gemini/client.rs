//! HTTP client for the Gemini generateContent API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, ClientBuilder, StatusCode};
use serde_json::{json, Value};
use tokio::time::timeout;

use crate::config::GeminiConfig;

use super::error::{looks_like_credential_rejection, GeminiError};

/// One part of a generation prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text(String),
    /// A video reference passed through to the model as file data.
    VideoUri(String),
}

/// Black-box text generation. The orchestrator depends on this seam only;
/// tests substitute scripted implementations.
#[async_trait]
pub trait GenerateContent: Send + Sync {
    /// Generate text from the given prompt parts. `api_key_override` lets a
    /// caller supply their own credential instead of the server-side one.
    async fn generate(
        &self,
        parts: &[Part],
        api_key_override: Option<&str>,
    ) -> Result<String, GeminiError>;
}

/// Gemini REST client (Google AI Studio endpoint family).
#[derive(Debug, Clone)]
pub struct GeminiClient {
    config: GeminiConfig,
    http_client: Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, GeminiError> {
        let http_client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .build()
            .map_err(|e| GeminiError::Upstream {
                status: None,
                message: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn endpoint(&self) -> String {
        // Accept model ids with or without the "models/" prefix.
        let model = self
            .config
            .model
            .strip_prefix("models/")
            .unwrap_or(&self.config.model);
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            model
        )
    }

    fn request_body(parts: &[Part]) -> Value {
        let parts: Vec<Value> = parts
            .iter()
            .map(|part| match part {
                Part::Text(text) => json!({ "text": text }),
                Part::VideoUri(uri) => json!({
                    "fileData": {
                        "fileUri": uri,
                        "mimeType": "video/*",
                    }
                }),
            })
            .collect();

        json!({
            "contents": [{
                "role": "user",
                "parts": parts,
            }]
        })
    }

    fn map_failure(status: StatusCode, body: &str) -> GeminiError {
        // Credential rejections are tagged from the status first, so the
        // classification never depends on upstream wording alone.
        if status == StatusCode::UNAUTHORIZED
            || status == StatusCode::FORBIDDEN
            || looks_like_credential_rejection(body)
        {
            return GeminiError::InvalidApiKey {
                details: format!("{}: {}", status.as_u16(), body),
            };
        }

        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| {
                v.get("error")
                    .and_then(|e| e.get("message"))
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| body.to_string());

        GeminiError::Upstream {
            status: Some(status.as_u16()),
            message: format!("{} {}", status.as_u16(), message),
        }
    }

    /// Pull the generated text out of a generateContent response.
    fn extract_text(response: &Value) -> Result<String, GeminiError> {
        let text = response
            .get("candidates")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .and_then(|candidate| candidate.get("content"))
            .and_then(|content| content.get("parts"))
            .and_then(|parts| parts.as_array())
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(GeminiError::EmptyResponse);
        }

        Ok(text)
    }
}

#[async_trait]
impl GenerateContent for GeminiClient {
    async fn generate(
        &self,
        parts: &[Part],
        api_key_override: Option<&str>,
    ) -> Result<String, GeminiError> {
        // Fail fast before any network call when no credential is available.
        let api_key = api_key_override
            .or(self.config.api_key.as_deref())
            .ok_or(GeminiError::MissingApiKey)?;

        let url = self.endpoint();
        let body = Self::request_body(parts);

        tracing::debug!(model = %self.config.model, "Calling Gemini generateContent");

        let response = timeout(
            Duration::from_secs(self.config.request_timeout_seconds),
            self.http_client
                .post(&url)
                .header(CONTENT_TYPE, "application/json")
                .header("x-goog-api-key", api_key)
                .json(&body)
                .send(),
        )
        .await
        .map_err(|_| GeminiError::Timeout {
            seconds: self.config.request_timeout_seconds,
        })?
        .map_err(|e| {
            if e.is_timeout() {
                GeminiError::Timeout {
                    seconds: self.config.request_timeout_seconds,
                }
            } else {
                GeminiError::Upstream {
                    status: None,
                    message: format!("network error: {e}"),
                }
            }
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| GeminiError::Upstream {
            status: Some(status.as_u16()),
            message: format!("failed to read response: {e}"),
        })?;

        if !status.is_success() {
            return Err(Self::map_failure(status, &text));
        }

        let json_response: Value =
            serde_json::from_str(&text).map_err(|e| GeminiError::Upstream {
                status: Some(status.as_u16()),
                message: format!("failed to parse response JSON: {e}"),
            })?;

        // Some failures arrive as a 200 with an error object.
        if let Some(error) = json_response.get("error") {
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown API error");
            if looks_like_credential_rejection(message) {
                return Err(GeminiError::InvalidApiKey {
                    details: message.to_string(),
                });
            }
            return Err(GeminiError::Upstream {
                status: error.get("code").and_then(|c| c.as_u64()).map(|c| c as u16),
                message: message.to_string(),
            });
        }

        Self::extract_text(&json_response)
    }
}
