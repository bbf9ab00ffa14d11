use axum::http::StatusCode;
use thiserror::Error;

use crate::error::classify;

/// Failures from the generation pipeline, tagged at the point of failure.
///
/// Carrying the kind as a variant keeps classification machine-checkable;
/// upstream wording is not contractually stable, so the substring rules in
/// `error::classify` are only a fallback for text that crossed an untyped
/// boundary.
#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("Gemini API key is missing. Provide an apiKey in the request or configure one on the server.")]
    MissingApiKey,

    #[error("Invalid API key. Please check your Gemini API key and try again. ({details})")]
    InvalidApiKey { details: String },

    #[error("Only YouTube URLs are supported as a video source (got '{url}').")]
    UnsupportedSource { url: String },

    #[error("Gemini API returned an empty response.")]
    EmptyResponse,

    #[error("Gemini API request timed out after {seconds}s.")]
    Timeout { seconds: u64 },

    #[error("Gemini API error: {message}")]
    Upstream {
        status: Option<u16>,
        message: String,
    },
}

impl GeminiError {
    /// Map the tagged kind to its wire-level status and error code.
    pub fn classification(&self) -> (StatusCode, &'static str) {
        match self {
            GeminiError::MissingApiKey => (
                StatusCode::INTERNAL_SERVER_ERROR,
                classify::GEMINI_API_KEY_MISSING,
            ),
            GeminiError::InvalidApiKey { .. } => {
                (StatusCode::UNAUTHORIZED, classify::INVALID_API_KEY)
            }
            GeminiError::UnsupportedSource { .. } => {
                (StatusCode::BAD_REQUEST, classify::UNSUPPORTED_VIDEO_SOURCE)
            }
            GeminiError::EmptyResponse
            | GeminiError::Timeout { .. }
            | GeminiError::Upstream { .. } => {
                (StatusCode::BAD_GATEWAY, classify::GEMINI_UPSTREAM_ERROR)
            }
        }
    }

    /// True for failures caused by a missing or rejected credential; handlers
    /// use this to pick the bring-your-own-key fallback message.
    pub fn is_credential_error(&self) -> bool {
        matches!(
            self,
            GeminiError::MissingApiKey | GeminiError::InvalidApiKey { .. }
        )
    }
}

/// Credential-rejection signals seen in upstream error text. Checked after
/// the HTTP status, so a 401/403 never depends on wording alone.
pub(crate) fn looks_like_credential_rejection(message: &str) -> bool {
    let normalized = message.to_lowercase();
    ["api key", "authentication", "permission denied", "api key not valid"]
        .iter()
        .any(|needle| normalized.contains(needle))
}
