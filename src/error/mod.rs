//! Unified API error shape.
//!
//! Every error response carries the same JSON body: a safe per-endpoint
//! fallback message, a machine-readable code, the original error message for
//! debugging, and an optional context tag naming the operation.

pub mod classify;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::gemini::GeminiError;

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    /// Safe, fixed message for the client; never raw upstream text.
    message: String,
    /// Original error message, surfaced only as a debug string.
    details: String,
    context: Option<&'static str>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(rename = "errorCode")]
    error_code: &'static str,
    details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<&'static str>,
}

impl ApiError {
    pub fn new(
        status: StatusCode,
        code: &'static str,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            details: details.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: &'static str) -> Self {
        self.context = Some(context);
        self
    }

    /// Normalize an error that crossed an untyped boundary: run the message
    /// through the ordered classification rules.
    pub fn normalize(
        details: impl Into<String>,
        fallback: impl Into<String>,
        default_status: StatusCode,
        explicit_code: Option<&'static str>,
    ) -> Self {
        let details = details.into();
        let (status, code) = classify::infer(&details, default_status, explicit_code);
        Self::new(status, code, fallback, details)
    }

    /// Tagged fast path for orchestrator failures: the kind decides the
    /// status/code directly, without re-deriving intent from prose.
    pub fn from_gemini(err: &GeminiError, fallback: impl Into<String>) -> Self {
        let (status, code) = err.classification();
        Self::new(status, code, fallback, err.to_string())
    }

    /// Validation failure on a request body field.
    pub fn invalid_request(details: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            classify::INVALID_REQUEST,
            "Invalid request body.",
            details,
        )
    }

    pub fn unauthorized(details: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            classify::UNAUTHORIZED,
            "Authentication required.",
            details,
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Always log the detailed error server-side
        tracing::error!(
            code = %self.code,
            status = %self.status.as_u16(),
            context = self.context.unwrap_or("-"),
            details = %self.details,
            "API error"
        );

        let body = ErrorBody {
            error: self.message,
            error_code: self.code,
            details: self.details,
            context: self.context,
        };

        (self.status, Json(body)).into_response()
    }
}
