//! Admission glue shared by the endpoint handlers: identity resolution,
//! the rate-limit check, and the 429/header plumbing around it.

use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::ratelimit::{EndpointClass, RateLimitDecision};
use crate::server::AppState;

use super::identity;

/// Outcome of a passed admission check, carried through the handler so the
/// success response can echo the rate-limit headers and the persistence step
/// knows the authenticated user.
pub(crate) struct Admission {
    pub user_id: Option<String>,
    pub decision: RateLimitDecision,
}

/// Resolve the caller and consult the admission controller. A denial
/// short-circuits the handler with a ready 429 response; orchestration is
/// never attempted.
pub(crate) fn admit(
    state: &AppState,
    headers: &axum::http::HeaderMap,
    class: EndpointClass,
) -> Result<Admission, Response> {
    let user_id = identity::authenticate(state, headers);
    let ip = identity::client_ip(headers);
    let identifier = identity::resolve_identifier(user_id.as_deref(), ip.as_deref());

    let decision = state.admission.check(class, &identifier);

    match decision {
        RateLimitDecision::Allowed { .. } => Ok(Admission { user_id, decision }),
        RateLimitDecision::Denied {
            retry_after_secs,
            limit,
            reset_at_ms,
        } => {
            let window = state.admission.window_for(class).window_seconds;
            Err(deny_response(
                class,
                window,
                retry_after_secs,
                limit,
                reset_at_ms,
            ))
        }
    }
}

/// Build the 429 response with retry metadata and rate-limit headers.
fn deny_response(
    class: EndpointClass,
    window_seconds: u64,
    retry_after_secs: u64,
    limit: u32,
    reset_at_ms: i64,
) -> Response {
    let body = json!({
        "error": "Rate limit exceeded",
        "message": format!(
            "You've reached the limit of {} {} per {}. Please try again later.",
            limit,
            class.describe(),
            describe_window(window_seconds),
        ),
        "retryAfter": retry_after_secs,
        "limit": limit,
        "reset": reset_at_ms,
    });

    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();

    let headers = response.headers_mut();
    if let Ok(v) = HeaderValue::from_str(&retry_after_secs.to_string()) {
        headers.insert("Retry-After", v);
    }
    if let Ok(v) = HeaderValue::from_str(&limit.to_string()) {
        headers.insert("X-RateLimit-Limit", v);
    }
    headers.insert("X-RateLimit-Remaining", HeaderValue::from_static("0"));
    if let Ok(v) = HeaderValue::from_str(&reset_at_ms.to_string()) {
        headers.insert("X-RateLimit-Reset", v);
    }

    response
}

/// Attach rate-limit headers to a successful response.
pub(crate) fn with_rate_limit_headers(
    mut response: Response,
    decision: &RateLimitDecision,
) -> Response {
    let headers = response.headers_mut();
    if let Ok(v) = HeaderValue::from_str(&decision.limit().to_string()) {
        headers.insert("X-RateLimit-Limit", v);
    }
    if let Ok(v) = HeaderValue::from_str(&decision.remaining().to_string()) {
        headers.insert("X-RateLimit-Remaining", v);
    }
    if let Ok(v) = HeaderValue::from_str(&decision.reset_at_ms().to_string()) {
        headers.insert("X-RateLimit-Reset", v);
    }
    response
}

fn describe_window(window_seconds: u64) -> String {
    match window_seconds {
        3600 => "hour".to_string(),
        60 => "minute".to_string(),
        s if s % 3600 == 0 => format!("{} hours", s / 3600),
        s if s % 60 == 0 => format!("{} minutes", s / 60),
        s => format!("{} seconds", s),
    }
}
