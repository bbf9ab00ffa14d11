//! Caller identity resolution.
//!
//! Authenticated user id wins over the network address, which wins over the
//! anonymous fallback. Preferring authenticated identity keeps callers behind
//! a shared IP from eating each other's budget.

use axum::http::{header, HeaderMap};

use crate::server::AppState;

/// Best-effort client address from proxy headers: first entry of
/// `x-forwarded-for`, then `x-real-ip`.
pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    if let Some(forwarded) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let trimmed = first.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }

    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

pub fn resolve_identifier(user_id: Option<&str>, ip: Option<&str>) -> String {
    user_id.or(ip).unwrap_or("anonymous").to_string()
}

/// Optional authentication: a valid bearer token yields the user id, anything
/// else is guest mode. Video endpoints never fail on auth problems.
pub fn authenticate(state: &AppState, headers: &HeaderMap) -> Option<String> {
    let token = headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")?;

    state
        .jwt_validator
        .validate(token)
        .ok()
        .map(|claims| claims.sub)
}
