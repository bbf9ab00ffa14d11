//! Substring classification of upstream error text.
//!
//! Upstream error wording is controlled by a third party and can change; this
//! table gives every failure a small, stable, client-actionable vocabulary.
//! Errors raised inside this service carry a tagged kind and skip this path
//! entirely; the table is the fallback for text that crossed an untyped
//! boundary.

use axum::http::StatusCode;

pub const GEMINI_API_KEY_MISSING: &str = "GEMINI_API_KEY_MISSING";
pub const INVALID_API_KEY: &str = "INVALID_API_KEY";
pub const UNSUPPORTED_VIDEO_SOURCE: &str = "UNSUPPORTED_VIDEO_SOURCE";
pub const GEMINI_UPSTREAM_ERROR: &str = "GEMINI_UPSTREAM_ERROR";
pub const INVALID_REQUEST: &str = "INVALID_REQUEST";
pub const INTERNAL_SERVER_ERROR: &str = "INTERNAL_SERVER_ERROR";
pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
pub const NOT_FOUND: &str = "NOT_FOUND";

/// A single predicate over the lowercased error message.
enum Matcher {
    Contains(&'static str),
    StartsWith(&'static str),
}

impl Matcher {
    fn matches(&self, message: &str) -> bool {
        match self {
            Matcher::Contains(needle) => message.contains(needle),
            Matcher::StartsWith(prefix) => message.starts_with(prefix),
        }
    }
}

struct Rule {
    matchers: &'static [Matcher],
    status: StatusCode,
    code: &'static str,
}

/// Evaluated strictly in order; the first rule with any matching predicate
/// wins. Order is load-bearing: "invalid api key" must classify before the
/// generic "invalid" rule below it.
const RULES: &[Rule] = &[
    // Missing API key (server misconfiguration)
    Rule {
        matchers: &[Matcher::Contains("api key is missing")],
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: GEMINI_API_KEY_MISSING,
    },
    // Invalid API key (authentication error)
    Rule {
        matchers: &[
            Matcher::Contains("invalid api key"),
            Matcher::Contains("authentication"),
            Matcher::Contains("permission denied"),
            Matcher::Contains("api key not valid"),
        ],
        status: StatusCode::UNAUTHORIZED,
        code: INVALID_API_KEY,
    },
    // Unsupported video source
    Rule {
        matchers: &[Matcher::Contains("only youtube urls are supported")],
        status: StatusCode::BAD_REQUEST,
        code: UNSUPPORTED_VIDEO_SOURCE,
    },
    // Direct Gemini API failure
    Rule {
        matchers: &[Matcher::Contains("gemini api error")],
        status: StatusCode::BAD_GATEWAY,
        code: GEMINI_UPSTREAM_ERROR,
    },
    // Generic validation errors
    Rule {
        matchers: &[
            Matcher::Contains("missing or invalid"),
            Matcher::StartsWith("missing "),
            Matcher::Contains("invalid"),
        ],
        status: StatusCode::BAD_REQUEST,
        code: INVALID_REQUEST,
    },
];

/// Infer a status/code pair from an error message.
///
/// An explicit code from the caller wins over every rule; otherwise the rules
/// run in order against the lowercased message, and an unmatched message falls
/// back to the caller-supplied default status with `INTERNAL_SERVER_ERROR`.
pub fn infer(
    message: &str,
    default_status: StatusCode,
    explicit_code: Option<&'static str>,
) -> (StatusCode, &'static str) {
    if let Some(code) = explicit_code {
        return (default_status, code);
    }

    let normalized = message.to_lowercase();

    for rule in RULES {
        if rule.matchers.iter().any(|m| m.matches(&normalized)) {
            return (rule.status, rule.code);
        }
    }

    (default_status, INTERNAL_SERVER_ERROR)
}
