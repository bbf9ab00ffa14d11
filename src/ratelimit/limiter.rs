//! Admission controller: fixed-window counters per (endpoint class, caller).

use std::sync::Arc;

use serde::Serialize;

use crate::config::{RateLimitSettings, WindowSettings};

use super::clock::{Clock, SystemClock};
use super::store::{AdmissionStore, MemoryAdmissionStore, WindowKey};

/// Endpoint classes with independent request budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointClass {
    Analyze,
    Question,
    Transcript,
    Summarize,
    History,
    Auth,
}

impl EndpointClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointClass::Analyze => "analyze",
            EndpointClass::Question => "question",
            EndpointClass::Transcript => "transcript",
            EndpointClass::Summarize => "summarize",
            EndpointClass::History => "history",
            EndpointClass::Auth => "auth",
        }
    }

    /// Plural noun used in denial messages.
    pub fn describe(&self) -> &'static str {
        match self {
            EndpointClass::Analyze => "video analyses",
            EndpointClass::Question => "questions",
            EndpointClass::Transcript => "transcript requests",
            EndpointClass::Summarize => "summaries",
            EndpointClass::History => "history requests",
            EndpointClass::Auth => "sign-in attempts",
        }
    }
}

/// Result of one admission check. Derived per call, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// Request is allowed; the window counter was incremented.
    Allowed {
        remaining: u32,
        limit: u32,
        reset_at_ms: i64,
    },
    /// Request is denied; the window counter is unchanged.
    Denied {
        retry_after_secs: u64,
        limit: u32,
        reset_at_ms: i64,
    },
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitDecision::Allowed { .. })
    }

    pub fn limit(&self) -> u32 {
        match self {
            RateLimitDecision::Allowed { limit, .. } => *limit,
            RateLimitDecision::Denied { limit, .. } => *limit,
        }
    }

    pub fn remaining(&self) -> u32 {
        match self {
            RateLimitDecision::Allowed { remaining, .. } => *remaining,
            RateLimitDecision::Denied { .. } => 0,
        }
    }

    pub fn reset_at_ms(&self) -> i64 {
        match self {
            RateLimitDecision::Allowed { reset_at_ms, .. } => *reset_at_ms,
            RateLimitDecision::Denied { reset_at_ms, .. } => *reset_at_ms,
        }
    }
}

/// Decides whether a caller may issue a request before any expensive work
/// happens.
///
/// Fixed-window semantics: a burst at the very end of a window followed by
/// another at the start of the next can admit up to twice the budget across
/// the boundary. That is accepted behavior, not a defect to fix with a
/// sliding window.
///
/// Single-process by construction: the table lives in this process and is
/// never shared across instances. The `AdmissionStore` trait is the seam a
/// shared backend would plug into.
pub struct AdmissionController {
    store: Arc<dyn AdmissionStore>,
    clock: Arc<dyn Clock>,
    settings: RateLimitSettings,
}

impl AdmissionController {
    pub fn new(settings: RateLimitSettings) -> Self {
        Self::with_parts(
            settings,
            Arc::new(MemoryAdmissionStore::new()),
            Arc::new(SystemClock),
        )
    }

    pub fn with_parts(
        settings: RateLimitSettings,
        store: Arc<dyn AdmissionStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            clock,
            settings,
        }
    }

    pub fn window_for(&self, class: EndpointClass) -> WindowSettings {
        match class {
            EndpointClass::Analyze => self.settings.analyze,
            EndpointClass::Question => self.settings.question,
            EndpointClass::Transcript => self.settings.transcript,
            EndpointClass::Summarize => self.settings.summarize,
            EndpointClass::History => self.settings.history,
            EndpointClass::Auth => self.settings.auth,
        }
    }

    /// Check-and-increment for one request. Never fails; the store is
    /// in-process and lookups always succeed.
    pub fn check(&self, class: EndpointClass, identifier: &str) -> RateLimitDecision {
        let budget = self.window_for(class);
        let key = WindowKey::new(class, identifier);
        let decision = self.store.check(
            &key,
            budget.max_requests,
            budget.window(),
            self.clock.now_ms(),
        );

        match decision {
            RateLimitDecision::Allowed { remaining, .. } => {
                tracing::debug!(
                    class = class.as_str(),
                    identifier = %identifier,
                    remaining = remaining,
                    "Admission check passed"
                );
            }
            RateLimitDecision::Denied {
                retry_after_secs, ..
            } => {
                tracing::warn!(
                    class = class.as_str(),
                    identifier = %identifier,
                    retry_after = retry_after_secs,
                    "Rate limit exceeded"
                );
            }
        }

        decision
    }

    /// Delete every window whose reset time has elapsed. Invoked by the
    /// background sweep task, independent of request traffic.
    pub fn sweep(&self) -> usize {
        self.store.sweep(self.clock.now_ms())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::clock::test_support::ManualClock;
    use crate::ratelimit::store::WindowRecord;
    use crate::ratelimit::WindowKey;

    const HOUR_MS: i64 = 3_600_000;

    fn controller(clock: Arc<ManualClock>) -> AdmissionController {
        AdmissionController::with_parts(
            RateLimitSettings::default(),
            Arc::new(MemoryAdmissionStore::new()),
            clock,
        )
    }

    #[test]
    fn test_full_window_then_denial() {
        // analyze budget is 10/hour: all ten pass with strictly decreasing
        // remaining, the eleventh is denied with the same reset.
        let clock = Arc::new(ManualClock::new(0));
        let limiter = controller(clock);

        let mut reset = None;
        for i in 0..10u32 {
            let decision = limiter.check(EndpointClass::Analyze, "user-1");
            assert!(decision.is_allowed());
            assert_eq!(decision.remaining(), 9 - i);
            match reset {
                None => reset = Some(decision.reset_at_ms()),
                Some(r) => assert_eq!(decision.reset_at_ms(), r),
            }
        }

        let denied = limiter.check(EndpointClass::Analyze, "user-1");
        assert!(!denied.is_allowed());
        assert_eq!(denied.remaining(), 0);
        assert_eq!(denied.reset_at_ms(), reset.unwrap());
    }

    #[test]
    fn test_window_rollover_starts_fresh() {
        let clock = Arc::new(ManualClock::new(0));
        let limiter = controller(clock.clone());

        for _ in 0..10 {
            limiter.check(EndpointClass::Analyze, "user-1");
        }
        assert!(!limiter.check(EndpointClass::Analyze, "user-1").is_allowed());

        clock.advance_ms(HOUR_MS + 1);

        let decision = limiter.check(EndpointClass::Analyze, "user-1");
        assert!(decision.is_allowed());
        assert_eq!(decision.remaining(), 9);
        assert_eq!(decision.reset_at_ms(), HOUR_MS + 1 + HOUR_MS);
    }

    #[test]
    fn test_identifier_isolation() {
        let clock = Arc::new(ManualClock::new(0));
        let limiter = controller(clock);

        for _ in 0..10 {
            assert!(limiter.check(EndpointClass::Analyze, "user-1").is_allowed());
        }
        assert!(!limiter.check(EndpointClass::Analyze, "user-1").is_allowed());

        // user-2 still has a full budget.
        let decision = limiter.check(EndpointClass::Analyze, "user-2");
        assert!(decision.is_allowed());
        assert_eq!(decision.remaining(), 9);
    }

    #[test]
    fn test_endpoint_class_isolation() {
        let clock = Arc::new(ManualClock::new(0));
        let limiter = controller(clock);

        for _ in 0..10 {
            limiter.check(EndpointClass::Analyze, "user-1");
        }
        assert!(!limiter.check(EndpointClass::Analyze, "user-1").is_allowed());

        // Same identifier under a different class keeps its own counter.
        let decision = limiter.check(EndpointClass::Question, "user-1");
        assert!(decision.is_allowed());
        assert_eq!(decision.remaining(), 49);
    }

    #[test]
    fn test_three_checks_against_budget_of_two() {
        let clock = Arc::new(ManualClock::new(0));
        let settings = RateLimitSettings {
            analyze: crate::config::WindowSettings {
                window_seconds: 3600,
                max_requests: 2,
            },
            ..RateLimitSettings::default()
        };
        let limiter = AdmissionController::with_parts(
            settings,
            Arc::new(MemoryAdmissionStore::new()),
            clock,
        );

        let first = limiter.check(EndpointClass::Analyze, "user-1");
        let second = limiter.check(EndpointClass::Analyze, "user-1");
        let third = limiter.check(EndpointClass::Analyze, "user-1");

        assert!(first.is_allowed());
        assert_eq!(first.remaining(), 1);
        assert!(second.is_allowed());
        assert_eq!(second.remaining(), 0);
        assert!(!third.is_allowed());
        assert_eq!(third.remaining(), 0);

        assert_eq!(first.reset_at_ms(), second.reset_at_ms());
        assert_eq!(second.reset_at_ms(), third.reset_at_ms());
    }

    #[test]
    fn test_sweep_bounds_table_size() {
        let clock = Arc::new(ManualClock::new(0));
        let store = Arc::new(MemoryAdmissionStore::new());
        let limiter = AdmissionController::with_parts(
            RateLimitSettings::default(),
            store.clone(),
            clock.clone(),
        );

        limiter.check(EndpointClass::Analyze, "user-1");
        limiter.check(EndpointClass::Question, "user-2");
        assert_eq!(store.len(), 2);

        // Nothing has expired yet.
        assert_eq!(limiter.sweep(), 0);

        clock.advance_ms(2 * HOUR_MS);
        assert_eq!(limiter.sweep(), 2);
        assert!(store
            .get(&WindowKey::new(EndpointClass::Analyze, "user-1"))
            .is_none());
    }

    #[test]
    fn test_sweep_is_independent_of_access() {
        // A record left behind by a caller that never returns still gets
        // collected.
        let clock = Arc::new(ManualClock::new(0));
        let store = Arc::new(MemoryAdmissionStore::new());
        store.set(
            WindowKey::new(EndpointClass::Transcript, "ghost"),
            WindowRecord {
                count: 20,
                reset_at_ms: 1,
            },
        );
        let limiter = AdmissionController::with_parts(
            RateLimitSettings::default(),
            store.clone(),
            clock.clone(),
        );

        clock.advance_ms(10);
        assert_eq!(limiter.sweep(), 1);
        assert_eq!(store.len(), 0);
    }
}
