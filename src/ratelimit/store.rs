//! Window record storage for the admission controller.

use std::time::Duration;

use dashmap::DashMap;

use super::limiter::{EndpointClass, RateLimitDecision};

/// Table key. Windows are scoped per endpoint class as well as per caller, so
/// two endpoint classes never share a counter for the same identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WindowKey {
    pub class: EndpointClass,
    pub identifier: String,
}

impl WindowKey {
    pub fn new(class: EndpointClass, identifier: impl Into<String>) -> Self {
        Self {
            class,
            identifier: identifier.into(),
        }
    }
}

/// One fixed window for one key. `reset_at_ms` is set when the window opens
/// and never moves; an expired record is replaced, not merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowRecord {
    pub count: u32,
    pub reset_at_ms: i64,
}

/// Storage seam for admission control.
///
/// `check` is the atomic check-and-increment: exactly one of "allowed, count
/// incremented" or "denied, count unchanged" happens per call, serialized per
/// key. The remaining operations exist for inspection, seeding in tests, and
/// the periodic sweep. A multi-instance deployment would swap this for a
/// shared-counter backend; that is out of scope here.
pub trait AdmissionStore: Send + Sync {
    fn check(
        &self,
        key: &WindowKey,
        limit: u32,
        window: Duration,
        now_ms: i64,
    ) -> RateLimitDecision;

    fn get(&self, key: &WindowKey) -> Option<WindowRecord>;

    fn set(&self, key: WindowKey, record: WindowRecord);

    fn delete(&self, key: &WindowKey);

    /// Remove every record whose window has already closed. Returns the
    /// number removed.
    fn sweep(&self, now_ms: i64) -> usize;
}

/// In-process store backing the single-instance deployment.
#[derive(Debug, Default)]
pub struct MemoryAdmissionStore {
    windows: DashMap<WindowKey, WindowRecord>,
}

impl MemoryAdmissionStore {
    pub fn new() -> Self {
        Self {
            windows: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

fn retry_after_secs(reset_at_ms: i64, now_ms: i64) -> u64 {
    // Ceiling, so a client that waits the advertised time lands past the reset.
    ((reset_at_ms - now_ms).max(0) as u64).div_ceil(1000)
}

impl AdmissionStore for MemoryAdmissionStore {
    fn check(
        &self,
        key: &WindowKey,
        limit: u32,
        window: Duration,
        now_ms: i64,
    ) -> RateLimitDecision {
        let window_ms = window.as_millis() as i64;

        // The entry guard holds the shard lock for this key, which serializes
        // the read-modify-write against concurrent checks on the same key.
        let mut record = self.windows.entry(key.clone()).or_insert(WindowRecord {
            count: 0,
            reset_at_ms: now_ms + window_ms,
        });

        // Expired window: replace with a fresh one.
        if record.reset_at_ms < now_ms {
            *record = WindowRecord {
                count: 0,
                reset_at_ms: now_ms + window_ms,
            };
        }

        if record.count >= limit {
            return RateLimitDecision::Denied {
                retry_after_secs: retry_after_secs(record.reset_at_ms, now_ms),
                limit,
                reset_at_ms: record.reset_at_ms,
            };
        }

        record.count += 1;
        RateLimitDecision::Allowed {
            remaining: limit - record.count,
            limit,
            reset_at_ms: record.reset_at_ms,
        }
    }

    fn get(&self, key: &WindowKey) -> Option<WindowRecord> {
        self.windows.get(key).map(|r| *r)
    }

    fn set(&self, key: WindowKey, record: WindowRecord) {
        self.windows.insert(key, record);
    }

    fn delete(&self, key: &WindowKey) {
        self.windows.remove(key);
    }

    fn sweep(&self, now_ms: i64) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, record| record.reset_at_ms >= now_ms);
        before - self.windows.len()
    }
}
