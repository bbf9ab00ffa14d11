//! Admission control for metered endpoints.
//!
//! Fixed-window counters keyed by (endpoint class, caller identifier) decide
//! whether a request may proceed before any costly upstream work is started.
//! The window table is process-wide in-memory state; a periodic sweep deletes
//! expired windows so memory stays bounded by the number of active callers.

mod clock;
mod limiter;
mod store;

pub use clock::{Clock, SystemClock};
pub use limiter::{AdmissionController, EndpointClass, RateLimitDecision};
pub use store::{AdmissionStore, MemoryAdmissionStore, WindowKey, WindowRecord};
