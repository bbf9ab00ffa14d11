use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::ratelimit::AdmissionController;

/// Background task that deletes expired rate-limit windows.
///
/// Runs on a fixed interval independent of request traffic, so the window
/// table stays bounded by the number of distinct callers with an unexpired
/// window.
pub struct SweepTask {
    interval: Duration,
    admission: Arc<AdmissionController>,
    shutdown: broadcast::Receiver<()>,
}

impl SweepTask {
    pub fn new(
        interval_seconds: u64,
        admission: Arc<AdmissionController>,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            interval: Duration::from_secs(interval_seconds),
            admission,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        let mut timer = tokio::time::interval(self.interval);

        // Skip immediate first tick
        timer.tick().await;

        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "Rate-limit sweep task started"
        );

        loop {
            tokio::select! {
                _ = self.shutdown.recv() => {
                    tracing::info!("Sweep task received shutdown signal");
                    break;
                }
                _ = timer.tick() => {
                    let removed = self.admission.sweep();
                    if removed > 0 {
                        tracing::debug!(removed = removed, "Swept expired rate-limit windows");
                    }
                }
            }
        }

        tracing::info!("Sweep task stopped");
    }
}
