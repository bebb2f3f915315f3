//! Periodic execution of sync passes.

use std::future::Future;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::api::TaskService;
use crate::error::Result;
use crate::flight::FlightGuard;
use crate::reconcile::{ReconcileEngine, ReminderStore, SyncOutcome};

/// Passes never run more often than this.
pub const MIN_INTERVAL: Duration = Duration::from_secs(60);

/// Runs passes on a timer and drops triggers that overlap a running pass.
pub struct SyncDriver<S, R> {
    engine: ReconcileEngine<S, R>,
    interval: Duration,
    in_flight: AtomicBool,
}

impl<S: TaskService, R: ReminderStore> SyncDriver<S, R> {
    /// `interval` is raised to [`MIN_INTERVAL`] if shorter.
    pub fn new(engine: ReconcileEngine<S, R>, interval: Duration) -> Self {
        Self {
            engine,
            interval: interval.max(MIN_INTERVAL),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn engine(&self) -> &ReconcileEngine<S, R> {
        &self.engine
    }

    /// Runs one pass unless another is already running, in which case
    /// nothing happens and `None` is returned.
    pub async fn trigger(&self) -> Option<Result<SyncOutcome>> {
        let Some(_flight) = FlightGuard::acquire(&self.in_flight) else {
            tracing::debug!("Sync pass already in progress; skipping trigger");
            return None;
        };
        Some(self.engine.run_pass().await)
    }

    /// Runs a pass immediately and then every interval until `shutdown` resolves.
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        tracing::info!("Watching reminders every {}s", self.interval.as_secs());
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Stopping sync driver");
                    break;
                }
                _ = ticker.tick() => {
                    if let Some(Err(e)) = self.trigger().await {
                        tracing::warn!("Scheduled sync failed: {}", e);
                    }
                }
            }
        }
    }
}
