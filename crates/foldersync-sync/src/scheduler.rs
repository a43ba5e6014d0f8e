//! Sync scheduler - runs passes on a fixed cadence until cancelled
//!
//! The [`SyncScheduler`] owns the [`SyncEngine`] and alternates between one
//! pass and one sleep. The next pass starts `interval` after the previous
//! one finished, so the cadence is `pass_duration + interval`.
//!
//! ## Flow
//!
//! ```text
//! Idle ──→ Scanning ⇄ Acting ──→ Sleeping ──→ Scanning ...
//!                                    │
//!                     CancellationToken::cancel() ──→ Stopped
//! ```
//!
//! Cancellation is observed between entries of a pass and immediately
//! during the sleep.

use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::engine::{LoopState, PassReport, SyncEngine};

/// Totals over every pass a scheduler ran
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Passes that ran to completion
    pub passes: u64,
    /// Actions applied, including those of a cancelled final pass
    pub actions: u64,
    /// Per-entry errors caught
    pub errors: u64,
}

impl RunSummary {
    fn absorb(&mut self, report: &PassReport) {
        if !report.cancelled {
            self.passes += 1;
        }
        self.actions += u64::from(report.actions_taken());
        self.errors += report.errors.len() as u64;
    }
}

/// Periodic pass loop
pub struct SyncScheduler {
    engine: SyncEngine,
    interval: Duration,
    cancel: CancellationToken,
    max_passes: Option<u64>,
}

impl SyncScheduler {
    /// Creates a scheduler that runs until `cancel` fires
    pub fn new(engine: SyncEngine, interval: Duration, cancel: CancellationToken) -> Self {
        Self {
            engine,
            interval,
            cancel,
            max_passes: None,
        }
    }

    /// Stops after `passes` completed passes
    pub fn with_max_passes(mut self, passes: u64) -> Self {
        self.max_passes = Some(passes);
        self
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Receiver that observes every lifecycle transition
    pub fn subscribe(&self) -> watch::Receiver<LoopState> {
        self.engine.subscribe()
    }

    // ========================================================================
    // run()
    // ========================================================================

    /// Main loop
    ///
    /// Returns when the token is cancelled or `max_passes` is reached. The
    /// engine is left in [`LoopState::Stopped`].
    pub async fn run(&self) -> RunSummary {
        info!(
            interval_secs = self.interval.as_secs(),
            max_passes = ?self.max_passes,
            "Sync scheduler starting"
        );

        let mut summary = RunSummary::default();

        loop {
            if self.max_passes.is_some_and(|max| summary.passes >= max) {
                debug!(passes = summary.passes, "Pass limit reached");
                break;
            }

            let report = self.engine.run_pass(&self.cancel).await;
            summary.absorb(&report);
            if report.cancelled {
                break;
            }

            if self.max_passes.is_some_and(|max| summary.passes >= max) {
                debug!(passes = summary.passes, "Pass limit reached");
                break;
            }

            self.engine.set_state(LoopState::Sleeping);
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    debug!("Cancelled while sleeping");
                    break;
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        self.engine.set_state(LoopState::Stopped);

        info!(
            passes = summary.passes,
            actions = summary.actions,
            errors = summary.errors,
            "Sync scheduler stopped"
        );

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_skips_cancelled_pass_count() {
        let mut summary = RunSummary::default();
        summary.absorb(&PassReport {
            files_created: 2,
            ..Default::default()
        });
        summary.absorb(&PassReport {
            files_removed: 1,
            errors: vec!["x".into()],
            cancelled: true,
            ..Default::default()
        });

        assert_eq!(summary.passes, 1);
        assert_eq!(summary.actions, 3);
        assert_eq!(summary.errors, 1);
    }
}
