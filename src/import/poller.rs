//! Readiness polling for remote data dumps.
//!
//! A dump is prepared asynchronously by the remote service. The poller checks
//! the dump directory on a fixed interval until the dump is downloadable or a
//! terminal failure occurs:
//!
//! ```text
//! Created -> Polling { ticks } -> Ready
//!                              -> Failed
//! ```
//!
//! Failures are a status check error (transport error, dump vanished from the
//! directory), the remote reporting the dump as failed, the poll budget being
//! exhausted, or cancellation. Nothing leaves `Ready` or `Failed`.

use crate::config::ImporterConfig;
use crate::error::ImportError;
use crate::models::User;
use crate::wakatime::{DataDump, ExportApi};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Created,
    Polling { ticks: u64 },
    Ready,
    Failed,
}

impl PollState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PollState::Ready | PollState::Failed)
    }
}

/// Terminal result of a poll run. Produced exactly once per poller.
#[derive(Debug)]
pub enum PollOutcome {
    Ready { dump: DataDump, ticks: u64 },
    Failed(ImportError),
}

pub struct ReadinessPoller<A: ExportApi> {
    api: Arc<A>,
    dump_id: String,
    user: User,
    interval: Duration,
    max_wait: Duration,
    max_ticks: u64,
    cancel: CancellationToken,
    state: PollState,
}

impl<A: ExportApi> ReadinessPoller<A> {
    pub fn new(
        api: Arc<A>,
        dump_id: String,
        user: User,
        config: &ImporterConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            api,
            dump_id,
            user,
            interval: config.poll_interval,
            max_wait: config.max_wait,
            max_ticks: config.max_poll_ticks,
            cancel,
            state: PollState::Created,
        }
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn dump_id(&self) -> &str {
        &self.dump_id
    }

    /// Poll until the dump is downloadable or polling fails.
    ///
    /// The first status check happens one interval after the call. The
    /// schedule is dropped before the outcome is returned, so no further
    /// checks happen afterwards.
    pub async fn run(mut self) -> PollOutcome {
        if self.state != PollState::Created {
            return PollOutcome::Failed(ImportError::Config(format!(
                "poller for data dump '{}' already started",
                self.dump_id
            )));
        }

        let started = Instant::now();
        let mut ticker = interval_at(started + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.state = PollState::Polling { ticks: 0 };

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return self.fail(ImportError::Cancelled),
                _ = ticker.tick() => {}
            }

            let checked = tokio::select! {
                _ = self.cancel.cancelled() => return self.fail(ImportError::Cancelled),
                checked = self.api.check_status(&self.dump_id, &self.user) => checked,
            };

            if let Some(outcome) = self.on_tick(checked, started.elapsed()) {
                return outcome;
            }
        }
    }

    /// Apply one status check result. Returns the outcome once terminal.
    pub(crate) fn on_tick(
        &mut self,
        checked: Result<DataDump, ImportError>,
        elapsed: Duration,
    ) -> Option<PollOutcome> {
        let ticks = match self.state {
            PollState::Polling { ticks } => ticks + 1,
            PollState::Created => 1,
            PollState::Ready | PollState::Failed => return None,
        };
        self.state = PollState::Polling { ticks };

        let dump = match checked {
            Ok(dump) => dump,
            Err(err) => return Some(self.fail(err)),
        };

        if dump.has_failed {
            return Some(self.fail(ImportError::RemoteFailed {
                dump_id: self.dump_id.clone(),
            }));
        }

        if dump.is_downloadable() {
            log::info!(
                "data dump '{}' for user '{}' is available for download",
                self.dump_id,
                self.user.id
            );
            self.state = PollState::Ready;
            return Some(PollOutcome::Ready { dump, ticks });
        }

        log::info!(
            "waiting for data dump '{}' for user '{}' to become downloadable ({:.2} percent complete)",
            self.dump_id,
            self.user.id,
            dump.percent_complete
        );
        if dump.is_stuck {
            log::warn!(
                "data dump '{}' for user '{}' is reported as stuck",
                self.dump_id,
                self.user.id
            );
        }

        let ticks_exhausted = self.max_ticks > 0 && ticks >= self.max_ticks;
        if ticks_exhausted || elapsed >= self.max_wait {
            return Some(self.fail(ImportError::PollTimeout {
                dump_id: self.dump_id.clone(),
                waited: elapsed,
                ticks,
            }));
        }

        None
    }

    fn fail(&mut self, err: ImportError) -> PollOutcome {
        self.state = PollState::Failed;
        PollOutcome::Failed(err)
    }
}
