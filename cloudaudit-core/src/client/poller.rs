use std::{fmt, sync::Arc, time::Duration};

use cloudaudit_model::{JobId, JobStatusResponse, WireJobStatus};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use super::AuditApi;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(5 * 60);
/// Floor applied to the poll interval; a zero period would spin.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerSettings {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_POLL_TIMEOUT,
        }
    }
}

/// How a watch ended. Only `Completed` and `Failed` reflect server state;
/// the other two are client-side decisions and leave the job running.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Completed(JobStatusResponse),
    Failed { error: String },
    TimedOut { elapsed: Duration },
    Stopped,
}

/// Watches one job at a fixed interval until it is terminal, the
/// wall-clock timeout passes, or the caller cancels.
#[derive(Clone)]
pub struct StatusPoller {
    api: Arc<dyn AuditApi>,
    settings: PollerSettings,
}

impl fmt::Debug for StatusPoller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusPoller")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl StatusPoller {
    pub fn new(api: Arc<dyn AuditApi>, mut settings: PollerSettings) -> Self {
        if settings.interval < MIN_POLL_INTERVAL {
            warn!(
                requested = ?settings.interval,
                "poll interval below the floor; clamping"
            );
            settings.interval = MIN_POLL_INTERVAL;
        }
        Self { api, settings }
    }

    pub fn settings(&self) -> PollerSettings {
        self.settings
    }

    #[instrument(skip(self, cancel), fields(job_id = %job))]
    pub async fn wait_for(
        &self,
        job: JobId,
        cancel: &CancellationToken,
    ) -> PollOutcome {
        let started = Instant::now();
        let deadline = started + self.settings.timeout;
        let mut ticker = tokio::time::interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return PollOutcome::Stopped,
                _ = tokio::time::sleep_until(deadline) => {
                    return self.timed_out(started);
                }
                _ = ticker.tick() => {}
            }

            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => return PollOutcome::Stopped,
                _ = tokio::time::sleep_until(deadline) => {
                    return self.timed_out(started);
                }
                fetched = self.api.status(job) => fetched,
            };

            match fetched {
                Ok(response) => match response.status {
                    WireJobStatus::Completed => {
                        return PollOutcome::Completed(response);
                    }
                    WireJobStatus::Error => {
                        return PollOutcome::Failed {
                            error: response
                                .error
                                .unwrap_or_else(|| "Audit failed".to_string()),
                        };
                    }
                    status => debug!(?status, "job not finished"),
                },
                Err(err) => warn!(error = %err, "status poll failed; retrying"),
            }
        }
    }

    fn timed_out(&self, started: Instant) -> PollOutcome {
        let elapsed = started.elapsed();
        warn!(
            timeout_secs = self.settings.timeout.as_secs(),
            "gave up waiting; the server-side job may still finish"
        );
        PollOutcome::TimedOut { elapsed }
    }
}
