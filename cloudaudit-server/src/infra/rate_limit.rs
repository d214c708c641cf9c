//! Fixed-window limiter for run submissions, keyed by project.

use std::{fmt, time::Duration};

use cloudaudit_model::ProjectRef;
use dashmap::DashMap;
use thiserror::Error;
use tokio::time::Instant;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "Too many audit runs for project {project}; retry in {}s",
    retry_after.as_secs().max(1)
)]
pub struct RateLimitExceeded {
    pub project: String,
    pub retry_after: Duration,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    opened_at: Instant,
    count: u32,
}

pub struct RunRateLimiter {
    max_runs: u32,
    window: Duration,
    windows: DashMap<ProjectRef, Window>,
}

impl fmt::Debug for RunRateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunRateLimiter")
            .field("max_runs", &self.max_runs)
            .field("window", &self.window)
            .field("tracked_projects", &self.windows.len())
            .finish()
    }
}

impl RunRateLimiter {
    pub fn new(max_runs: u32, window: Duration) -> Self {
        Self {
            max_runs,
            window,
            windows: DashMap::new(),
        }
    }

    /// Count one submission for `project`, rejecting it once the current
    /// window is full. A rejected attempt does not consume a slot.
    pub fn check(&self, project: &ProjectRef) -> Result<(), RateLimitExceeded> {
        let now = Instant::now();
        let mut entry = self.windows.entry(project.clone()).or_insert(Window {
            opened_at: now,
            count: 0,
        });

        let elapsed = now.saturating_duration_since(entry.opened_at);
        if elapsed >= self.window {
            *entry = Window {
                opened_at: now,
                count: 0,
            };
        }

        if entry.count >= self.max_runs {
            let retry_after = self
                .window
                .saturating_sub(now.saturating_duration_since(entry.opened_at));
            debug!(project = %project, count = entry.count, "run rate limited");
            return Err(RateLimitExceeded {
                project: project.to_string(),
                retry_after,
            });
        }

        entry.count += 1;
        Ok(())
    }
}
