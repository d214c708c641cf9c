//! Client side of the audit protocol: the remote API port, the status
//! poller and the batch scheduler that sequences category runs.

mod api;
mod batch;
mod poller;

pub use api::{AuditApi, HttpAuditApi};
#[cfg(test)]
pub use api::MockAuditApi;
pub use batch::{
    BatchReport, BatchScheduler, CategoryRun, ClientRunStatus, DEFAULT_PACING,
    MAX_SUBMIT_ATTEMPTS,
};
pub use poller::{
    DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT, MIN_POLL_INTERVAL, PollOutcome,
    PollerSettings, StatusPoller,
};
