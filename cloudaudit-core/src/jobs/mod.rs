//! Job persistence and the dispatcher that drives the job state machine.

mod dispatcher;
mod store;

pub use dispatcher::{
    DEFAULT_HARD_TIMEOUT, DispatcherSettings, JobDispatcher, RunOutcome,
    RunRequest,
};
pub use store::{
    DEFAULT_RETAINED_JOBS, InMemoryJobStore, JobStore, JobTransition,
};
