//! Core data model definitions shared across cloudaudit crates.
#![allow(missing_docs)]

pub mod api;
pub mod category;
pub mod credential;
pub mod finding;
pub mod ids;
pub mod job;
pub mod report;
pub mod routes;
pub mod summary;

pub use api::{
    CategoryDescriptor, CredentialUpsert, ErrorBody, InventoryCommand,
    InventoryComment, InventoryEntry, InventoryResponse, InventorySnapshot,
    InventoryStatus, JobStatusQuery, JobStatusResponse,
    ReportFormat, ReportQuery, RunAuditAccepted, RunAuditRequest,
    RunAuditResponse, WireJobStatus,
};
pub use category::{
    CategoryId, CategorySelector, CheckFamily, ParseCategoryError,
};
pub use credential::{Credential, TokenSecret};
pub use finding::{Finding, Severity};
pub use ids::{JobId, ProjectRef, SessionId};
pub use job::{Job, JobStatus};
pub use report::{
    AggregatedResult, AllCategoriesResult, CategoryOutcome, CategoryReport,
    CheckErrorRecord, SuiteSummary,
};
pub use summary::{NO_SAVINGS_ESTIMATE, Summary};
