//! Check contract, category registry and the sequential [`CheckRunner`].

pub mod builtin;
mod registry;
mod runner;

pub use registry::CheckRegistry;
pub use runner::{CheckRunner, RawCategoryOutput};

use async_trait::async_trait;
use cloudaudit_model::{CategoryId, CheckFamily, Credential, ProjectRef};
use serde_json::Value;

use crate::error::CheckError;
use crate::provider::CloudApi;

/// Everything a check may touch. The credential is shared read-only by
/// every check in one runner invocation.
pub struct CheckContext<'a> {
    pub api: &'a dyn CloudApi,
    pub credential: &'a Credential,
    pub project: &'a ProjectRef,
    pub category: CategoryId,
}

impl std::fmt::Debug for CheckContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckContext")
            .field("project", &self.project)
            .field("category", &self.category)
            .finish_non_exhaustive()
    }
}

/// Finding constructed directly by a check.
#[derive(Debug, Clone, PartialEq)]
pub struct FindingDraft {
    pub check: String,
    pub resource: String,
    pub passed: bool,
    pub message: String,
    pub recommendation: Option<String>,
    /// Key into the savings table (e.g. `low_cpu_utilization`).
    pub check_type: Option<String>,
    pub details: Option<Value>,
    /// Severity family for this check when it differs from its category's.
    pub family: Option<CheckFamily>,
}

impl FindingDraft {
    pub fn new(
        check: impl Into<String>,
        resource: impl Into<String>,
        passed: bool,
        message: impl Into<String>,
    ) -> Self {
        Self {
            check: check.into(),
            resource: resource.into(),
            passed,
            message: message.into(),
            recommendation: None,
            check_type: None,
            details: None,
            family: None,
        }
    }

    pub fn recommend(mut self, recommendation: impl Into<String>) -> Self {
        self.recommendation = Some(recommendation.into());
        self
    }

    pub fn check_type(mut self, check_type: impl Into<String>) -> Self {
        self.check_type = Some(check_type.into());
        self
    }

    pub fn details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn family(mut self, family: CheckFamily) -> Self {
        self.family = Some(family);
        self
    }
}

/// Raw output of a check before aggregation.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRecord {
    Typed(FindingDraft),
    /// Loosely shaped record (`check`/`type`, `result`/`message`,
    /// `passed`/`status`) normalised by the aggregator.
    Legacy(Value),
}

impl From<FindingDraft> for RawRecord {
    fn from(draft: FindingDraft) -> Self {
        RawRecord::Typed(draft)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
    Passed(Vec<RawRecord>),
    Failed(Vec<RawRecord>),
    /// Nothing to assert against; counted in the summary only.
    NotApplicable { reason: String },
}

impl CheckOutcome {
    pub fn not_applicable(reason: impl Into<String>) -> Self {
        CheckOutcome::NotApplicable {
            reason: reason.into(),
        }
    }

    /// `Failed` when any draft failed, otherwise `Passed`.
    pub fn from_drafts(drafts: Vec<FindingDraft>) -> Self {
        let failed = drafts.iter().any(|d| !d.passed);
        let records = drafts.into_iter().map(RawRecord::from).collect();
        if failed {
            CheckOutcome::Failed(records)
        } else {
            CheckOutcome::Passed(records)
        }
    }
}

/// One independent assertion against the provider API.
#[async_trait]
pub trait Check: Send + Sync {
    fn name(&self) -> &str;

    async fn run(
        &self,
        ctx: &CheckContext<'_>,
    ) -> Result<CheckOutcome, CheckError>;
}
