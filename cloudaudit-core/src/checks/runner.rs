use std::{fmt, sync::Arc};

use cloudaudit_model::{
    CategoryId, CheckErrorRecord, Credential, ProjectRef, Summary,
};
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use super::{CheckContext, CheckOutcome, CheckRegistry, RawRecord};
use crate::error::AuthError;
use crate::provider::CloudApi;

/// Un-normalised result of one category run.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCategoryOutput {
    pub category: CategoryId,
    pub records: Vec<RawRecord>,
    pub errors: Vec<CheckErrorRecord>,
    pub summary: Summary,
}

impl RawCategoryOutput {
    fn empty(category: CategoryId) -> Self {
        Self {
            category,
            records: Vec::new(),
            errors: Vec::new(),
            summary: Summary::default(),
        }
    }

    /// Output for a category that has no registered check-set.
    pub fn unavailable(category: CategoryId) -> Self {
        let mut output = Self::empty(category);
        output.records.push(RawRecord::Legacy(json!({
            "check": format!("{} checks", category.display_name()),
            "result": format!("{category} checks are not available"),
            "passed": true,
        })));
        output.summary.record_not_applicable();
        output
    }
}

/// Executes a category's checks in registration order, one at a time.
#[derive(Clone)]
pub struct CheckRunner {
    registry: Arc<CheckRegistry>,
    api: Arc<dyn CloudApi>,
}

impl fmt::Debug for CheckRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckRunner")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl CheckRunner {
    pub fn new(registry: Arc<CheckRegistry>, api: Arc<dyn CloudApi>) -> Self {
        Self { registry, api }
    }

    pub fn registry(&self) -> &CheckRegistry {
        &self.registry
    }

    /// Run every check registered for `category`.
    ///
    /// Each check runs inside its own failure boundary: an error is recorded
    /// in `errors`, counted as failed, and the next check still runs. The
    /// one exception is a provider `401`, which means the shared credential
    /// is unusable; the category is aborted and its partial output dropped.
    #[instrument(skip(self, credential), fields(category = %category, project = %project))]
    pub async fn run_category(
        &self,
        category: CategoryId,
        credential: &Credential,
        project: &ProjectRef,
    ) -> Result<RawCategoryOutput, AuthError> {
        let Some(checks) = self.registry.get(category) else {
            info!("no check-set registered; emitting placeholder");
            return Ok(RawCategoryOutput::unavailable(category));
        };

        let ctx = CheckContext {
            api: self.api.as_ref(),
            credential,
            project,
            category,
        };
        let mut output = RawCategoryOutput::empty(category);

        for check in checks {
            let name = check.name();
            match check.run(&ctx).await {
                Ok(CheckOutcome::Passed(records)) => {
                    output.summary.record_passed();
                    output.records.extend(records);
                }
                Ok(CheckOutcome::Failed(records)) => {
                    output.summary.record_failed();
                    output.records.extend(records);
                }
                Ok(CheckOutcome::NotApplicable { reason }) => {
                    debug!(check = name, %reason, "check not applicable");
                    output.summary.record_not_applicable();
                }
                Err(err) if err.is_unauthorized() => {
                    warn!(check = name, "credential rejected; aborting category");
                    return Err(err.in_check(name).into());
                }
                Err(err) => {
                    let err = err.in_check(name);
                    warn!(check = name, error = %err.message, "check failed");
                    output.errors.push(CheckErrorRecord {
                        check: err.check,
                        message: err.message,
                    });
                    output.summary.record_failed();
                }
            }
        }

        debug!(
            total = output.summary.total_checks,
            failed = output.summary.failed,
            "category finished"
        );
        Ok(output)
    }
}
