//! Aggregated result shapes persisted against a job.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::category::CategoryId;
use crate::finding::Finding;
use crate::summary::Summary;

/// A check that failed inside its own failure boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckErrorRecord {
    pub check: String,
    pub message: String,
}

/// Result of running one category's check-set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryReport {
    pub category: CategoryId,
    pub findings: Vec<Finding>,
    pub errors: Vec<CheckErrorRecord>,
    pub summary: Summary,
}

/// Entry of the combined map: a report, or the error that prevented one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CategoryOutcome {
    Completed(CategoryReport),
    Errored { error: String },
}

impl CategoryOutcome {
    pub fn report(&self) -> Option<&CategoryReport> {
        match self {
            CategoryOutcome::Completed(report) => Some(report),
            CategoryOutcome::Errored { .. } => None,
        }
    }
}

/// Summary of the `all` pseudo-category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteSummary {
    #[serde(flatten)]
    pub totals: Summary,
    pub pass_rate: String,
    pub categories_run: u32,
    pub categories_errored: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllCategoriesResult {
    pub categories: BTreeMap<CategoryId, CategoryOutcome>,
    pub summary: SuiteSummary,
}

/// What a completed job stores in `result`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AggregatedResult {
    Category(CategoryReport),
    All(AllCategoriesResult),
}

impl AggregatedResult {
    /// Counters across every category this result covers.
    pub fn totals(&self) -> &Summary {
        match self {
            AggregatedResult::Category(report) => &report.summary,
            AggregatedResult::All(all) => &all.summary.totals,
        }
    }

    /// Successful category reports in display order.
    pub fn reports(&self) -> Vec<&CategoryReport> {
        match self {
            AggregatedResult::Category(report) => vec![report],
            AggregatedResult::All(all) => {
                all.categories.values().filter_map(|o| o.report()).collect()
            }
        }
    }

    pub fn findings(&self) -> impl Iterator<Item = &Finding> {
        self.reports().into_iter().flat_map(|r| r.findings.iter())
    }
}
