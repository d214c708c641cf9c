//! Result Aggregator: turns raw check output into the uniform
//! [`Finding`]/[`Summary`] schema and merges per-category reports.

pub mod report;
pub mod savings;
pub mod severity;

pub use report::{ReportDocument, render_markdown};
pub use savings::SavingsTable;

use cloudaudit_model::{
    AllCategoriesResult, CategoryId, CategoryOutcome, CategoryReport, Finding,
    Summary, SuiteSummary,
};
use serde_json::Value;

use crate::checks::{FindingDraft, RawCategoryOutput, RawRecord};

const NO_DESCRIPTION: &str = "No description available";
const UNSPECIFIED_RESOURCE: &str = "unspecified";

/// First non-blank scalar among `keys`, rendered as text.
fn text_field(record: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match record.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

fn non_blank(value: &str) -> Option<String> {
    (!value.trim().is_empty()).then(|| value.to_string())
}

fn fallback_title(category: CategoryId) -> String {
    format!("{category} Finding")
}

/// Stateless apart from its savings table; normalisation is a pure
/// function of its input.
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    savings: SavingsTable,
}

impl Aggregator {
    pub fn new(savings: SavingsTable) -> Self {
        Self { savings }
    }

    pub fn savings(&self) -> &SavingsTable {
        &self.savings
    }

    /// Normalise one category's raw output. Findings keep check execution
    /// order; the summary counters are carried over and savings derived.
    pub fn normalize(&self, raw: &RawCategoryOutput) -> CategoryReport {
        let findings: Vec<Finding> = raw
            .records
            .iter()
            .map(|record| self.normalize_record(raw.category, record))
            .collect();

        let summary = Summary {
            estimated_savings: self.savings.total(&findings),
            ..raw.summary.clone()
        };

        CategoryReport {
            category: raw.category,
            findings,
            errors: raw.errors.clone(),
            summary,
        }
    }

    /// Total over every record shape: the result always has a non-empty
    /// title and description.
    pub fn normalize_record(
        &self,
        category: CategoryId,
        record: &RawRecord,
    ) -> Finding {
        match record {
            RawRecord::Typed(draft) => self.from_draft(category, draft),
            RawRecord::Legacy(value) => self.from_legacy(category, value),
        }
    }

    fn from_draft(&self, category: CategoryId, draft: &FindingDraft) -> Finding {
        Finding {
            check_name: non_blank(&draft.check)
                .unwrap_or_else(|| fallback_title(category)),
            resource: non_blank(&draft.resource)
                .unwrap_or_else(|| UNSPECIFIED_RESOURCE.to_string()),
            passed: draft.passed,
            message: non_blank(&draft.message)
                .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
            severity: severity::derive(
                draft.family.unwrap_or_else(|| category.family()),
                draft.passed,
                None,
            ),
            recommendation: draft.recommendation.clone(),
            estimated_savings: self.savings.estimate(draft.check_type.as_deref()),
            raw_details: draft.details.clone(),
        }
    }

    fn from_legacy(&self, category: CategoryId, record: &Value) -> Finding {
        let status = text_field(record, &["status"]);
        let passed = record
            .get("passed")
            .and_then(Value::as_bool)
            .or_else(|| status.as_deref().and_then(severity::status_passed))
            .unwrap_or(false);
        let check_type = text_field(record, &["type", "check"]);

        let message = match record {
            Value::String(s) if !s.trim().is_empty() => s.clone(),
            _ => text_field(record, &["result", "message"])
                .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
        };

        Finding {
            check_name: text_field(record, &["check", "type"])
                .unwrap_or_else(|| fallback_title(category)),
            resource: text_field(record, &["resource", "instance", "bucket", "name"])
                .unwrap_or_else(|| UNSPECIFIED_RESOURCE.to_string()),
            passed,
            message,
            severity: severity::derive(
                category.family(),
                passed,
                status.as_deref(),
            ),
            recommendation: text_field(record, &["recommendation", "remediation"]),
            estimated_savings: self.savings.estimate(check_type.as_deref()),
            raw_details: (!record.is_null()).then(|| record.clone()),
        }
    }

    /// Merge per-category outcomes for the `all` pseudo-category. Errored
    /// categories become `{ error }` placeholders and contribute nothing to
    /// the counters.
    pub fn combine(
        &self,
        outcomes: impl IntoIterator<Item = (CategoryId, Result<CategoryReport, String>)>,
    ) -> AllCategoriesResult {
        let mut result = AllCategoriesResult {
            categories: Default::default(),
            summary: SuiteSummary::default(),
        };

        for (category, outcome) in outcomes {
            let entry = match outcome {
                Ok(report) => {
                    result.summary.totals.absorb(&report.summary);
                    result.summary.categories_run += 1;
                    CategoryOutcome::Completed(report)
                }
                Err(error) => {
                    result.summary.categories_errored += 1;
                    CategoryOutcome::Errored { error }
                }
            };
            result.categories.insert(category, entry);
        }

        result.summary.pass_rate = result.summary.totals.pass_rate();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudaudit_model::{CheckErrorRecord, CheckFamily, Severity};
    use serde_json::json;

    fn aggregator() -> Aggregator {
        Aggregator::default()
    }

    #[test]
    fn legacy_title_and_description_fall_back() {
        let agg = aggregator();
        let variants = [
            json!({ "check": "SSL", "result": "ok", "passed": true }),
            json!({ "type": "low_cpu_utilization", "message": "3%", "status": "warning" }),
            json!({ "status": "FAILED" }),
            json!({}),
            json!(null),
            json!("plain text finding"),
            json!(42),
            json!({ "check": "   ", "result": "" }),
        ];

        for variant in variants {
            let finding = agg.normalize_record(
                CategoryId::Compute,
                &RawRecord::Legacy(variant.clone()),
            );
            assert!(!finding.check_name.trim().is_empty(), "{variant}");
            assert!(!finding.message.trim().is_empty(), "{variant}");
        }
    }

    #[test]
    fn legacy_fields_are_resolved_in_priority_order() {
        let finding = aggregator().normalize_record(
            CategoryId::Compute,
            &RawRecord::Legacy(json!({
                "type": "low_cpu_utilization",
                "instance": "web-1",
                "message": "Low CPU utilization: 3%",
                "status": "warning",
            })),
        );

        assert_eq!(finding.check_name, "low_cpu_utilization");
        assert_eq!(finding.resource, "web-1");
        assert!(!finding.passed);
        assert_eq!(finding.severity, Severity::Medium);
        assert_eq!(finding.estimated_savings, "$50-150/month");

        let empty = aggregator().normalize_record(
            CategoryId::Storage,
            &RawRecord::Legacy(json!({})),
        );
        assert_eq!(empty.check_name, "storage Finding");
        assert_eq!(empty.message, "No description available");
        assert_eq!(empty.estimated_savings, "N/A");
    }

    #[test]
    fn explicit_failed_status_escalates() {
        let finding = aggregator().normalize_record(
            CategoryId::Networking,
            &RawRecord::Legacy(json!({ "check": "fw", "status": "FAILED" })),
        );
        assert_eq!(finding.severity, Severity::High);
        assert!(!finding.passed);
    }

    #[test]
    fn check_family_overrides_the_category_family() {
        let agg = aggregator();
        let plain = agg.normalize_record(
            CategoryId::Storage,
            &FindingDraft::new("Bucket Retention", "logs", false, "no lifecycle")
                .into(),
        );
        assert_eq!(plain.severity, Severity::Medium);

        let encryption = agg.normalize_record(
            CategoryId::Storage,
            &FindingDraft::new("Bucket Encryption", "logs", false, "no CMEK")
                .family(CheckFamily::DataProtection)
                .into(),
        );
        assert_eq!(encryption.severity, Severity::High);

        let passing = agg.normalize_record(
            CategoryId::Storage,
            &FindingDraft::new("Bucket Encryption", "logs", true, "CMEK")
                .family(CheckFamily::DataProtection)
                .into(),
        );
        assert_eq!(passing.severity, Severity::Low);
    }

    #[test]
    fn normalize_is_idempotent() {
        let raw = RawCategoryOutput {
            category: CategoryId::Iam,
            records: vec![
                RawRecord::Legacy(json!({ "check": "a", "passed": false })),
                FindingDraft::new("b", "sa@x", false, "key")
                    .check_type("idle_instance")
                    .into(),
            ],
            errors: vec![CheckErrorRecord {
                check: "c".into(),
                message: "boom".into(),
            }],
            summary: Summary {
                total_checks: 3,
                passed: 0,
                failed: 3,
                not_applicable: 0,
                estimated_savings: 0,
            },
        };

        let agg = aggregator();
        let first = agg.normalize(&raw);
        assert_eq!(first, agg.normalize(&raw));
        assert_eq!(first.summary.estimated_savings, 75);
        assert_eq!(first.findings[0].severity, Severity::High);
    }

    #[test]
    fn combine_skips_errored_categories_in_totals() {
        let agg = aggregator();
        let report = |category, passed, failed| CategoryReport {
            category,
            findings: Vec::new(),
            errors: Vec::new(),
            summary: Summary {
                total_checks: passed + failed,
                passed,
                failed,
                not_applicable: 0,
                estimated_savings: 75,
            },
        };

        let combined = agg.combine([
            (CategoryId::Storage, Ok(report(CategoryId::Storage, 2, 0))),
            (CategoryId::Iam, Err("requires re-authentication".to_string())),
            (CategoryId::Compute, Ok(report(CategoryId::Compute, 0, 1))),
        ]);

        assert_eq!(combined.summary.totals.total_checks, 3);
        assert_eq!(combined.summary.totals.passed, 2);
        assert_eq!(combined.summary.totals.estimated_savings, 150);
        assert_eq!(combined.summary.pass_rate, "66.67%");
        assert_eq!(combined.summary.categories_run, 2);
        assert_eq!(combined.summary.categories_errored, 1);
        assert_eq!(
            combined.categories.get(&CategoryId::Iam),
            Some(&CategoryOutcome::Errored {
                error: "requires re-authentication".into()
            })
        );
    }
}
