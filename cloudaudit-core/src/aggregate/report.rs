//! Markdown/JSON rendering of a completed job.

use std::collections::BTreeMap;
use std::fmt::{self, Write as _};

use chrono::{DateTime, Utc};
use cloudaudit_model::{
    AggregatedResult, CategoryId, CategoryOutcome, CheckErrorRecord, Finding,
    Job, JobId, JobStatus, ProjectRef, Severity, Summary,
};
use serde::Serialize;

use crate::error::{AuditError, ValidationError};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutiveSummary {
    pub total_checks: u32,
    pub passed: u32,
    pub failed: u32,
    pub not_applicable: u32,
    /// `passed / (passed + failed) × 100`, two decimals.
    pub compliance_score: f64,
    pub estimated_monthly_savings: u64,
}

impl From<&Summary> for ExecutiveSummary {
    fn from(summary: &Summary) -> Self {
        Self {
            total_checks: summary.total_checks,
            passed: summary.passed,
            failed: summary.failed,
            not_applicable: summary.not_applicable,
            compliance_score: (summary.compliance_score() * 100.0).round()
                / 100.0,
            estimated_monthly_savings: summary.estimated_savings,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySection {
    pub category: CategoryId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<Summary>,
    pub findings: Vec<Finding>,
    pub errors: Vec<CheckErrorRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationGroup {
    pub check: String,
    pub recommendation: String,
    pub resources: Vec<String>,
}

/// Report of one completed job.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDocument {
    pub job_id: JobId,
    pub project: ProjectRef,
    pub category: String,
    pub generated_at: DateTime<Utc>,
    pub executive_summary: ExecutiveSummary,
    pub critical_findings: Vec<Finding>,
    pub categories: Vec<CategorySection>,
    pub recommendations: Vec<RecommendationGroup>,
}

impl ReportDocument {
    pub fn from_job(job: &Job) -> Result<Self, AuditError> {
        let result = match (&job.status, &job.result) {
            (JobStatus::Completed, Some(result)) => result,
            _ => {
                return Err(ValidationError::InvalidField {
                    field: "job",
                    message: format!("job {} has not completed", job.id),
                }
                .into());
            }
        };

        let categories: Vec<CategorySection> = match result {
            AggregatedResult::Category(report) => {
                vec![CategorySection {
                    category: report.category,
                    summary: Some(report.summary.clone()),
                    findings: report.findings.clone(),
                    errors: report.errors.clone(),
                    error: None,
                }]
            }
            AggregatedResult::All(all) => all
                .categories
                .iter()
                .map(|(category, outcome)| match outcome {
                    CategoryOutcome::Completed(report) => CategorySection {
                        category: *category,
                        summary: Some(report.summary.clone()),
                        findings: report.findings.clone(),
                        errors: report.errors.clone(),
                        error: None,
                    },
                    CategoryOutcome::Errored { error } => CategorySection {
                        category: *category,
                        summary: None,
                        findings: Vec::new(),
                        errors: Vec::new(),
                        error: Some(error.clone()),
                    },
                })
                .collect(),
        };

        let critical_findings = result
            .findings()
            .filter(|f| !f.passed && f.severity == Severity::High)
            .cloned()
            .collect();

        let mut grouped: BTreeMap<(String, String), Vec<String>> =
            BTreeMap::new();
        for finding in result.findings().filter(|f| !f.passed) {
            if let Some(recommendation) = &finding.recommendation {
                grouped
                    .entry((finding.check_name.clone(), recommendation.clone()))
                    .or_default()
                    .push(finding.resource.clone());
            }
        }
        let recommendations = grouped
            .into_iter()
            .map(|((check, recommendation), resources)| RecommendationGroup {
                check,
                recommendation,
                resources,
            })
            .collect();

        Ok(Self {
            job_id: job.id,
            project: job.project_ref.clone(),
            category: job.category.to_string(),
            generated_at: Utc::now(),
            executive_summary: ExecutiveSummary::from(result.totals()),
            critical_findings,
            categories,
            recommendations,
        })
    }
}

/// Render `doc` as a Markdown document.
pub fn render_markdown(doc: &ReportDocument) -> String {
    let mut out = String::new();
    let _ = write_markdown(&mut out, doc);
    out
}

fn write_markdown(out: &mut String, doc: &ReportDocument) -> fmt::Result {
    let summary = &doc.executive_summary;

    writeln!(out, "# Cloud Audit Report: {}", doc.project)?;
    writeln!(out)?;
    writeln!(out, "- Job: `{}`", doc.job_id)?;
    writeln!(out, "- Category: {}", doc.category)?;
    writeln!(out, "- Generated: {}", doc.generated_at.to_rfc3339())?;
    writeln!(out)?;

    writeln!(out, "## Executive Summary")?;
    writeln!(out)?;
    writeln!(out, "| Metric | Value |")?;
    writeln!(out, "|---|---|")?;
    writeln!(out, "| Total checks | {} |", summary.total_checks)?;
    writeln!(out, "| Passed | {} |", summary.passed)?;
    writeln!(out, "| Failed | {} |", summary.failed)?;
    writeln!(out, "| Not applicable | {} |", summary.not_applicable)?;
    writeln!(
        out,
        "| Compliance score | {:.2}% |",
        summary.compliance_score
    )?;
    writeln!(
        out,
        "| Estimated savings | ${}/month |",
        summary.estimated_monthly_savings
    )?;
    writeln!(out)?;

    writeln!(out, "## Critical Findings")?;
    writeln!(out)?;
    if doc.critical_findings.is_empty() {
        writeln!(out, "No critical findings.")?;
    }
    for finding in &doc.critical_findings {
        writeln!(
            out,
            "- **{}** ({}): {}",
            finding.check_name, finding.resource, finding.message
        )?;
    }
    writeln!(out)?;

    writeln!(out, "## Categories")?;
    for section in &doc.categories {
        writeln!(out)?;
        writeln!(out, "### {}", section.category.display_name())?;
        writeln!(out)?;
        if let Some(error) = &section.error {
            writeln!(out, "Category failed: {error}")?;
            continue;
        }
        if let Some(s) = &section.summary {
            writeln!(
                out,
                "{} checks: {} passed, {} failed, {} not applicable",
                s.total_checks, s.passed, s.failed, s.not_applicable
            )?;
            writeln!(out)?;
        }
        for finding in &section.findings {
            let mark = if finding.passed { "PASS" } else { "FAIL" };
            writeln!(
                out,
                "- [{mark}] {} `{}` [{}]: {}",
                finding.check_name,
                finding.resource,
                finding.severity,
                finding.message
            )?;
        }
        for error in &section.errors {
            writeln!(out, "- [ERROR] {}: {}", error.check, error.message)?;
        }
    }
    writeln!(out)?;

    writeln!(out, "## Recommendations")?;
    writeln!(out)?;
    if doc.recommendations.is_empty() {
        writeln!(out, "No recommendations.")?;
    }
    for group in &doc.recommendations {
        writeln!(
            out,
            "- **{}**: {} ({})",
            group.check,
            group.recommendation,
            group.resources.join(", ")
        )?;
    }

    Ok(())
}
