use std::fmt::Write as _;

use cloudaudit_core::client::{BatchReport, CategoryRun, ClientRunStatus};
use cloudaudit_model::{CategoryDescriptor, JobStatusResponse, WireJobStatus};

pub fn status_label(status: ClientRunStatus) -> &'static str {
    match status {
        ClientRunStatus::Idle => "idle",
        ClientRunStatus::Running => "running",
        ClientRunStatus::Completed => "completed",
        ClientRunStatus::Failed => "failed",
        ClientRunStatus::TimedOut => "timed out",
        ClientRunStatus::Cancelled => "cancelled",
    }
}

fn wire_label(status: WireJobStatus) -> &'static str {
    match status {
        WireJobStatus::Pending => "pending",
        WireJobStatus::Running => "running",
        WireJobStatus::Completed => "completed",
        WireJobStatus::Error => "error",
    }
}

fn run_detail(run: &CategoryRun) -> String {
    if let Some(result) = &run.result {
        let totals = result.totals();
        return format!(
            "{} checks, {} passed, {} failed, {} n/a",
            totals.total_checks,
            totals.passed,
            totals.failed,
            totals.not_applicable
        );
    }
    run.error.clone().unwrap_or_default()
}

/// One line per category followed by a tally.
pub fn render_batch(report: &BatchReport) -> String {
    let mut out = String::new();
    for run in &report.runs {
        let job = run
            .job_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| String::from("-"));
        let _ = writeln!(
            out,
            "{:<22} {:<10} {:<36} {}",
            run.category.as_str(),
            status_label(run.status),
            job,
            run_detail(run)
        );
    }

    let _ = write!(
        out,
        "{} of {} completed",
        report.count(ClientRunStatus::Completed),
        report.runs.len()
    );
    if report.stopped {
        out.push_str(" (stopped)");
    }
    out.push('\n');
    out
}

pub fn render_status(response: &JobStatusResponse) -> String {
    let mut out = format!("status: {}\n", wire_label(response.status));
    if let Some(error) = &response.error {
        let _ = writeln!(out, "error: {error}");
    }
    if let Some(result) = response.aggregated() {
        let totals = result.totals();
        let _ = writeln!(
            out,
            "checks: {} (passed {}, failed {}, n/a {})",
            totals.total_checks,
            totals.passed,
            totals.failed,
            totals.not_applicable
        );
        let _ = writeln!(out, "pass rate: {}", totals.pass_rate());
        let _ = writeln!(
            out,
            "estimated savings: ${}/month",
            totals.estimated_savings
        );
    }
    out
}

pub fn render_categories(categories: &[CategoryDescriptor]) -> String {
    let mut out = String::new();
    for category in categories {
        let marker = if category.registered { "" } else { " (no checks)" };
        let _ = writeln!(
            out,
            "{:<22} {}{}",
            category.id.as_str(),
            category.name,
            marker
        );
    }
    out
}
