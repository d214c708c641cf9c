use cloudaudit_model::{CheckFamily, Severity};

/// Interpret a free-form `status` string. `None` when it says nothing about
/// pass/fail.
pub fn status_passed(status: &str) -> Option<bool> {
    match status.trim().to_ascii_lowercase().as_str() {
        "passed" | "pass" | "ok" | "compliant" | "success" => Some(true),
        "failed" | "fail" | "error" | "warning" | "non_compliant" => {
            Some(false)
        }
        _ => None,
    }
}

/// Explicit `FAILED`/`error` statuses always escalate to `high`.
pub fn is_hard_failure(status: &str) -> bool {
    let status = status.trim();
    status.eq_ignore_ascii_case("failed") || status.eq_ignore_ascii_case("error")
}

pub fn derive(family: CheckFamily, passed: bool, status: Option<&str>) -> Severity {
    if status.is_some_and(is_hard_failure) {
        return Severity::High;
    }
    match (passed, family.escalates()) {
        (true, _) => Severity::Low,
        (false, true) => Severity::High,
        (false, false) => Severity::Medium,
    }
}
