use serde::{Deserialize, Serialize};

pub const NO_SAVINGS_ESTIMATE: &str = "N/A";

/// Counters derived from one run. `total_checks` always equals
/// `passed + failed + not_applicable`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_checks: u32,
    pub passed: u32,
    pub failed: u32,
    pub not_applicable: u32,
    /// Heuristic monthly savings in whole dollars.
    pub estimated_savings: u64,
}

impl Summary {
    pub fn record_passed(&mut self) {
        self.total_checks += 1;
        self.passed += 1;
    }

    pub fn record_failed(&mut self) {
        self.total_checks += 1;
        self.failed += 1;
    }

    pub fn record_not_applicable(&mut self) {
        self.total_checks += 1;
        self.not_applicable += 1;
    }

    pub fn is_consistent(&self) -> bool {
        self.total_checks == self.passed + self.failed + self.not_applicable
    }

    /// Fold another category's counters into this one.
    pub fn absorb(&mut self, other: &Summary) {
        self.total_checks += other.total_checks;
        self.passed += other.passed;
        self.failed += other.failed;
        self.not_applicable += other.not_applicable;
        self.estimated_savings += other.estimated_savings;
    }

    /// Percentage of evaluated checks that passed; `0.0` when nothing was
    /// evaluated.
    pub fn compliance_score(&self) -> f64 {
        let evaluated = self.passed + self.failed;
        if evaluated == 0 {
            0.0
        } else {
            f64::from(self.passed) / f64::from(evaluated) * 100.0
        }
    }

    /// Passed over total checks, formatted the way the suite runner reports
    /// it (`"66.67%"`).
    pub fn pass_rate(&self) -> String {
        if self.total_checks == 0 {
            return String::from("0.00%");
        }
        let rate =
            f64::from(self.passed) / f64::from(self.total_checks) * 100.0;
        format!("{rate:.2}%")
    }
}
