use std::collections::BTreeMap;

use cloudaudit_model::{Finding, NO_SAVINGS_ESTIMATE};
use once_cell::sync::Lazy;

/// Flat monthly dollars credited per savings-eligible finding.
pub const DEFAULT_RATE_PER_FINDING: u64 = 75;

static DEFAULT_RANGES: Lazy<BTreeMap<String, String>> = Lazy::new(|| {
    [
        ("low_cpu_utilization", "$50-150/month"),
        ("low_memory_utilization", "$30-100/month"),
        ("idle_instance", "$50-200/month"),
        ("unattached_disk", "$10-50/month"),
        ("storage_lifecycle", "$25-100/month"),
        ("multi_region_storage", "$20-80/month"),
        ("idle_external_ip", "$3-10/month"),
    ]
    .into_iter()
    .map(|(key, range)| (key.to_string(), range.to_string()))
    .collect()
});

/// Savings heuristic as data: a range per check type and a flat rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavingsTable {
    rate_per_finding: u64,
    ranges: BTreeMap<String, String>,
}

impl Default for SavingsTable {
    fn default() -> Self {
        Self {
            rate_per_finding: DEFAULT_RATE_PER_FINDING,
            ranges: DEFAULT_RANGES.clone(),
        }
    }
}

impl SavingsTable {
    pub fn empty(rate_per_finding: u64) -> Self {
        Self {
            rate_per_finding,
            ranges: BTreeMap::new(),
        }
    }

    pub fn with_rate(mut self, rate_per_finding: u64) -> Self {
        self.rate_per_finding = rate_per_finding;
        self
    }

    pub fn with_range(
        mut self,
        check_type: impl Into<String>,
        range: impl Into<String>,
    ) -> Self {
        self.ranges.insert(check_type.into(), range.into());
        self
    }

    pub fn rate_per_finding(&self) -> u64 {
        self.rate_per_finding
    }

    /// Textual range for `check_type`, `"N/A"` when unknown.
    pub fn estimate(&self, check_type: Option<&str>) -> String {
        check_type
            .and_then(|key| self.ranges.get(key))
            .cloned()
            .unwrap_or_else(|| NO_SAVINGS_ESTIMATE.to_string())
    }

    /// Failed findings with a known range, times the flat rate.
    pub fn total(&self, findings: &[Finding]) -> u64 {
        let eligible = findings
            .iter()
            .filter(|f| !f.passed && f.has_savings_estimate())
            .count() as u64;
        eligible * self.rate_per_finding
    }
}
