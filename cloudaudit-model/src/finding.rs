use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One normalised, user-facing record produced by a single check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub check_name: String,
    pub resource: String,
    pub passed: bool,
    pub message: String,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    /// Textual savings range from the lookup table, `"N/A"` when unknown.
    pub estimated_savings: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_details: Option<Value>,
}

impl Finding {
    pub fn has_savings_estimate(&self) -> bool {
        self.estimated_savings != crate::summary::NO_SAVINGS_ESTIMATE
    }
}
