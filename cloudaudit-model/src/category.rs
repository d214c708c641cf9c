//! Audit categories and the synthetic `all` selector.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A named group of checks targeting one resource domain.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
    Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum CategoryId {
    Compute,
    Storage,
    Bigquery,
    Security,
    Networking,
    CostManagement,
    Iam,
    Monitoring,
    Serverless,
    Gke,
    ResourceUtilization,
    DataProtection,
    Compliance,
}

/// Check family used when deriving finding severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckFamily {
    Security,
    Iam,
    DataProtection,
    Cost,
    Operations,
}

impl CheckFamily {
    /// Failed checks in these families are reported as `high`.
    pub fn escalates(self) -> bool {
        matches!(
            self,
            CheckFamily::Security
                | CheckFamily::Iam
                | CheckFamily::DataProtection
        )
    }
}

impl CategoryId {
    pub const ALL: [CategoryId; 13] = [
        CategoryId::Compute,
        CategoryId::Storage,
        CategoryId::Bigquery,
        CategoryId::Security,
        CategoryId::Networking,
        CategoryId::CostManagement,
        CategoryId::Iam,
        CategoryId::Monitoring,
        CategoryId::Serverless,
        CategoryId::Gke,
        CategoryId::ResourceUtilization,
        CategoryId::DataProtection,
        CategoryId::Compliance,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CategoryId::Compute => "compute",
            CategoryId::Storage => "storage",
            CategoryId::Bigquery => "bigquery",
            CategoryId::Security => "security",
            CategoryId::Networking => "networking",
            CategoryId::CostManagement => "cost-management",
            CategoryId::Iam => "iam",
            CategoryId::Monitoring => "monitoring",
            CategoryId::Serverless => "serverless",
            CategoryId::Gke => "gke",
            CategoryId::ResourceUtilization => "resource-utilization",
            CategoryId::DataProtection => "data-protection",
            CategoryId::Compliance => "compliance",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            CategoryId::Compute => "Compute",
            CategoryId::Storage => "Storage",
            CategoryId::Bigquery => "BigQuery",
            CategoryId::Security => "Security",
            CategoryId::Networking => "Networking",
            CategoryId::CostManagement => "Cost Management",
            CategoryId::Iam => "IAM",
            CategoryId::Monitoring => "Monitoring",
            CategoryId::Serverless => "Serverless",
            CategoryId::Gke => "GKE",
            CategoryId::ResourceUtilization => "Resource Utilization",
            CategoryId::DataProtection => "Data Protection",
            CategoryId::Compliance => "Compliance",
        }
    }

    pub fn family(self) -> CheckFamily {
        match self {
            CategoryId::Security | CategoryId::Compliance => {
                CheckFamily::Security
            }
            CategoryId::Iam => CheckFamily::Iam,
            CategoryId::DataProtection => CheckFamily::DataProtection,
            CategoryId::CostManagement | CategoryId::ResourceUtilization => {
                CheckFamily::Cost
            }
            _ => CheckFamily::Operations,
        }
    }

    fn from_canonical(raw: &str) -> Option<Self> {
        CategoryId::ALL.into_iter().find(|c| c.as_str() == raw)
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid category '{input}'. Valid categories: {valid}")]
pub struct ParseCategoryError {
    pub input: String,
    pub valid: String,
}

impl ParseCategoryError {
    fn new(input: &str) -> Self {
        let mut valid: Vec<&str> =
            CategoryId::ALL.iter().map(|c| c.as_str()).collect();
        valid.push(CategorySelector::ALL_KEYWORD);
        Self {
            input: input.to_string(),
            valid: valid.join(", "),
        }
    }
}

impl FromStr for CategoryId {
    type Err = ParseCategoryError;

    /// Accepts canonical ids, the legacy `network`/`cost` spellings and the
    /// `<id>-audit` module naming convention.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        let stem = normalized
            .strip_suffix("-audit")
            .unwrap_or(normalized.as_str());

        let resolved = match stem {
            "network" => Some(CategoryId::Networking),
            "cost" => Some(CategoryId::CostManagement),
            other => CategoryId::from_canonical(other),
        };

        resolved.ok_or_else(|| ParseCategoryError::new(raw))
    }
}

/// What a run request targets: one category or every category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategorySelector {
    One(CategoryId),
    All,
}

impl CategorySelector {
    pub const ALL_KEYWORD: &'static str = "all";

    pub fn categories(&self) -> Vec<CategoryId> {
        match self {
            CategorySelector::One(category) => vec![*category],
            CategorySelector::All => CategoryId::ALL.to_vec(),
        }
    }
}

impl fmt::Display for CategorySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategorySelector::One(category) => category.fmt(f),
            CategorySelector::All => f.write_str(Self::ALL_KEYWORD),
        }
    }
}

impl FromStr for CategorySelector {
    type Err = ParseCategoryError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if raw.trim().eq_ignore_ascii_case(Self::ALL_KEYWORD) {
            return Ok(CategorySelector::All);
        }
        raw.parse().map(CategorySelector::One)
    }
}

impl Serialize for CategorySelector {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CategorySelector {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
