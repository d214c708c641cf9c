//! Request and response bodies for the HTTP surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::category::CategoryId;
use crate::credential::{Credential, TokenSecret};
use crate::ids::JobId;
use crate::job::{Job, JobStatus};
use crate::report::AggregatedResult;

/// `POST /api/audits/run` body. Fields are optional so that missing values
/// surface as validation errors rather than deserialisation failures.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunAuditRequest {
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    /// `false` spawns the job and answers immediately.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait: Option<bool>,
}

/// Status as reported to pollers; a failed job reads as `error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireJobStatus {
    Pending,
    Running,
    Completed,
    Error,
}

impl WireJobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, WireJobStatus::Completed | WireJobStatus::Error)
    }
}

impl From<JobStatus> for WireJobStatus {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Pending => WireJobStatus::Pending,
            JobStatus::Running => WireJobStatus::Running,
            JobStatus::Completed => WireJobStatus::Completed,
            JobStatus::Failed => WireJobStatus::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunAuditResponse {
    pub success: bool,
    pub job_id: JobId,
    pub status: WireJobStatus,
    pub results: AggregatedResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunAuditAccepted {
    pub success: bool,
    pub job_id: JobId,
    pub status: WireJobStatus,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    /// Seconds until a rate-limited submission may be retried.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobStatusQuery {
    #[serde(default)]
    pub id: Option<String>,
}

/// `GET /api/audits/status` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusResponse {
    pub status: WireJobStatus,
    /// The aggregated result encoded as a JSON string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobStatusResponse {
    pub fn from_job(job: &Job) -> Self {
        let raw_data = job
            .result
            .as_ref()
            .and_then(|result| serde_json::to_value(result).ok());
        Self {
            status: job.status.into(),
            result: raw_data.as_ref().map(Value::to_string),
            raw_data,
            error: job.error.clone(),
        }
    }

    /// Decode the `rawData` payload back into a typed result.
    pub fn aggregated(&self) -> Option<AggregatedResult> {
        self.raw_data
            .clone()
            .and_then(|raw| serde_json::from_value(raw).ok())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Markdown,
    Json,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportQuery {
    #[serde(default)]
    pub format: Option<ReportFormat>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDescriptor {
    pub id: CategoryId,
    pub name: String,
    pub registered: bool,
}

/// `PUT /api/credentials/{project}` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialUpsert {
    pub access_token: TokenSecret,
    #[serde(default)]
    pub refresh_token: Option<TokenSecret>,
    pub expiry: DateTime<Utc>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl From<CredentialUpsert> for Credential {
    fn from(body: CredentialUpsert) -> Self {
        Credential {
            access_token: body.access_token,
            refresh_token: body.refresh_token,
            expiry: body.expiry,
            scopes: body.scopes,
        }
    }
}

/// Implementation status tracked per category by the admin inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InventoryStatus {
    #[serde(alias = "Implemented")]
    Implemented,
    #[serde(alias = "Not Implemented")]
    NotImplemented,
    #[serde(alias = "Not Started")]
    NotStarted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryComment {
    pub id: Uuid,
    pub category: CategoryId,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryEntry {
    pub category: CategoryId,
    pub status: InventoryStatus,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventorySnapshot {
    pub taken_at: DateTime<Utc>,
    pub entries: Vec<InventoryEntry>,
    pub comments: Vec<InventoryComment>,
}

/// Admin control-plane actions, discriminated by `action`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "action",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum InventoryCommand {
    UpdateStatus {
        category: String,
        status: InventoryStatus,
    },
    AddComment {
        category: String,
        text: String,
        #[serde(default)]
        author: Option<String>,
    },
    UpdateComment {
        comment_id: Uuid,
        text: String,
    },
    DeleteComment {
        comment_id: Uuid,
    },
    CreateBackup,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryResponse {
    pub success: bool,
    pub message: String,
    /// `false` when a best-effort write could not be persisted.
    pub persisted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<InventoryComment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup: Option<InventorySnapshot>,
}
