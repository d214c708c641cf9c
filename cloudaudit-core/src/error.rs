use cloudaudit_model::{JobId, JobStatus, ParseCategoryError};
use thiserror::Error;

/// Credential missing, expired or unrefreshable. Fatal to the whole job.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("No credential available for project {project}")]
    MissingCredential { project: String },

    #[error(
        "Credential for project {project} requires re-authentication"
    )]
    RequiresReauthentication { project: String },

    #[error("Token endpoint rejected refresh (HTTP {status}): {message}")]
    RefreshRejected { status: u16, message: String },

    #[error("Token endpoint unreachable: {0}")]
    Transport(String),

    #[error("Malformed token grant: {0}")]
    MalformedGrant(String),

    #[error("OAuth client is not configured: {0}")]
    NotConfigured(&'static str),

    #[error("Provider rejected credential during '{check}': {message}")]
    Revoked { check: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckErrorKind {
    Unauthorized,
    PermissionDenied,
    NotFound,
    RateLimited,
    Transport,
    Api,
    Parse,
}

/// One check failed. Captured into the category's `errors[]`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{check}: {message}")]
pub struct CheckError {
    pub check: String,
    pub message: String,
    pub kind: CheckErrorKind,
}

impl CheckError {
    pub fn new(
        check: impl Into<String>,
        kind: CheckErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            check: check.into(),
            message: message.into(),
            kind,
        }
    }

    /// Attribute a provider error to the check that observed it.
    pub fn in_check(mut self, check: &str) -> Self {
        check.clone_into(&mut self.check);
        self
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind == CheckErrorKind::Unauthorized
    }
}

impl From<CheckError> for AuthError {
    fn from(err: CheckError) -> Self {
        AuthError::Revoked {
            check: err.check,
            message: err.message,
        }
    }
}

/// Bad input, rejected before a job is created.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing projectId")]
    MissingProject,

    #[error(transparent)]
    UnknownCategory(#[from] ParseCategoryError),

    #[error("Missing job id")]
    MissingJobId,

    #[error("Invalid job id '{0}'")]
    InvalidJobId(String),

    #[error("Invalid {field}: {message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },
}

#[derive(Error, Debug)]
pub enum AuditError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Job {job} cannot move from {from} to {to}")]
    IllegalTransition {
        job: JobId,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("Store error: {0}")]
    Store(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failures talking to a remote audit server.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("Audit server unreachable: {0}")]
    Transport(String),

    #[error("Audit server returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Audit server is rate limiting submissions: {message}")]
    RateLimited {
        retry_after: std::time::Duration,
        message: String,
    },

    #[error("Unexpected response from audit server: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, AuditError>;
