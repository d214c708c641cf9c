use std::{fmt, time::Duration};

use async_trait::async_trait;
use cloudaudit_model::{
    CategoryDescriptor, CategoryId, ErrorBody, JobId, JobStatusResponse,
    ProjectRef, ReportFormat, RunAuditAccepted, RunAuditRequest,
    routes::{api, utils},
};
use reqwest::Response;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::ClientError;

/// The two calls a polling client needs from an audit server.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuditApi: Send + Sync {
    /// Start a background run and return its job id.
    async fn submit(
        &self,
        project: &ProjectRef,
        category: CategoryId,
    ) -> Result<JobId, ClientError>;

    async fn status(&self, job: JobId) -> Result<JobStatusResponse, ClientError>;
}

/// [`AuditApi`] over HTTP against a running `cloudaudit-server`.
#[derive(Clone)]
pub struct HttpAuditApi {
    http: reqwest::Client,
    base: Url,
    session: Option<String>,
}

impl fmt::Debug for HttpAuditApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpAuditApi")
            .field("base", &self.base.as_str())
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl HttpAuditApi {
    pub fn new(http: reqwest::Client, base: Url) -> Self {
        Self {
            http,
            base,
            session: None,
        }
    }

    pub fn with_session(mut self, session: impl Into<String>) -> Self {
        self.session = Some(session.into());
        self
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        self.base
            .join(path)
            .map_err(|err| ClientError::Transport(err.to_string()))
    }

    fn request(
        &self,
        method: reqwest::Method,
        url: Url,
    ) -> reqwest::RequestBuilder {
        let builder = self.http.request(method, url);
        match &self.session {
            Some(session) => builder.header(api::headers::SESSION, session),
            None => builder,
        }
    }

    /// Category catalogue as advertised by the server.
    pub async fn categories(
        &self,
    ) -> Result<Vec<CategoryDescriptor>, ClientError> {
        let url = self.url(api::audits::CATEGORIES)?;
        let response = self
            .request(reqwest::Method::GET, url)
            .send()
            .await
            .map_err(|err| ClientError::Transport(err.to_string()))?;
        decode(response).await
    }

    /// Rendered report of a completed job, in the server's Markdown or
    /// JSON form.
    pub async fn report(
        &self,
        job: JobId,
        format: ReportFormat,
    ) -> Result<String, ClientError> {
        let id = job.to_string();
        let item = utils::replace_param(api::audits::REPORT, "{id}", &id);
        let format = match format {
            ReportFormat::Markdown => "markdown",
            ReportFormat::Json => "json",
        };
        let path = utils::with_query(&item, &[("format", format)]);
        let response = self
            .request(reqwest::Method::GET, self.url(&path)?)
            .send()
            .await
            .map_err(|err| ClientError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(http_error(response).await);
        }
        response
            .text()
            .await
            .map_err(|err| ClientError::Decode(err.to_string()))
    }
}

/// Assumed back-off when a 429 carries no retry hint.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

async fn http_error(response: Response) -> ClientError {
    let status = response.status();
    let header_hint = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok());

    let (message, body_hint) = match response.json::<ErrorBody>().await {
        Ok(body) => (body.error, body.retry_after_secs),
        Err(_) => (
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string(),
            None,
        ),
    };

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after = header_hint
            .or(body_hint)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_RETRY_AFTER);
        return ClientError::RateLimited {
            retry_after,
            message,
        };
    }

    ClientError::Http {
        status: status.as_u16(),
        message,
    }
}

async fn decode<T: DeserializeOwned>(
    response: Response,
) -> Result<T, ClientError> {
    if !response.status().is_success() {
        return Err(http_error(response).await);
    }

    response
        .json::<T>()
        .await
        .map_err(|err| ClientError::Decode(err.to_string()))
}

#[async_trait]
impl AuditApi for HttpAuditApi {
    async fn submit(
        &self,
        project: &ProjectRef,
        category: CategoryId,
    ) -> Result<JobId, ClientError> {
        let body = RunAuditRequest {
            project_id: Some(project.to_string()),
            category: Some(category.to_string()),
            wait: Some(false),
        };
        let response = self
            .request(reqwest::Method::POST, self.url(api::audits::RUN)?)
            .json(&body)
            .send()
            .await
            .map_err(|err| ClientError::Transport(err.to_string()))?;

        let accepted: RunAuditAccepted = decode(response).await?;
        Ok(accepted.job_id)
    }

    async fn status(&self, job: JobId) -> Result<JobStatusResponse, ClientError> {
        let id = job.to_string();
        let path = utils::with_query(api::audits::STATUS, &[("id", &id)]);
        let response = self
            .request(reqwest::Method::GET, self.url(&path)?)
            .send()
            .await
            .map_err(|err| ClientError::Transport(err.to_string()))?;
        decode(response).await
    }
}
