use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{Duration, SecondsFormat, Utc};
use cloudaudit_model::{Credential, ProjectRef};
use reqwest::{RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::types::{
    Bucket, Disk, FirewallRule, IamPolicy, Instance, ServiceAccount,
    ServiceAccountKey,
};
use super::{CloudApi, ProviderResult};
use crate::error::{CheckError, CheckErrorKind};

/// Base URLs of the management APIs.
#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
    pub compute: Url,
    pub storage: Url,
    pub monitoring: Url,
    pub resource_manager: Url,
    pub iam: Url,
    pub security_center: Url,
}

impl ProviderEndpoints {
    /// Public Google Cloud endpoints.
    pub fn google() -> Result<Self, url::ParseError> {
        Ok(Self {
            compute: Url::parse("https://compute.googleapis.com")?,
            storage: Url::parse("https://storage.googleapis.com")?,
            monitoring: Url::parse("https://monitoring.googleapis.com")?,
            resource_manager: Url::parse(
                "https://cloudresourcemanager.googleapis.com",
            )?,
            iam: Url::parse("https://iam.googleapis.com")?,
            security_center: Url::parse(
                "https://securitycenter.googleapis.com",
            )?,
        })
    }
}

/// reqwest-backed [`CloudApi`].
#[derive(Debug, Clone)]
pub struct ProviderClient {
    http: reqwest::Client,
    endpoints: ProviderEndpoints,
}

fn endpoint(base: &Url, path: &str) -> String {
    format!("{}{}", base.as_str().trim_end_matches('/'), path)
}

fn provider_error(
    kind: CheckErrorKind,
    message: impl Into<String>,
) -> CheckError {
    CheckError::new(String::new(), kind, message)
}

fn map_status(status: StatusCode, body: &str) -> CheckError {
    let detail = body.chars().take(200).collect::<String>();
    match status {
        StatusCode::UNAUTHORIZED => provider_error(
            CheckErrorKind::Unauthorized,
            "Provider rejected the access token",
        ),
        StatusCode::FORBIDDEN => provider_error(
            CheckErrorKind::PermissionDenied,
            format!("Permission denied: {detail}"),
        ),
        StatusCode::NOT_FOUND => {
            provider_error(CheckErrorKind::NotFound, "Resource not found")
        }
        StatusCode::TOO_MANY_REQUESTS => {
            provider_error(CheckErrorKind::RateLimited, "Rate limited")
        }
        other => provider_error(
            CheckErrorKind::Api,
            format!("API error ({}): {detail}", other.as_u16()),
        ),
    }
}

#[derive(Debug, Default, Deserialize)]
struct ItemsPage<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Default, Deserialize)]
struct AggregatedPage {
    #[serde(default)]
    items: BTreeMap<String, Value>,
}

impl AggregatedPage {
    /// Flatten `items.<zone>.<field>` lists, skipping zones without data.
    fn flatten<T: DeserializeOwned>(
        self,
        field: &str,
    ) -> ProviderResult<Vec<T>> {
        let mut out = Vec::new();
        for (_, scope) in self.items {
            if let Some(list) = scope.get(field) {
                let parsed: Vec<T> = serde_json::from_value(list.clone())
                    .map_err(|err| {
                        provider_error(CheckErrorKind::Parse, err.to_string())
                    })?;
                out.extend(parsed);
            }
        }
        Ok(out)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimeSeriesPage {
    #[serde(default)]
    time_series: Vec<TimeSeries>,
}

#[derive(Debug, Default, Deserialize)]
struct TimeSeries {
    #[serde(default)]
    points: Vec<Point>,
}

#[derive(Debug, Default, Deserialize)]
struct Point {
    #[serde(default)]
    value: PointValue,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PointValue {
    #[serde(default)]
    double_value: Option<f64>,
    #[serde(default)]
    int64_value: Option<String>,
}

impl PointValue {
    fn as_f64(&self) -> f64 {
        self.double_value
            .or_else(|| self.int64_value.as_deref()?.parse().ok())
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Default, Deserialize)]
struct AccountsPage {
    #[serde(default)]
    accounts: Vec<ServiceAccount>,
}

#[derive(Debug, Default, Deserialize)]
struct KeysPage {
    #[serde(default)]
    keys: Vec<ServiceAccountKey>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FindingsPage {
    #[serde(default)]
    list_findings_results: Vec<FindingResult>,
}

#[derive(Debug, Default, Deserialize)]
struct FindingResult {
    #[serde(default)]
    finding: Value,
}

impl ProviderClient {
    pub fn new(http: reqwest::Client, endpoints: ProviderEndpoints) -> Self {
        Self { http, endpoints }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        credential: &Credential,
    ) -> ProviderResult<T> {
        let response = request
            .bearer_auth(credential.access_token.expose())
            .send()
            .await
            .map_err(|err| {
                provider_error(CheckErrorKind::Transport, err.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status(status, &body));
        }

        response.json::<T>().await.map_err(|err| {
            provider_error(CheckErrorKind::Parse, err.to_string())
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        url: String,
        credential: &Credential,
    ) -> ProviderResult<T> {
        debug!(%url, "provider request");
        self.send(self.http.get(url), credential).await
    }
}

#[async_trait]
impl CloudApi for ProviderClient {
    async fn list_buckets(
        &self,
        credential: &Credential,
        project: &ProjectRef,
    ) -> ProviderResult<Vec<Bucket>> {
        let url = endpoint(&self.endpoints.storage, "/storage/v1/b");
        let request =
            self.http.get(url).query(&[("project", project.as_str())]);
        let page: ItemsPage<Bucket> = self.send(request, credential).await?;
        Ok(page.items)
    }

    async fn list_instances(
        &self,
        credential: &Credential,
        project: &ProjectRef,
    ) -> ProviderResult<Vec<Instance>> {
        let url = endpoint(
            &self.endpoints.compute,
            &format!("/compute/v1/projects/{project}/aggregated/instances"),
        );
        let page: AggregatedPage = self.get(url, credential).await?;
        page.flatten("instances")
    }

    async fn list_disks(
        &self,
        credential: &Credential,
        project: &ProjectRef,
    ) -> ProviderResult<Vec<Disk>> {
        let url = endpoint(
            &self.endpoints.compute,
            &format!("/compute/v1/projects/{project}/aggregated/disks"),
        );
        let page: AggregatedPage = self.get(url, credential).await?;
        page.flatten("disks")
    }

    async fn metric_points(
        &self,
        credential: &Credential,
        project: &ProjectRef,
        filter: &str,
        window_minutes: i64,
    ) -> ProviderResult<Vec<f64>> {
        let end = Utc::now();
        let start = end - Duration::minutes(window_minutes);
        let url = endpoint(
            &self.endpoints.monitoring,
            &format!("/v3/projects/{project}/timeSeries"),
        );
        let request = self.http.get(url).query(&[
            ("filter", filter.to_string()),
            (
                "interval.startTime",
                start.to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
            (
                "interval.endTime",
                end.to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
        ]);
        let page: TimeSeriesPage = self.send(request, credential).await?;
        Ok(page
            .time_series
            .into_iter()
            .next()
            .map(|series| {
                series.points.iter().map(|p| p.value.as_f64()).collect()
            })
            .unwrap_or_default())
    }

    async fn iam_policy(
        &self,
        credential: &Credential,
        project: &ProjectRef,
    ) -> ProviderResult<IamPolicy> {
        let url = endpoint(
            &self.endpoints.resource_manager,
            &format!("/v1/projects/{project}:getIamPolicy"),
        );
        let request = self.http.post(url).json(&serde_json::json!({}));
        self.send(request, credential).await
    }

    async fn list_service_accounts(
        &self,
        credential: &Credential,
        project: &ProjectRef,
    ) -> ProviderResult<Vec<ServiceAccount>> {
        let url = endpoint(
            &self.endpoints.iam,
            &format!("/v1/projects/{project}/serviceAccounts"),
        );
        let page: AccountsPage = self.get(url, credential).await?;
        Ok(page.accounts)
    }

    async fn list_user_managed_keys(
        &self,
        credential: &Credential,
        project: &ProjectRef,
        account_email: &str,
    ) -> ProviderResult<Vec<ServiceAccountKey>> {
        let url = endpoint(
            &self.endpoints.iam,
            &format!(
                "/v1/projects/{project}/serviceAccounts/{account_email}/keys"
            ),
        );
        let request =
            self.http.get(url).query(&[("keyTypes", "USER_MANAGED")]);
        let page: KeysPage = self.send(request, credential).await?;
        Ok(page.keys)
    }

    async fn list_firewalls(
        &self,
        credential: &Credential,
        project: &ProjectRef,
    ) -> ProviderResult<Vec<FirewallRule>> {
        let url = endpoint(
            &self.endpoints.compute,
            &format!("/compute/v1/projects/{project}/global/firewalls"),
        );
        let page: ItemsPage<FirewallRule> = self.get(url, credential).await?;
        Ok(page.items)
    }

    async fn list_security_findings(
        &self,
        credential: &Credential,
        project: &ProjectRef,
    ) -> ProviderResult<Vec<Value>> {
        let url = endpoint(
            &self.endpoints.security_center,
            &format!("/v1/projects/{project}/sources/-/findings"),
        );
        let request =
            self.http.get(url).query(&[("filter", "state=\"ACTIVE\"")]);
        let page: FindingsPage = self.send(request, credential).await?;
        Ok(page
            .list_findings_results
            .into_iter()
            .map(|result| result.finding)
            .collect())
    }
}
