//! Provider management API access used by the built-in checks.

mod http;
mod types;

pub use http::{ProviderClient, ProviderEndpoints};
pub use types::{
    AttachedDisk, Bucket, BucketEncryption, BucketLifecycle, Disk,
    DiskEncryptionKey, FirewallAllowed, FirewallRule, IamBinding, IamPolicy,
    Instance, LifecycleRule, RetentionPolicy, ServiceAccount,
    ServiceAccountKey,
};

use async_trait::async_trait;
use cloudaudit_model::{Credential, ProjectRef};
use serde_json::Value;

use crate::error::CheckError;

pub type ProviderResult<T> = std::result::Result<T, CheckError>;

/// Management API surface consumed by checks. Errors carry an empty check
/// name; the runner attributes them to the calling check.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CloudApi: Send + Sync {
    async fn list_buckets(
        &self,
        credential: &Credential,
        project: &ProjectRef,
    ) -> ProviderResult<Vec<Bucket>>;

    async fn list_instances(
        &self,
        credential: &Credential,
        project: &ProjectRef,
    ) -> ProviderResult<Vec<Instance>>;

    async fn list_disks(
        &self,
        credential: &Credential,
        project: &ProjectRef,
    ) -> ProviderResult<Vec<Disk>>;

    /// Point values of the first series matching `filter` over the last
    /// `window_minutes`.
    async fn metric_points(
        &self,
        credential: &Credential,
        project: &ProjectRef,
        filter: &str,
        window_minutes: i64,
    ) -> ProviderResult<Vec<f64>>;

    async fn iam_policy(
        &self,
        credential: &Credential,
        project: &ProjectRef,
    ) -> ProviderResult<IamPolicy>;

    async fn list_service_accounts(
        &self,
        credential: &Credential,
        project: &ProjectRef,
    ) -> ProviderResult<Vec<ServiceAccount>>;

    async fn list_user_managed_keys(
        &self,
        credential: &Credential,
        project: &ProjectRef,
        account_email: &str,
    ) -> ProviderResult<Vec<ServiceAccountKey>>;

    async fn list_firewalls(
        &self,
        credential: &Credential,
        project: &ProjectRef,
    ) -> ProviderResult<Vec<FirewallRule>>;

    /// Active Security Command Center findings as returned by the API.
    async fn list_security_findings(
        &self,
        credential: &Credential,
        project: &ProjectRef,
    ) -> ProviderResult<Vec<Value>>;
}
