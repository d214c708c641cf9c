use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub location_type: Option<String>,
    #[serde(default)]
    pub encryption: Option<BucketEncryption>,
    #[serde(default)]
    pub lifecycle: Option<BucketLifecycle>,
    #[serde(default)]
    pub retention_policy: Option<RetentionPolicy>,
}

impl Bucket {
    pub fn has_customer_managed_key(&self) -> bool {
        self.encryption
            .as_ref()
            .and_then(|e| e.default_kms_key_name.as_deref())
            .is_some_and(|key| !key.is_empty())
    }

    pub fn has_lifecycle_or_retention(&self) -> bool {
        let has_rules = self
            .lifecycle
            .as_ref()
            .is_some_and(|l| !l.rule.is_empty());
        has_rules || self.retention_policy.is_some()
    }

    pub fn is_multi_region(&self) -> bool {
        self.location_type
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case("multi-region"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketEncryption {
    #[serde(default)]
    pub default_kms_key_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BucketLifecycle {
    #[serde(default)]
    pub rule: Vec<LifecycleRule>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LifecycleRule {
    #[serde(default)]
    pub action: serde_json::Value,
    #[serde(default)]
    pub condition: serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetentionPolicy {
    #[serde(default)]
    pub retention_period: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub zone: String,
    #[serde(default)]
    pub machine_type: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub labels: std::collections::BTreeMap<String, String>,
    #[serde(default)]
    pub disks: Vec<AttachedDisk>,
}

impl Instance {
    pub fn is_running(&self) -> bool {
        self.status.eq_ignore_ascii_case("RUNNING")
    }

    /// Trailing segment of the zone URL (`us-central1-a`).
    pub fn zone_name(&self) -> &str {
        self.zone.rsplit('/').next().unwrap_or(&self.zone)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachedDisk {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub boot: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Disk {
    pub name: String,
    #[serde(default)]
    pub zone: String,
    #[serde(default)]
    pub disk_encryption_key: Option<DiskEncryptionKey>,
    #[serde(default)]
    pub users: Vec<String>,
}

impl Disk {
    pub fn has_customer_managed_key(&self) -> bool {
        self.disk_encryption_key
            .as_ref()
            .and_then(|k| k.kms_key_name.as_deref())
            .is_some_and(|key| !key.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskEncryptionKey {
    #[serde(default)]
    pub kms_key_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct IamPolicy {
    #[serde(default)]
    pub bindings: Vec<IamBinding>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct IamBinding {
    pub role: String,
    #[serde(default)]
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccount {
    pub email: String,
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccountKey {
    pub name: String,
    #[serde(default)]
    pub valid_after_time: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirewallRule {
    pub name: String,
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub source_ranges: Vec<String>,
    #[serde(default)]
    pub allowed: Vec<FirewallAllowed>,
}

impl FirewallRule {
    pub fn is_open_to_world(&self) -> bool {
        let ingress = self
            .direction
            .as_deref()
            .is_none_or(|d| d.eq_ignore_ascii_case("INGRESS"));
        ingress
            && !self.disabled
            && self.source_ranges.iter().any(|r| r == "0.0.0.0/0")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirewallAllowed {
    #[serde(rename = "IPProtocol", default)]
    pub ip_protocol: String,
    #[serde(default)]
    pub ports: Vec<String>,
}
