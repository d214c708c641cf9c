use serde::Deserialize;
use std::{collections::BTreeMap, path::PathBuf};

/// Raw configuration as defined in a TOML file. Durations stay textual
/// (`"2s"`, `"5m"`) until the loader parses them.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub server: FileServerConfig,
    pub environment: Option<String>,
    #[serde(default)]
    pub oauth: FileOAuthConfig,
    #[serde(default)]
    pub provider: FileProviderConfig,
    #[serde(default)]
    pub jobs: FileJobsConfig,
    #[serde(default)]
    pub poller: FilePollerConfig,
    pub fallback: Option<FileFallbackConfig>,
    #[serde(default)]
    pub savings: FileSavingsConfig,
    #[serde(default)]
    pub rate_limit: FileRateLimitConfig,
    #[serde(default)]
    pub cors: FileCorsConfig,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct FileServerConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct FileOAuthConfig {
    pub token_endpoint: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct FileProviderConfig {
    pub compute: Option<String>,
    pub storage: Option<String>,
    pub monitoring: Option<String>,
    pub resource_manager: Option<String>,
    pub iam: Option<String>,
    pub security_center: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct FileJobsConfig {
    pub hard_timeout: Option<String>,
    pub max_retained: Option<usize>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct FilePollerConfig {
    pub interval: Option<String>,
    pub timeout: Option<String>,
    pub pacing: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileFallbackConfig {
    pub access_token: String,
    #[serde(default)]
    pub scopes: Vec<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct FileSavingsConfig {
    pub rate_per_finding: Option<u64>,
    #[serde(default)]
    pub ranges: BTreeMap<String, String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct FileRateLimitConfig {
    pub max_runs: Option<u32>,
    pub window: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct FileCorsConfig {
    pub allowed_origins: Option<Vec<String>>,
}

/// Environment-derived configuration values.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub server_host: Option<String>,
    pub server_port: Option<u16>,
    pub environment: Option<String>,
    pub oauth_token_endpoint: Option<String>,
    pub oauth_client_id: Option<String>,
    pub oauth_client_secret: Option<String>,
    pub compute_api: Option<String>,
    pub storage_api: Option<String>,
    pub monitoring_api: Option<String>,
    pub resource_manager_api: Option<String>,
    pub iam_api: Option<String>,
    pub security_center_api: Option<String>,
    pub hard_timeout: Option<String>,
    pub job_retention: Option<usize>,
    pub poll_interval: Option<String>,
    pub poll_timeout: Option<String>,
    pub batch_pacing: Option<String>,
    pub fallback_access_token: Option<String>,
    pub fallback_scopes: Option<Vec<String>>,
    pub savings_rate: Option<u64>,
    pub rate_limit_max_runs: Option<u32>,
    pub rate_limit_window: Option<String>,
    pub cors_allowed_origins: Option<Vec<String>>,
}

impl EnvConfig {
    pub fn gather() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name).filter(|value| !value.trim().is_empty())
        };
        let csv = |name: &str| var(name).map(|raw| split_csv(&raw));

        Self {
            config_path: var("CLOUDAUDIT_CONFIG").map(PathBuf::from),
            server_host: var("CLOUDAUDIT_HOST"),
            server_port: var("CLOUDAUDIT_PORT").and_then(|s| s.parse().ok()),
            environment: var("CLOUDAUDIT_ENV"),
            oauth_token_endpoint: var("CLOUDAUDIT_OAUTH_TOKEN_ENDPOINT"),
            oauth_client_id: var("CLOUDAUDIT_OAUTH_CLIENT_ID"),
            oauth_client_secret: var("CLOUDAUDIT_OAUTH_CLIENT_SECRET"),
            compute_api: var("CLOUDAUDIT_COMPUTE_API"),
            storage_api: var("CLOUDAUDIT_STORAGE_API"),
            monitoring_api: var("CLOUDAUDIT_MONITORING_API"),
            resource_manager_api: var("CLOUDAUDIT_RESOURCE_MANAGER_API"),
            iam_api: var("CLOUDAUDIT_IAM_API"),
            security_center_api: var("CLOUDAUDIT_SECURITY_CENTER_API"),
            hard_timeout: var("CLOUDAUDIT_JOB_HARD_TIMEOUT"),
            job_retention: var("CLOUDAUDIT_JOB_RETENTION")
                .and_then(|s| s.parse().ok()),
            poll_interval: var("CLOUDAUDIT_POLL_INTERVAL"),
            poll_timeout: var("CLOUDAUDIT_POLL_TIMEOUT"),
            batch_pacing: var("CLOUDAUDIT_BATCH_PACING"),
            fallback_access_token: var("CLOUDAUDIT_FALLBACK_ACCESS_TOKEN"),
            fallback_scopes: csv("CLOUDAUDIT_FALLBACK_SCOPES"),
            savings_rate: var("CLOUDAUDIT_SAVINGS_RATE")
                .and_then(|s| s.parse().ok()),
            rate_limit_max_runs: var("CLOUDAUDIT_RATE_LIMIT_MAX_RUNS")
                .and_then(|s| s.parse().ok()),
            rate_limit_window: var("CLOUDAUDIT_RATE_LIMIT_WINDOW"),
            cors_allowed_origins: csv("CLOUDAUDIT_CORS_ALLOWED_ORIGINS"),
        }
    }
}

fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter_map(|part| {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn reads_prefixed_variables_and_ignores_blanks() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("CLOUDAUDIT_PORT", "9090"),
            ("CLOUDAUDIT_HOST", "  "),
            ("CLOUDAUDIT_FALLBACK_SCOPES", "cloud-platform, ,compute"),
            ("CLOUDAUDIT_SAVINGS_RATE", "not-a-number"),
        ]);
        let env = EnvConfig::from_lookup(|name| {
            vars.get(name).map(|value| value.to_string())
        });

        assert_eq!(env.server_port, Some(9090));
        assert!(env.server_host.is_none());
        assert_eq!(
            env.fallback_scopes,
            Some(vec!["cloud-platform".to_string(), "compute".to_string()])
        );
        assert!(env.savings_rate.is_none());
    }

    #[test]
    fn parses_a_full_file() {
        let file: FileConfig = toml::from_str(
            r#"
            environment = "production"

            [server]
            port = 7000

            [poller]
            interval = "3s"
            timeout = "10m"

            [savings]
            rate_per_finding = 100
            ranges = { idle_instance = "$10-20/month" }
            "#,
        )
        .expect("toml");

        assert_eq!(file.environment.as_deref(), Some("production"));
        assert_eq!(file.server.port, Some(7000));
        assert_eq!(file.poller.interval.as_deref(), Some("3s"));
        assert_eq!(file.savings.rate_per_finding, Some(100));
        assert_eq!(
            file.savings.ranges.get("idle_instance").map(String::as_str),
            Some("$10-20/month")
        );
        assert!(file.fallback.is_none());
    }
}
