use std::{collections::BTreeMap, fmt, path::PathBuf, time::Duration};

use url::Url;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_HARD_TIMEOUT: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_JOB_RETENTION: usize = 1000;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_BATCH_PACING: Duration = Duration::from_secs(1);
pub const DEFAULT_SAVINGS_RATE: u64 = 75;
pub const DEFAULT_RATE_LIMIT_RUNS: u32 = 5;
pub const DEFAULT_RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub environment: Environment,
    pub oauth: OAuthConfig,
    pub provider: ProviderConfig,
    pub jobs: JobsConfig,
    pub poller: PollerConfig,
    pub fallback: Option<FallbackConfig>,
    pub savings: SavingsConfig,
    pub rate_limit: RateLimitConfig,
    pub cors: CorsConfig,
    pub metadata: ConfigMetadata,
}

impl Config {
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Some(Environment::Development),
            "production" | "prod" => Some(Environment::Production),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone)]
pub struct OAuthConfig {
    pub token_endpoint: Url,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

impl fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("token_endpoint", &self.token_endpoint.as_str())
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "***"),
            )
            .finish()
    }
}

/// Overrides for the provider management API base URLs. `None` keeps the
/// public endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderConfig {
    pub compute: Option<Url>,
    pub storage: Option<Url>,
    pub monitoring: Option<Url>,
    pub resource_manager: Option<Url>,
    pub iam: Option<Url>,
    pub security_center: Option<Url>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobsConfig {
    pub hard_timeout: Duration,
    /// Finished jobs kept in memory before the oldest are evicted.
    pub max_retained: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
    pub interval: Duration,
    pub timeout: Duration,
    /// Delay between consecutive category runs in a batch.
    pub pacing: Duration,
}

/// Privileged credential used when no per-session credential exists.
/// Refused in production.
#[derive(Clone)]
pub struct FallbackConfig {
    pub access_token: String,
    pub scopes: Vec<String>,
}

impl fmt::Debug for FallbackConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallbackConfig")
            .field("access_token", &"***")
            .field("scopes", &self.scopes)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavingsConfig {
    pub rate_per_finding: u64,
    /// Check type to display range (e.g. `low_cpu_utilization` →
    /// `"$50-150/month"`), merged over the built-in table.
    pub ranges: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub max_runs: u32,
    pub window: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl CorsConfig {
    pub fn is_wildcard(&self) -> bool {
        self.allowed_origins.iter().any(|origin| origin == "*")
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
}
