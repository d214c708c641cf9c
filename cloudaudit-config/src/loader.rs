use once_cell::sync::Lazy;
use std::{fs, path::PathBuf, time::Duration};
use thiserror::Error;
use url::Url;

use crate::{
    models::{
        Config, ConfigMetadata, CorsConfig, DEFAULT_BATCH_PACING,
        DEFAULT_HARD_TIMEOUT, DEFAULT_HOST, DEFAULT_JOB_RETENTION,
        DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT, DEFAULT_PORT,
        DEFAULT_RATE_LIMIT_RUNS, DEFAULT_RATE_LIMIT_WINDOW,
        DEFAULT_SAVINGS_RATE, DEFAULT_TOKEN_ENDPOINT, Environment, FallbackConfig, JobsConfig,
        OAuthConfig, PollerConfig, ProviderConfig, RateLimitConfig,
        SavingsConfig, ServerConfig,
    },
    sources::{EnvConfig, FileConfig},
    validation::{self, ConfigGuardRailError, ConfigWarnings},
};

static DEFAULT_CONFIG_LOCATIONS: Lazy<Vec<PathBuf>> = Lazy::new(|| {
    vec![
        PathBuf::from("cloudaudit.toml"),
        PathBuf::from("config/cloudaudit.toml"),
    ]
});

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true).or_else(
                |err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                },
            )?,
            None => {
                dotenvy::dotenv().map(|_| true).or_else(|err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                })?
            }
        };

        let mut load = self.load_with(EnvConfig::gather())?;
        load.config.metadata.env_file_loaded = env_file_loaded;
        Ok(load)
    }

    /// Compose from an explicit environment snapshot; `.env` files are not
    /// consulted.
    pub fn load_with(&self, env: EnvConfig) -> Result<ConfigLoad, ConfigLoadError> {
        let (file_config, config_path) = self.load_file_config(&env)?;
        let (config, warnings) = compose_config(file_config, env, config_path)?;
        Ok(ConfigLoad { config, warnings })
    }

    fn load_file_config(
        &self,
        env: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let (path, explicit) = match (&self.options.config_path, &env.config_path)
        {
            (Some(path), _) | (None, Some(path)) => (path.clone(), true),
            (None, None) => match DEFAULT_CONFIG_LOCATIONS
                .iter()
                .find(|candidate| candidate.exists())
            {
                Some(path) => (path.clone(), false),
                None => return Ok((None, None)),
            },
        };

        if !path.exists() {
            if explicit {
                return Err(ConfigLoadError::MissingConfig { path });
            }
            return Ok((None, None));
        }

        let contents =
            fs::read_to_string(&path).map_err(|source| ConfigLoadError::Io {
                path: path.clone(),
                source,
            })?;
        let file_config: FileConfig =
            toml::from_str(&contents).map_err(|source| {
                ConfigLoadError::Parse {
                    path: path.clone(),
                    source,
                }
            })?;

        Ok((Some(file_config), Some(path)))
    }
}

fn compose_config(
    file_config: Option<FileConfig>,
    env: EnvConfig,
    config_path: Option<PathBuf>,
) -> Result<(Config, ConfigWarnings), ConfigLoadError> {
    let mut warnings = ConfigWarnings::default();

    if file_config.is_none() {
        warnings.push_with_hint(
            "No cloudaudit.toml detected; using environment variables and defaults",
            "Set CLOUDAUDIT_CONFIG or pass --config to load a configuration file",
        );
    }

    let FileConfig {
        server: file_server,
        environment: file_environment,
        oauth: file_oauth,
        provider: file_provider,
        jobs: file_jobs,
        poller: file_poller,
        fallback: file_fallback,
        savings: file_savings,
        rate_limit: file_rate_limit,
        cors: file_cors,
    } = file_config.unwrap_or_default();

    let server = ServerConfig {
        host: env
            .server_host
            .or(file_server.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port: env.server_port.or(file_server.port).unwrap_or(DEFAULT_PORT),
    };

    let environment = match env.environment.or(file_environment) {
        Some(raw) => Environment::parse(&raw)
            .ok_or(ConfigLoadError::InvalidEnvironment { value: raw })?,
        None => Environment::default(),
    };

    let oauth = OAuthConfig {
        token_endpoint: parse_url(
            "oauth.token_endpoint",
            env.oauth_token_endpoint
                .or(file_oauth.token_endpoint)
                .as_deref()
                .unwrap_or(DEFAULT_TOKEN_ENDPOINT),
        )?,
        client_id: env.oauth_client_id.or(file_oauth.client_id),
        client_secret: env.oauth_client_secret.or(file_oauth.client_secret),
    };

    let provider = ProviderConfig {
        compute: optional_url(
            "provider.compute",
            env.compute_api.or(file_provider.compute),
        )?,
        storage: optional_url(
            "provider.storage",
            env.storage_api.or(file_provider.storage),
        )?,
        monitoring: optional_url(
            "provider.monitoring",
            env.monitoring_api.or(file_provider.monitoring),
        )?,
        resource_manager: optional_url(
            "provider.resource_manager",
            env.resource_manager_api.or(file_provider.resource_manager),
        )?,
        iam: optional_url("provider.iam", env.iam_api.or(file_provider.iam))?,
        security_center: optional_url(
            "provider.security_center",
            env.security_center_api.or(file_provider.security_center),
        )?,
    };

    let jobs = JobsConfig {
        hard_timeout: duration(
            "jobs.hard_timeout",
            env.hard_timeout.or(file_jobs.hard_timeout),
            DEFAULT_HARD_TIMEOUT,
        )?,
        max_retained: env
            .job_retention
            .or(file_jobs.max_retained)
            .unwrap_or(DEFAULT_JOB_RETENTION),
    };

    let poller = PollerConfig {
        interval: duration(
            "poller.interval",
            env.poll_interval.or(file_poller.interval),
            DEFAULT_POLL_INTERVAL,
        )?,
        timeout: duration(
            "poller.timeout",
            env.poll_timeout.or(file_poller.timeout),
            DEFAULT_POLL_TIMEOUT,
        )?,
        pacing: duration(
            "poller.pacing",
            env.batch_pacing.or(file_poller.pacing),
            DEFAULT_BATCH_PACING,
        )?,
    };

    let fallback = match env.fallback_access_token {
        Some(access_token) => Some(FallbackConfig {
            access_token,
            scopes: env
                .fallback_scopes
                .or_else(|| file_fallback.as_ref().map(|f| f.scopes.clone()))
                .unwrap_or_default(),
        }),
        None => file_fallback
            .filter(|f| !f.access_token.trim().is_empty())
            .map(|f| FallbackConfig {
                access_token: f.access_token,
                scopes: env.fallback_scopes.unwrap_or(f.scopes),
            }),
    };

    let savings = SavingsConfig {
        rate_per_finding: env
            .savings_rate
            .or(file_savings.rate_per_finding)
            .unwrap_or(DEFAULT_SAVINGS_RATE),
        ranges: file_savings.ranges,
    };

    let rate_limit = RateLimitConfig {
        max_runs: env
            .rate_limit_max_runs
            .or(file_rate_limit.max_runs)
            .unwrap_or(DEFAULT_RATE_LIMIT_RUNS),
        window: duration(
            "rate_limit.window",
            env.rate_limit_window.or(file_rate_limit.window),
            DEFAULT_RATE_LIMIT_WINDOW,
        )?,
    };

    let cors = CorsConfig {
        allowed_origins: env
            .cors_allowed_origins
            .or(file_cors.allowed_origins)
            .unwrap_or_else(default_cors_origins),
    };

    let config = Config {
        server,
        environment,
        oauth,
        provider,
        jobs,
        poller,
        fallback,
        savings,
        rate_limit,
        cors,
        metadata: ConfigMetadata {
            config_path,
            env_file_loaded: false,
        },
    };

    warnings.extend(validation::apply_guard_rails(&config)?);
    Ok((config, warnings))
}

fn duration(
    field: &'static str,
    raw: Option<String>,
    default: Duration,
) -> Result<Duration, ConfigLoadError> {
    match raw {
        Some(value) => humantime::parse_duration(value.trim()).map_err(|source| {
            ConfigLoadError::InvalidDuration {
                field,
                value,
                source,
            }
        }),
        None => Ok(default),
    }
}

fn parse_url(field: &'static str, raw: &str) -> Result<Url, ConfigLoadError> {
    Url::parse(raw.trim()).map_err(|source| ConfigLoadError::InvalidUrl {
        field,
        value: raw.to_string(),
        source,
    })
}

fn optional_url(
    field: &'static str,
    raw: Option<String>,
) -> Result<Option<Url>, ConfigLoadError> {
    raw.map(|value| parse_url(field, &value)).transpose()
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:5173".to_string(),
    ]
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("configuration file missing: {path}")]
    MissingConfig { path: PathBuf },
    #[error("failed to read configuration {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid duration '{value}' for {field}")]
    InvalidDuration {
        field: &'static str,
        value: String,
        #[source]
        source: humantime::DurationError,
    },
    #[error("invalid URL '{value}' for {field}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        #[source]
        source: url::ParseError,
    },
    #[error("invalid environment '{value}' (expected development or production)")]
    InvalidEnvironment { value: String },
    #[error(transparent)]
    GuardRail(#[from] ConfigGuardRailError),
    #[error(transparent)]
    EnvFile(#[from] dotenvy::Error),
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}
