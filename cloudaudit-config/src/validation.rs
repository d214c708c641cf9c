use std::time::Duration;

use thiserror::Error;

use crate::models::Config;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigGuardRailError {
    #[error(
        "a fallback credential is configured while environment = production"
    )]
    FallbackInProduction,
    #[error("poll interval {interval:?} exceeds poll timeout {timeout:?}")]
    PollIntervalExceedsTimeout { interval: Duration, timeout: Duration },
    #[error("{field} must be greater than zero")]
    ZeroValue { field: &'static str },
}

#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(
        &mut self,
        message: S,
        hint: H,
    ) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn extend(&mut self, other: ConfigWarnings) {
        self.items.extend(other.items);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigWarning> {
        self.items.iter()
    }
}

pub fn apply_guard_rails(
    config: &Config,
) -> Result<ConfigWarnings, ConfigGuardRailError> {
    let mut warnings = ConfigWarnings::default();

    if config.fallback.is_some() {
        if config.is_production() {
            return Err(ConfigGuardRailError::FallbackInProduction);
        }
        warnings.push_with_hint(
            "Fallback credential configured; requests without a stored credential will use it",
            "Unset CLOUDAUDIT_FALLBACK_ACCESS_TOKEN outside local development",
        );
    }

    for (field, value) in [
        ("jobs.hard_timeout", config.jobs.hard_timeout),
        ("poller.interval", config.poller.interval),
        ("poller.timeout", config.poller.timeout),
        ("rate_limit.window", config.rate_limit.window),
    ] {
        if value.is_zero() {
            return Err(ConfigGuardRailError::ZeroValue { field });
        }
    }
    if config.rate_limit.max_runs == 0 {
        return Err(ConfigGuardRailError::ZeroValue {
            field: "rate_limit.max_runs",
        });
    }
    if config.jobs.max_retained == 0 {
        return Err(ConfigGuardRailError::ZeroValue {
            field: "jobs.max_retained",
        });
    }

    if config.poller.interval > config.poller.timeout {
        return Err(ConfigGuardRailError::PollIntervalExceedsTimeout {
            interval: config.poller.interval,
            timeout: config.poller.timeout,
        });
    }

    if config.oauth.client_id.is_none() || config.oauth.client_secret.is_none()
    {
        warnings.push_with_hint(
            "OAuth client id or secret not configured; expired credentials cannot be refreshed",
            "Set CLOUDAUDIT_OAUTH_CLIENT_ID and CLOUDAUDIT_OAUTH_CLIENT_SECRET",
        );
    }

    if config.is_production() && config.cors.is_wildcard() {
        warnings.push(
            "CORS allows any origin in production; restrict CLOUDAUDIT_CORS_ALLOWED_ORIGINS",
        );
    }

    Ok(warnings)
}
