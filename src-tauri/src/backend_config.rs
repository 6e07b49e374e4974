use std::{env, time::Duration};

use url::Url;

use crate::app_constants::{
    BACKEND_HOST_ENV, BACKEND_PORT_ENV, BACKEND_READY_INTERVAL_ENV, BACKEND_READY_TIMEOUT_ENV,
    DEFAULT_BACKEND_HOST, DEFAULT_BACKEND_PORT, DEFAULT_READY_INTERVAL_MS,
    DEFAULT_READY_TIMEOUT_MS, HEALTH_PATH, READY_INTERVAL_MAX_MS, READY_INTERVAL_MIN_MS,
};

pub fn process_env_lookup(key: &str) -> Option<String> {
    env::var(key).ok()
}

/// Empty values are treated the same as unset ones.
fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Where the backend listens. External values win over the defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendEndpoint {
    pub host: String,
    pub port: String,
}

impl BackendEndpoint {
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            host: non_empty(&lookup, BACKEND_HOST_ENV)
                .unwrap_or_else(|| DEFAULT_BACKEND_HOST.to_string()),
            port: non_empty(&lookup, BACKEND_PORT_ENV)
                .unwrap_or_else(|| DEFAULT_BACKEND_PORT.to_string()),
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn health_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&format!("{}{}", self.base_url(), HEALTH_PATH))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessOptions {
    pub timeout: Duration,
    pub interval: Duration,
}

impl Default for ReadinessOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_READY_TIMEOUT_MS),
            interval: Duration::from_millis(DEFAULT_READY_INTERVAL_MS),
        }
    }
}

impl ReadinessOptions {
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let parse_ms = |key: &str| {
            non_empty(&lookup, key).and_then(|value| match value.parse::<u64>() {
                Ok(parsed) => Some(parsed),
                Err(error) => {
                    log::warn!("ignoring invalid {key}={value}: {error}");
                    None
                }
            })
        };

        let timeout_ms = parse_ms(BACKEND_READY_TIMEOUT_ENV).unwrap_or(DEFAULT_READY_TIMEOUT_MS);
        let interval_ms = parse_ms(BACKEND_READY_INTERVAL_ENV)
            .unwrap_or(DEFAULT_READY_INTERVAL_MS)
            .clamp(READY_INTERVAL_MIN_MS, READY_INTERVAL_MAX_MS);

        Self {
            timeout: Duration::from_millis(timeout_ms),
            interval: Duration::from_millis(interval_ms),
        }
    }
}

/// Everything the readiness gate needs, captured once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthCheckConfig {
    pub endpoint: BackendEndpoint,
    pub options: ReadinessOptions,
}

impl HealthCheckConfig {
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            endpoint: BackendEndpoint::from_lookup(&lookup),
            options: ReadinessOptions::from_lookup(&lookup),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(process_env_lookup)
    }
}
