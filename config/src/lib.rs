//! Configuration for IMEI Hunter.
//!
//! Read from `~/.imei-hunter/config.toml`. Every section and key is optional;
//! a missing file means defaults throughout.

use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use imei_client::retry::RetryConfig;
use imei_client::{ClientConfig, ClientConfigError, DEFAULT_BASE_URL};
use serde::Deserialize;

/// Overrides `service.base_url` when set to a non-blank value.
pub const SERVICE_URL_ENV: &str = "IMEI_HUNTER_SERVICE_URL";

const CONFIG_DIR: &str = ".imei-hunter";

#[derive(Debug, Default, Deserialize)]
pub struct HunterConfig {
    pub service: Option<ServiceConfig>,
    pub app: Option<AppConfig>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ServiceConfig {
    /// Root URL of the lookup service. `${VAR}` references are expanded.
    pub base_url: Option<String>,
    pub connect_timeout_secs: Option<u64>,
    /// Whole-request timeout. `0` disables it.
    pub request_timeout_secs: Option<u64>,
    /// Backoff for session start requests. Challenge answers are never resent.
    pub retry: Option<RetrySection>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RetrySection {
    pub max_retries: Option<u32>,
    pub initial_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    /// Where challenge images are written. `${VAR}` references are expanded.
    pub challenge_dir: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

impl HunterConfig {
    /// Load from the default location. `Ok(None)` when there is no file.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path).map_err(|source| {
            tracing::warn!(path = %path.display(), error = %source, "Failed to read config");
            ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }
        })?;

        let config = toml::from_str(&content).map_err(|source| {
            tracing::warn!(path = %path.display(), error = %source, "Failed to parse config");
            ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })?;
        Ok(Some(config))
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    /// Service URL after applying [`SERVICE_URL_ENV`] and `${VAR}` expansion.
    #[must_use]
    pub fn service_url(&self) -> String {
        self.resolve_service_url(env::var(SERVICE_URL_ENV).ok())
    }

    fn resolve_service_url(&self, env_override: Option<String>) -> String {
        if let Some(url) = env_override.filter(|v| !v.trim().is_empty()) {
            return url;
        }
        self.service
            .as_ref()
            .and_then(|s| s.base_url.as_deref())
            .map(expand_env_vars)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    /// Build the HTTP client settings, filling unset keys with client defaults.
    pub fn client_config(&self) -> Result<ClientConfig, ClientConfigError> {
        self.client_config_for(&self.service_url())
    }

    fn client_config_for(&self, url: &str) -> Result<ClientConfig, ClientConfigError> {
        let mut config = ClientConfig::new(url)?;
        let Some(service) = &self.service else {
            return Ok(config);
        };

        if let Some(secs) = service.connect_timeout_secs.filter(|s| *s > 0) {
            config = config.with_connect_timeout(Duration::from_secs(secs));
        }
        match service.request_timeout_secs {
            Some(0) => config = config.with_request_timeout(None),
            Some(secs) => config = config.with_request_timeout(Some(Duration::from_secs(secs))),
            None => {}
        }
        if let Some(retry) = &service.retry {
            config = config.with_start_retry(retry.to_retry_config());
        }
        Ok(config)
    }

    /// Directory for challenge images. Defaults to `imei-hunter` under the system temp dir.
    #[must_use]
    pub fn challenge_dir(&self) -> PathBuf {
        self.app
            .as_ref()
            .and_then(|a| a.challenge_dir.as_deref())
            .map(expand_env_vars)
            .filter(|v| !v.trim().is_empty())
            .map_or_else(|| env::temp_dir().join("imei-hunter"), PathBuf::from)
    }
}

impl RetrySection {
    #[must_use]
    pub fn to_retry_config(&self) -> RetryConfig {
        let defaults = RetryConfig::default();
        let initial_delay = self
            .initial_delay_ms
            .map_or(defaults.initial_delay, Duration::from_millis);
        let max_delay = self
            .max_delay_ms
            .map_or(defaults.max_delay, Duration::from_millis)
            .max(initial_delay);
        RetryConfig {
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            initial_delay,
            max_delay,
            ..defaults
        }
    }
}

/// Expand `${VAR}` references. Unset variables become empty; an unclosed
/// `${` is kept literally.
#[must_use]
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let var = &after[..end];
        if !var.is_empty() {
            out.push_str(&env::var(var).unwrap_or_default());
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_DIR).join("config.toml"))
}

/// Log file written by the binary.
#[must_use]
pub fn log_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_DIR).join("logs").join("imei-hunter.log"))
}
