//! Client configuration
//!
//! [`ClientConfig`] carries everything the rating client needs: endpoint
//! URLs, cache timing, and retry budgets. Values come from built-in defaults,
//! optionally overridden by a JSON config file and then by command-line flags.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::ratings::fetch::{RetryPolicy, DEFAULT_BACKOFF_STEP, DEFAULT_TIMEOUT};

/// Spreadsheet-backed endpoint that stores course ratings
pub const DEFAULT_ENDPOINT: &str = "https://script.google.com/macros/s/AKfycbyu88YR5217U9w5iUPDbaC03gv9kpP8tkeSjglEyMrkAFaVuV-p11CKDKPghi_dj2sG3A/exec";

/// Service used to tag submissions with the caller's public IP
pub const DEFAULT_IP_LOOKUP_URL: &str = "https://api.ipify.org?format=json";

/// How long a fetched rating stays fresh (5 minutes)
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// How often expired cache entries are swept (10 minutes)
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Name of the config file inside the config directory
const CONFIG_FILE_NAME: &str = "config.json";

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid JSON for [`ConfigFile`]
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Runtime configuration of a [`RatingClient`](crate::ratings::RatingClient)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Ratings endpoint URL
    pub endpoint: String,
    /// IP lookup URL
    pub ip_lookup_url: String,
    /// Time-to-live for cached rating summaries
    pub cache_ttl: Duration,
    /// Interval of the background cache sweep
    pub sweep_interval: Duration,
    /// Timeout applied to each request attempt
    pub request_timeout: Duration,
    /// Retries for ratings fetches and submissions
    pub fetch_retries: u32,
    /// Retries for the IP lookup
    pub ip_lookup_retries: u32,
    /// Backoff step between attempts
    pub backoff_step: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            ip_lookup_url: DEFAULT_IP_LOOKUP_URL.to_string(),
            cache_ttl: DEFAULT_CACHE_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            request_timeout: DEFAULT_TIMEOUT,
            fetch_retries: 2,
            ip_lookup_retries: 1,
            backoff_step: DEFAULT_BACKOFF_STEP,
        }
    }
}

impl ClientConfig {
    /// Sets the ratings endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Sets the IP lookup URL
    pub fn with_ip_lookup_url(mut self, url: impl Into<String>) -> Self {
        self.ip_lookup_url = url.into();
        self
    }

    /// Sets the cache time-to-live
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Sets the backoff step between retries
    pub fn with_backoff_step(mut self, step: Duration) -> Self {
        self.backoff_step = step;
        self
    }

    /// Retry policy for ratings fetches and submissions
    pub fn ratings_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.fetch_retries,
            timeout: self.request_timeout,
            backoff_step: self.backoff_step,
        }
    }

    /// Retry policy for the best-effort IP lookup
    pub fn ip_lookup_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.ip_lookup_retries,
            timeout: self.request_timeout,
            backoff_step: self.backoff_step,
        }
    }

    /// Loads configuration from defaults and an optional config file
    ///
    /// An explicit `path` must exist. Without one, the default location is
    /// used only if a file is present there.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => Some(ConfigFile::read(path)?),
            None => match ConfigFile::default_path().filter(|p| p.exists()) {
                Some(default_path) => Some(ConfigFile::read(&default_path)?),
                None => None,
            },
        };

        Ok(file
            .map(|f| f.apply(Self::default()))
            .unwrap_or_default())
    }
}

/// Options accepted by [`RatingClient::configure`](crate::ratings::RatingClient::configure)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfigureOptions {
    /// New cache time-to-live; `None` or zero leaves it unchanged
    pub cache_duration: Option<Duration>,
}

/// On-disk configuration; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ConfigFile {
    pub endpoint: Option<String>,
    pub ip_lookup_url: Option<String>,
    pub cache_ttl_secs: Option<u64>,
    pub sweep_interval_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub fetch_retries: Option<u32>,
    pub ip_lookup_retries: Option<u32>,
    pub backoff_step_ms: Option<u64>,
}

impl ConfigFile {
    /// XDG-compliant config file location
    ///
    /// Uses `~/.config/course-ratings/config.json` on Linux. Returns `None`
    /// if no home directory can be determined.
    pub fn default_path() -> Option<PathBuf> {
        let project_dirs = ProjectDirs::from("", "", "course-ratings")?;
        Some(project_dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Reads and parses a config file
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overlays the fields present in this file onto `config`
    pub fn apply(self, mut config: ClientConfig) -> ClientConfig {
        if let Some(endpoint) = self.endpoint {
            config.endpoint = endpoint;
        }
        if let Some(url) = self.ip_lookup_url {
            config.ip_lookup_url = url;
        }
        if let Some(ttl) = non_zero_secs("cache_ttl_secs", self.cache_ttl_secs) {
            config.cache_ttl = ttl;
        }
        if let Some(interval) = non_zero_secs("sweep_interval_secs", self.sweep_interval_secs) {
            config.sweep_interval = interval;
        }
        if let Some(timeout) = non_zero_secs("request_timeout_secs", self.request_timeout_secs) {
            config.request_timeout = timeout;
        }
        if let Some(retries) = self.fetch_retries {
            config.fetch_retries = retries;
        }
        if let Some(retries) = self.ip_lookup_retries {
            config.ip_lookup_retries = retries;
        }
        if let Some(ms) = self.backoff_step_ms {
            config.backoff_step = Duration::from_millis(ms);
        }
        config
    }
}

/// Converts a seconds field to a duration, ignoring zero
///
/// A zero TTL, sweep interval, or timeout is never usable, so the default
/// stays in effect.
pub(crate) fn non_zero_secs(field: &str, secs: Option<u64>) -> Option<Duration> {
    match secs {
        Some(0) => {
            warn!(field, "ignoring zero duration in configuration");
            None
        }
        other => other.map(Duration::from_secs),
    }
}
