//! Session layer configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

/// Default API base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:3001";

/// Refresh proactively when the access token expires within this window.
pub const DEFAULT_REFRESH_HORIZON: Duration = Duration::from_secs(30);

/// A token this close to expiry no longer counts as authenticated.
pub const DEFAULT_AUTH_SAFETY_MARGIN: Duration = Duration::from_secs(5);

/// Quiet period before a search query fires.
pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for a [`SessionContext`](crate::SessionContext).
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Base URL of the API (e.g. "http://localhost:3001").
    pub api_base_url: String,
    /// Proactive refresh window before access token expiry.
    pub refresh_horizon: Duration,
    /// Safety margin applied by the authenticated check.
    pub auth_safety_margin: Duration,
    /// Debounce delay for search queries.
    pub search_debounce: Duration,
    /// Per-request timeout for the HTTP transport.
    pub request_timeout: Duration,
    /// File backing the persisted session. `None` uses [`default_storage_path`].
    pub storage_path: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            refresh_horizon: DEFAULT_REFRESH_HORIZON,
            auth_safety_margin: DEFAULT_AUTH_SAFETY_MARGIN,
            search_debounce: DEFAULT_SEARCH_DEBOUNCE,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            storage_path: None,
        }
    }
}

impl SessionConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                       | Default                            |
    /// |--------------------------------|------------------------------------|
    /// | `WAYFARE_API_URL`              | `http://localhost:3001`            |
    /// | `WAYFARE_REFRESH_HORIZON_SECS` | `30`                               |
    /// | `WAYFARE_AUTH_MARGIN_SECS`     | `5`                                |
    /// | `WAYFARE_SEARCH_DEBOUNCE_MS`   | `300`                              |
    /// | `WAYFARE_REQUEST_TIMEOUT_SECS` | `30`                               |
    /// | `WAYFARE_STORAGE_PATH`         | `<data dir>/wayfare/session.json`  |
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_base_url: std::env::var("WAYFARE_API_URL").unwrap_or(defaults.api_base_url),
            refresh_horizon: env_parse::<u64>("WAYFARE_REFRESH_HORIZON_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.refresh_horizon),
            auth_safety_margin: env_parse::<u64>("WAYFARE_AUTH_MARGIN_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.auth_safety_margin),
            search_debounce: env_parse::<u64>("WAYFARE_SEARCH_DEBOUNCE_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.search_debounce),
            request_timeout: env_parse::<u64>("WAYFARE_REQUEST_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            storage_path: std::env::var_os("WAYFARE_STORAGE_PATH").map(PathBuf::from),
        }
    }

    /// Storage path to use, falling back to the platform data directory.
    pub fn resolved_storage_path(&self) -> PathBuf {
        self.storage_path.clone().unwrap_or_else(default_storage_path)
    }
}

/// `<data dir>/wayfare/session.json`, or `./wayfare/session.json` when the
/// platform has no data directory.
pub fn default_storage_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("wayfare")
        .join("session.json")
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(variable = name, value = %raw, "ignoring unparseable setting");
            None
        }
    }
}
