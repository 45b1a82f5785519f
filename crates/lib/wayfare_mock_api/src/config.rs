//! Mock API configuration.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use tracing::warn;

/// Access token lifetime: 5 minutes.
pub const DEFAULT_ACCESS_TTL_SECS: i64 = 5 * 60;

/// Refresh tokens outlive their access token by one hour.
pub const DEFAULT_REFRESH_TTL_SECS: i64 = 60 * 60;

/// Chance that a search answers 429.
pub const DEFAULT_RATE_LIMIT_PROBABILITY: f64 = 0.01;

/// Whether `/auth/refresh` issues a new refresh token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RotationPolicy {
    /// Always rotate; the presented token is revoked.
    Always,
    /// Never rotate; the presented token stays valid.
    Never,
    /// Rotate on roughly half of the refreshes.
    #[default]
    Random,
}

impl RotationPolicy {
    /// Decide for one refresh.
    pub fn should_rotate(self) -> bool {
        match self {
            RotationPolicy::Always => true,
            RotationPolicy::Never => false,
            RotationPolicy::Random => rand::rng().random_bool(0.5),
        }
    }
}

impl FromStr for RotationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "always" => Ok(RotationPolicy::Always),
            "never" => Ok(RotationPolicy::Never),
            "random" => Ok(RotationPolicy::Random),
            other => Err(format!("unknown rotation policy: {other} (expected always|never|random)")),
        }
    }
}

impl fmt::Display for RotationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RotationPolicy::Always => "always",
            RotationPolicy::Never => "never",
            RotationPolicy::Random => "random",
        })
    }
}

/// Configuration for the mock API.
#[derive(Clone, Debug)]
pub struct MockApiConfig {
    /// HS256 signing secret for access tokens.
    pub jwt_secret: String,
    /// Access token lifetime in seconds.
    pub access_ttl_secs: i64,
    /// Refresh token lifetime in seconds, counted from the access token's expiry.
    pub refresh_ttl_secs: i64,
    pub rotation: RotationPolicy,
    /// Probability in `[0, 1]` that a search is rate limited.
    pub rate_limit_probability: f64,
}

impl Default for MockApiConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "dev-secret".into(),
            access_ttl_secs: DEFAULT_ACCESS_TTL_SECS,
            refresh_ttl_secs: DEFAULT_REFRESH_TTL_SECS,
            rotation: RotationPolicy::default(),
            rate_limit_probability: DEFAULT_RATE_LIMIT_PROBABILITY,
        }
    }
}

impl MockApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                     | Default      |
    /// |------------------------------|--------------|
    /// | `JWT_SECRET`                 | `dev-secret` |
    /// | `MOCK_ACCESS_TTL_SECS`       | `300`        |
    /// | `MOCK_REFRESH_TTL_SECS`      | `3600`       |
    /// | `MOCK_ROTATION`              | `random`     |
    /// | `MOCK_RATE_LIMIT`            | `0.01`       |
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            jwt_secret: std::env::var("JWT_SECRET")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.jwt_secret),
            access_ttl_secs: env_parse("MOCK_ACCESS_TTL_SECS").unwrap_or(defaults.access_ttl_secs),
            refresh_ttl_secs: env_parse("MOCK_REFRESH_TTL_SECS")
                .unwrap_or(defaults.refresh_ttl_secs),
            rotation: env_parse("MOCK_ROTATION").unwrap_or(defaults.rotation),
            rate_limit_probability: env_parse::<f64>("MOCK_RATE_LIMIT")
                .map(|p| p.clamp(0.0, 1.0))
                .unwrap_or(defaults.rate_limit_probability),
        }
    }

    /// Deterministic settings for tests: no rate limiting, always rotate.
    pub fn for_tests() -> Self {
        Self {
            jwt_secret: "test-secret".into(),
            rotation: RotationPolicy::Always,
            rate_limit_probability: 0.0,
            ..Self::default()
        }
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(variable = name, value = %raw, "ignoring unparseable setting");
            None
        }
    }
}
