//! Lifecycle configuration.
//!
//! Expiry windows and signing material are passed into the services as
//! explicit structs. `from_env` reads the process environment; `from_lookup`
//! takes any key lookup so parsing can be tested without touching global state.

use std::fmt;
use std::str::FromStr;

use chrono::Duration;

/// Default link-token lifetime in hours.
pub const DEFAULT_LINK_EXPIRY_HOURS: i64 = 24;
/// Default code-token lifetime in minutes.
pub const DEFAULT_CODE_EXPIRY_MINUTES: i64 = 10;
/// Default session-token lifetime in minutes.
pub const DEFAULT_SESSION_EXPIRY_MINS: i64 = 60;
/// Default public base URL used to build verification links.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Errors raised while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has invalid value {value:?}")]
    Invalid { var: &'static str, value: String },
}

// ---------------------------------------------------------------------------
// VerificationConfig
// ---------------------------------------------------------------------------

/// Expiry windows for verification artifacts.
#[derive(Debug, Clone)]
pub struct VerificationConfig {
    pub link_expiry: Duration,
    pub code_expiry: Duration,
    /// Public origin that serves `/api/auth/verify`.
    pub base_url: String,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            link_expiry: Duration::hours(DEFAULT_LINK_EXPIRY_HOURS),
            code_expiry: Duration::minutes(DEFAULT_CODE_EXPIRY_MINUTES),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl VerificationConfig {
    /// Load from environment variables.
    ///
    /// | Env Var                            | Default                 |
    /// |------------------------------------|-------------------------|
    /// | `VERIFICATION_LINK_EXPIRY_HOURS`   | `24`                    |
    /// | `VERIFICATION_CODE_EXPIRY_MINUTES` | `10`                    |
    /// | `VERIFICATION_BASE_URL`            | `http://localhost:8080` |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let link_hours: i64 = parse_or(
            &lookup,
            "VERIFICATION_LINK_EXPIRY_HOURS",
            DEFAULT_LINK_EXPIRY_HOURS,
        )?;
        let code_minutes: i64 = parse_or(
            &lookup,
            "VERIFICATION_CODE_EXPIRY_MINUTES",
            DEFAULT_CODE_EXPIRY_MINUTES,
        )?;
        let base_url = lookup("VERIFICATION_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            link_expiry: positive_duration(
                "VERIFICATION_LINK_EXPIRY_HOURS",
                link_hours,
                Duration::hours,
            )?,
            code_expiry: positive_duration(
                "VERIFICATION_CODE_EXPIRY_MINUTES",
                code_minutes,
                Duration::minutes,
            )?,
            base_url,
        })
    }

    /// The URL a user follows to redeem a link token.
    pub fn verification_url(&self, token_id: &str) -> String {
        format!("{}/api/auth/verify?token={token_id}", self.base_url)
    }
}

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Signing material and lifetime for session tokens.
#[derive(Clone)]
pub struct SessionConfig {
    /// HMAC-SHA256 secret used to sign and verify tokens.
    pub secret: String,
    pub lifetime: Duration,
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("secret", &"<redacted>")
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

impl SessionConfig {
    /// Config with the given secret and the default one-hour lifetime.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            lifetime: Duration::minutes(DEFAULT_SESSION_EXPIRY_MINS),
        }
    }

    /// Load from environment variables.
    ///
    /// | Env Var           | Required | Default |
    /// |-------------------|----------|---------|
    /// | `JWT_SECRET`      | **yes**  | --      |
    /// | `JWT_EXPIRY_MINS` | no       | `60`    |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;
        let minutes: i64 = parse_or(&lookup, "JWT_EXPIRY_MINS", DEFAULT_SESSION_EXPIRY_MINS)?;

        Ok(Self {
            secret,
            lifetime: positive_duration("JWT_EXPIRY_MINS", minutes, Duration::minutes)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse `var` if present, otherwise fall back to `default`.
pub fn parse_or<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value: raw }),
        None => Ok(default),
    }
}

fn positive_duration(
    var: &'static str,
    amount: i64,
    unit: fn(i64) -> Duration,
) -> Result<Duration, ConfigError> {
    if amount <= 0 {
        return Err(ConfigError::Invalid {
            var,
            value: amount.to_string(),
        });
    }
    Ok(unit(amount))
}
