use std::time::Duration;

use verity_core::config::{parse_or, ConfigError, SessionConfig, VerificationConfig};

use crate::background::token_sweep::DEFAULT_SWEEP_INTERVAL;

/// Server configuration loaded from environment variables.
///
/// All fields except the session secret have defaults suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8080`).
    pub port: u16,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Interval between expired-token sweeps.
    pub sweep_interval: Duration,
    /// PostgreSQL URL. `None` runs on the in-memory store.
    pub database_url: Option<String>,
    pub verification: VerificationConfig,
    pub session: SessionConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default   |
    /// |-----------------------------|-----------|
    /// | `HOST`                      | `0.0.0.0` |
    /// | `PORT`                      | `8080`    |
    /// | `REQUEST_TIMEOUT_SECS`      | `30`      |
    /// | `TOKEN_SWEEP_INTERVAL_SECS` | `3600`    |
    /// | `DATABASE_URL`              | --        |
    ///
    /// Verification and session settings are read by
    /// [`VerificationConfig::from_env`] and [`SessionConfig::from_env`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = parse_or(&lookup, "PORT", 8080)?;
        let request_timeout_secs: u64 = parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 30)?;
        let sweep_secs: u64 = parse_or(
            &lookup,
            "TOKEN_SWEEP_INTERVAL_SECS",
            DEFAULT_SWEEP_INTERVAL.as_secs(),
        )?;
        if sweep_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "TOKEN_SWEEP_INTERVAL_SECS",
                value: "0".into(),
            });
        }

        Ok(Self {
            host,
            port,
            request_timeout_secs,
            sweep_interval: Duration::from_secs(sweep_secs),
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            verification: VerificationConfig::from_lookup(&lookup)?,
            session: SessionConfig::from_lookup(&lookup)?,
        })
    }
}
