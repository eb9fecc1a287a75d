//! Server configuration parsed from environment variables.

use std::time::Duration;

use session::guard::DEFAULT_LANDING_PATH;
use session::{ConfigError, SessionConfig};

pub const DEFAULT_PORT: u16 = 3000;
/// How long the analysis progress page stays up before the score shows.
pub const DEFAULT_PROGRESS_DELAY_SECS: u64 = 6;

#[derive(Debug, thiserror::Error)]
pub enum ServerConfigError {
    #[error(transparent)]
    Session(#[from] ConfigError),

    #[error("invalid PORT: {0}")]
    InvalidPort(String),
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Mark the `access_token` cookie `Secure`.
    pub cookie_secure: bool,
    /// Where a signed-in admin lands by default.
    pub landing_path: String,
    pub progress_delay: Duration,
    /// Upstream API, login path and HTTP timeouts.
    pub session: SessionConfig,
}

impl ServerConfig {
    /// Build config from environment variables.
    ///
    /// Optional:
    /// - `PORT`: default 3000
    /// - `COOKIE_SECURE`: default follows the `SITE_URL` scheme
    /// - `LANDING_PATH`: default `/admin/dashboard`
    /// - `PROGRESS_DELAY_SECS`: default 6
    /// - everything [`SessionConfig::from_env`] reads
    ///
    /// # Errors
    ///
    /// Returns an error if `PORT` is not a port number or a URL is invalid.
    pub fn from_env() -> Result<Self, ServerConfigError> {
        let port = match std::env::var("PORT") {
            Ok(raw) => raw.trim().parse().map_err(|_| ServerConfigError::InvalidPort(raw))?,
            Err(_) => DEFAULT_PORT,
        };
        let session = SessionConfig::from_env()?;
        let cookie_secure = env_bool("COOKIE_SECURE").unwrap_or(session.site_url.scheme() == "https");
        Ok(Self {
            port,
            cookie_secure,
            landing_path: std::env::var("LANDING_PATH").unwrap_or_else(|_| DEFAULT_LANDING_PATH.to_owned()),
            progress_delay: Duration::from_secs(env_parse("PROGRESS_DELAY_SECS", DEFAULT_PROGRESS_DELAY_SECS)),
            session,
        })
    }

    /// Defaults around an explicit session config.
    #[must_use]
    pub fn with_session(session: SessionConfig) -> Self {
        Self {
            port: DEFAULT_PORT,
            cookie_secure: session.site_url.scheme() == "https",
            landing_path: DEFAULT_LANDING_PATH.to_owned(),
            progress_delay: Duration::from_secs(DEFAULT_PROGRESS_DELAY_SECS),
            session,
        }
    }
}

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
