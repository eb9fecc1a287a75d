//! Session configuration parsed from environment variables.

use std::time::Duration;

use reqwest::Url;

use crate::guard::DEFAULT_LOGIN_PATH;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8080";
pub const DEFAULT_SITE_URL: &str = "http://127.0.0.1:3000";
/// 8 minutes, for the auth API's 10-minute tokens.
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 480;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL in {var}: {value}")]
    InvalidUrl { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Base URL of the remote auth + scoring API, without trailing slash.
    pub api_url: String,
    /// Origin of the front-end; the cookie mirror is scoped to it.
    pub site_url: Url,
    /// Path of the login page used in session-expired redirects.
    pub login_path: String,
    /// Period of the background refresh while authenticated.
    pub refresh_interval: Duration,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl SessionConfig {
    /// Build config from environment variables.
    ///
    /// Optional:
    /// - `API_URL`: default `http://127.0.0.1:8080`
    /// - `SITE_URL`: default `http://127.0.0.1:3000`
    /// - `LOGIN_PATH`: default `/admin`
    /// - `AUTH_REFRESH_INTERVAL_SECS`: default 480
    /// - `HTTP_REQUEST_TIMEOUT_SECS`: default 30
    /// - `HTTP_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns an error if `SITE_URL` or `API_URL` is not an absolute URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_url = std::env::var("API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_owned());
        let site_url = std::env::var("SITE_URL").unwrap_or_else(|_| DEFAULT_SITE_URL.to_owned());
        let mut config = Self::new(&api_url, &site_url)?;
        if let Ok(login_path) = std::env::var("LOGIN_PATH") {
            config.login_path = login_path;
        }
        config.refresh_interval =
            Duration::from_secs(env_parse("AUTH_REFRESH_INTERVAL_SECS", DEFAULT_REFRESH_INTERVAL_SECS));
        config.request_timeout = Duration::from_secs(env_parse("HTTP_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS));
        config.connect_timeout = Duration::from_secs(env_parse("HTTP_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS));
        Ok(config)
    }

    /// Config with defaults for everything but the two URLs.
    ///
    /// # Errors
    ///
    /// Returns an error if either URL does not parse.
    pub fn new(api_url: &str, site_url: &str) -> Result<Self, ConfigError> {
        Url::parse(api_url).map_err(|_| ConfigError::InvalidUrl { var: "API_URL", value: api_url.to_owned() })?;
        let site_url =
            Url::parse(site_url).map_err(|_| ConfigError::InvalidUrl { var: "SITE_URL", value: site_url.to_owned() })?;
        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_owned(),
            site_url,
            login_path: DEFAULT_LOGIN_PATH.to_owned(),
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_INTERVAL_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        })
    }

    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.api_url)
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
