//! Scoring error taxonomy.
//!
//! ERROR HANDLING
//! ==============
//! Validation failures never reach the network. Everything else is a
//! `ScoresError`, which front-ends turn into a non-crashing error state via
//! [`ScoresError::user_message`] and [`ScoresError::retryable`].

use session::{AuthError, RequestError};

/// A form field that failed its schema check.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: &'static str,
}

impl ValidationError {
    #[must_use]
    pub const fn new(field: &'static str, message: &'static str) -> Self {
        Self { field, message }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScoresError {
    /// The scoring API could not be reached.
    #[error("scoring API request failed: {0}")]
    Network(String),

    /// Non-success status other than 401/404.
    #[error("scoring API returned HTTP {status}")]
    Status { status: u16 },

    /// The requested score id does not exist.
    #[error("score not found")]
    NotFound,

    /// The API refused the bearer token.
    #[error("not authorized")]
    Unauthorized,

    /// Session refresh failed or login was rejected.
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("scoring API response parse failed: {0}")]
    Decode(String),

    /// Superseded by a newer load or cancelled by the caller.
    #[error("request cancelled")]
    Cancelled,

    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl ScoresError {
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Network(_) => "E_NETWORK",
            Self::Status { .. } => "E_HTTP_STATUS",
            Self::NotFound => "E_NOT_FOUND",
            Self::Unauthorized => "E_UNAUTHORIZED",
            Self::Auth(e) => e.error_code(),
            Self::Decode(_) => "E_DECODE",
            Self::Cancelled => "E_CANCELLED",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT",
        }
    }

    /// Generic text for the user; the detail belongs in the logs.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound => "The requested score was not found.".to_owned(),
            Self::Unauthorized => "Please sign in to continue.".to_owned(),
            Self::Auth(e) => e.user_message(),
            Self::Cancelled => "The request was cancelled.".to_owned(),
            Self::Network(_) | Self::Status { .. } | Self::Decode(_) | Self::HttpClientBuild(_) => {
                "Something went wrong, please try again.".to_owned()
            }
        }
    }

    /// Whether a user-triggered retry can reasonably succeed.
    #[must_use]
    pub fn retryable(&self) -> bool {
        !matches!(self, Self::Unauthorized | Self::Auth(_) | Self::HttpClientBuild(_))
    }
}

impl From<RequestError> for ScoresError {
    fn from(err: RequestError) -> Self {
        match err {
            RequestError::Auth(e) => Self::Auth(e),
            RequestError::Transport(e) => Self::Network(e.to_string()),
        }
    }
}

impl From<reqwest::Error> for ScoresError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
