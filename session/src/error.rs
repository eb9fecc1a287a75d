//! Session error taxonomy.
//!
//! ERROR HANDLING
//! ==============
//! `AuthError` is `Clone` because one refresh outcome is handed to every
//! caller waiting on the shared in-flight refresh. Transport errors from the
//! authenticated-request wrapper are passed through untouched in
//! [`RequestError::Transport`].

/// Default message when the login endpoint rejects without a body.
pub const DEFAULT_LOGIN_ERROR: &str = "login failed";

/// Failures of the login/refresh/logout flow.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The auth API refused the credentials; carries the server's error text.
    #[error("{0}")]
    Rejected(String),

    /// Refresh failed; local session state has already been cleared.
    #[error("session expired")]
    SessionExpired,

    /// The auth API could not be reached.
    #[error("auth request failed: {0}")]
    Network(String),

    /// The auth API answered with a body that is not a session token.
    #[error("auth response parse failed: {0}")]
    Decode(String),

    /// The durable token record could not be written.
    #[error("token storage failed: {0}")]
    Storage(String),
}

impl AuthError {
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Rejected(_) => "E_AUTH_REJECTED",
            Self::SessionExpired => "E_SESSION_EXPIRED",
            Self::Network(_) => "E_AUTH_NETWORK",
            Self::Decode(_) => "E_AUTH_DECODE",
            Self::Storage(_) => "E_TOKEN_STORAGE",
        }
    }

    /// Text suitable for a login-form error message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected(text) => text.clone(),
            Self::SessionExpired => "Your session has expired, please sign in again.".to_owned(),
            Self::Network(_) | Self::Decode(_) | Self::Storage(_) => {
                "Sign-in is unavailable right now, please try again.".to_owned()
            }
        }
    }
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err.to_string())
    }
}

/// Failures of [`crate::SessionService::authenticated_request`].
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// The pre-flight (or post-401) refresh failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The request itself failed; surfaced unmodified.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// Failures of a durable [`crate::TokenStorage`] backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt auth record: {0}")]
    Corrupt(#[from] serde_json::Error),
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
