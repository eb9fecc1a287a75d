//! Credential and token types exchanged with the auth API.

use serde::{Deserialize, Serialize};

/// Login form payload. Lives only for the duration of a login call.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self { email: email.into(), password: password.into() }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Response body of `POST /auth/login` and `POST /auth/refresh`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionToken {
    pub access_token: String,
    /// Lifetime in seconds, counted from the moment the token is stored.
    pub expires_in: u64,
}

/// Durable form of a [`SessionToken`]: the token plus its absolute expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthRecord {
    pub access_token: String,
    /// Unix epoch milliseconds.
    pub expires_at_ms: i64,
}

#[cfg(test)]
#[path = "token_test.rs"]
mod tests;
