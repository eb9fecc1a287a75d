//! Token Store: sole owner of the persisted auth record.
//!
//! DESIGN
//! ======
//! Two copies of the token exist: the durable record (for the client itself)
//! and the `access_token` cookie (the only thing the route guard can see).
//! Every write and every clear touches both, in that order, so the client
//! and the guard never disagree about whether a session exists.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use cookie::{Cookie, SameSite};
use reqwest::Url;
use reqwest::cookie::{CookieStore, Jar};
use time::{Duration, OffsetDateTime};

use crate::error::StorageError;
use crate::guard::ACCESS_TOKEN_COOKIE;
use crate::storage::TokenStorage;
use crate::token::AuthRecord;

// =============================================================================
// CLOCK
// =============================================================================

/// Wall-clock source, injectable so expiry boundaries can be tested.
pub trait Clock: Send + Sync {
    /// Current Unix time in milliseconds.
    fn now_ms(&self) -> i64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        let Ok(duration) = SystemTime::now().duration_since(UNIX_EPOCH) else {
            return 0;
        };
        i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
    }
}

// =============================================================================
// COOKIES
// =============================================================================

/// `access_token` cookie mirroring a freshly stored token.
#[must_use]
pub fn access_cookie(token: &str, max_age_secs: u64, secure: bool) -> Cookie<'static> {
    let max_age = Duration::seconds(i64::try_from(max_age_secs).unwrap_or(i64::MAX));
    Cookie::build((ACCESS_TOKEN_COOKIE, token.to_owned()))
        .path("/")
        .max_age(max_age)
        .same_site(SameSite::Strict)
        .secure(secure)
        .build()
}

/// Deletion cookie. Path and `SameSite` must match [`access_cookie`] or
/// user agents keep the original.
#[must_use]
pub fn expired_access_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((ACCESS_TOKEN_COOKIE, ""))
        .path("/")
        .max_age(Duration::ZERO)
        .expires(OffsetDateTime::UNIX_EPOCH)
        .same_site(SameSite::Strict)
        .secure(secure)
        .build()
}

// =============================================================================
// TOKEN STORE
// =============================================================================

#[derive(Clone)]
pub struct TokenStore {
    storage: Arc<dyn TokenStorage>,
    jar: Arc<Jar>,
    site_url: Url,
    clock: Arc<dyn Clock>,
}

impl TokenStore {
    /// `site_url` is the origin the cookie mirror is scoped to; its scheme
    /// decides whether the cookie is marked `Secure`.
    #[must_use]
    pub fn new(storage: Arc<dyn TokenStorage>, jar: Arc<Jar>, site_url: Url) -> Self {
        Self { storage, jar, site_url, clock: Arc::new(SystemClock) }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Cookie jar shared with every HTTP client of this session.
    #[must_use]
    pub fn jar(&self) -> Arc<Jar> {
        Arc::clone(&self.jar)
    }

    #[must_use]
    pub fn site_url(&self) -> &Url {
        &self.site_url
    }

    #[must_use]
    pub fn secure(&self) -> bool {
        self.site_url.scheme() == "https"
    }

    /// Store `token` until `now + expires_in_secs` and mirror it as a cookie.
    ///
    /// # Errors
    ///
    /// Returns an error if the durable write fails; the cookie is then left
    /// untouched.
    pub fn set_token(&self, token: &str, expires_in_secs: u64) -> Result<(), StorageError> {
        let lifetime_ms = i64::try_from(expires_in_secs)
            .unwrap_or(i64::MAX)
            .saturating_mul(1000);
        let record = AuthRecord {
            access_token: token.to_owned(),
            expires_at_ms: self.clock.now_ms().saturating_add(lifetime_ms),
        };
        self.storage.save(&record)?;

        let cookie = access_cookie(token, expires_in_secs, self.secure());
        self.jar.add_cookie_str(&cookie.to_string(), &self.site_url);
        Ok(())
    }

    #[must_use]
    pub fn get_token(&self) -> Option<String> {
        self.load().map(|record| record.access_token)
    }

    /// True when no expiry is recorded or the expiry instant has been reached.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        match self.load() {
            Some(record) => self.clock.now_ms() >= record.expires_at_ms,
            None => true,
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.get_token().is_some() && !self.is_expired()
    }

    /// Remove the durable record and expire the cookie mirror.
    pub fn clear(&self) {
        if let Err(e) = self.storage.remove() {
            tracing::warn!(error = %e, "failed to remove stored auth record");
        }
        let cookie = expired_access_cookie(self.secure());
        self.jar.add_cookie_str(&cookie.to_string(), &self.site_url);
    }

    /// Value of the `access_token` cookie the jar would send to the site.
    #[must_use]
    pub fn cookie_value(&self) -> Option<String> {
        let header = self.jar.cookies(&self.site_url)?;
        let header = header.to_str().ok()?;
        Cookie::split_parse(header)
            .filter_map(Result::ok)
            .find(|c| c.name() == ACCESS_TOKEN_COOKIE)
            .map(|c| c.value().to_owned())
    }

    fn load(&self) -> Option<AuthRecord> {
        match self.storage.load() {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(error = %e, "unreadable auth record treated as signed out");
                None
            }
        }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "token_store_test.rs"]
mod tests;
