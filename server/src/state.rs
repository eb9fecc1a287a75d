//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. The
//! server keeps no per-user state: the admin session lives entirely in the
//! browser's `access_token` cookie, so everything here is configuration and
//! pooled HTTP clients.

use std::sync::Arc;

use axum_extra::extract::cookie::CookieJar;
use reqwest::Url;
use reqwest::cookie::Jar;
use scores::{ScoresClient, ScoresError};
use session::{AuthError, GuardPolicy, MemoryStorage, Navigator, SessionService, TokenStore};

use crate::config::ServerConfig;

/// Lifetime given to a browser token replayed for a single upstream call.
const FORWARDED_TOKEN_TTL_SECS: u64 = 60;

/// Navigations are HTTP redirects issued by the handlers themselves.
struct RedirectByResponse;

impl Navigator for RedirectByResponse {
    fn current_location(&self) -> String {
        String::new()
    }

    fn navigate(&self, location: &str) {
        tracing::debug!(%location, "upstream session expired during request");
    }
}

/// Clone is required by Axum; all inner fields are cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub scores: ScoresClient,
    pub policy: Arc<GuardPolicy>,
}

impl AppState {
    /// # Errors
    ///
    /// Returns an error if the scoring HTTP client cannot be built.
    pub fn new(config: ServerConfig) -> Result<Self, ScoresError> {
        let scores = ScoresClient::from_config(&config.session)?;
        let policy = GuardPolicy::new(config.session.login_path.clone(), config.landing_path.clone());
        Ok(Self { config: Arc::new(config), scores, policy: Arc::new(policy) })
    }

    /// A throwaway session for one admin sign-in. Its store and jar die with
    /// it; the browser keeps the only copy of the token in its cookie.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn request_session(&self) -> Result<SessionService, AuthError> {
        self.session_with(Arc::new(Jar::default()))
    }

    /// A throwaway session standing in for the browser that sent `cookies`:
    /// it holds `token` as its bearer and replays the browser's cookies to
    /// the upstream API.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn browser_session(&self, cookies: &CookieJar, token: &str) -> Result<SessionService, AuthError> {
        let jar = Arc::new(Jar::default());
        match Url::parse(&self.config.session.api_url) {
            Ok(api_url) => {
                for cookie in cookies.iter() {
                    jar.add_cookie_str(&format!("{}={}", cookie.name(), cookie.value()), &api_url);
                }
            }
            Err(e) => tracing::warn!(error = %e, "browser cookies not forwarded"),
        }
        let session = self.session_with(jar)?;
        session.token_store().set_token(token, FORWARDED_TOKEN_TTL_SECS)?;
        Ok(session)
    }

    fn session_with(&self, jar: Arc<Jar>) -> Result<SessionService, AuthError> {
        let store = TokenStore::new(Arc::new(MemoryStorage::new()), jar, self.config.session.site_url.clone());
        SessionService::new(self.config.session.clone(), store, Arc::new(RedirectByResponse))
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use std::time::Duration;

    use session::SessionConfig;

    use super::*;

    /// State pointed at `api_url`, with an instant progress page.
    #[must_use]
    pub fn test_app_state(api_url: &str) -> AppState {
        let session = SessionConfig::new(api_url, "http://localhost:3000").expect("valid test urls");
        let mut config = ServerConfig::with_session(session);
        config.progress_delay = Duration::ZERO;
        AppState::new(config).expect("client builds")
    }
}
