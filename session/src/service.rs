//! Session Service: login, refresh, logout, authenticated requests.
//!
//! DESIGN
//! ======
//! Every HTTP call goes through one `reqwest::Client` sharing the Token
//! Store's cookie jar, so the auth API's own session cookie (the refresh
//! credential) rides along exactly like a credentialed browser fetch.
//!
//! Refresh is single-flight: concurrent callers (a background timer and a
//! request-triggered refresh, say) await one shared in-flight future and all
//! receive its outcome. The future owns clones of the pieces it needs, never
//! the service itself, so a pending refresh cannot keep the service alive.
//!
//! `authenticated_request` is a two-phase operation: `Fresh` may refresh
//! once (pre-flight when the token is expired, or after a 401), `Refreshed`
//! never refreshes again.

use std::sync::{Arc, Mutex, PoisonError};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use reqwest::{Method, Response, StatusCode};
use tokio::sync::broadcast;

use crate::config::SessionConfig;
use crate::error::{AuthError, DEFAULT_LOGIN_ERROR, RequestError};
use crate::guard::{DEFAULT_LANDING_PATH, GuardPolicy};
use crate::token::{Credentials, SessionToken};
use crate::token_store::TokenStore;

pub const LOGIN_ENDPOINT: &str = "/auth/login";
pub const REFRESH_ENDPOINT: &str = "/auth/refresh";
pub const LOGOUT_ENDPOINT: &str = "/auth/logout";

const EVENT_CAPACITY: usize = 32;

// =============================================================================
// NAVIGATION + EVENTS
// =============================================================================

/// Where the client "is" and how it moves, for session-expired redirects.
pub trait Navigator: Send + Sync {
    /// Current location as path plus query, e.g. `/admin/dashboard?tab=2`.
    fn current_location(&self) -> String;

    /// Move to `location` (a path with query).
    fn navigate(&self, location: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignOutReason {
    /// Explicit logout.
    SignedOut,
    /// Refresh failed.
    Expired,
}

/// Outcome notifications, consumed by [`crate::AuthContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn,
    Refreshed,
    SignedOut(SignOutReason),
}

// =============================================================================
// SERVICE
// =============================================================================

type SharedRefresh = Shared<BoxFuture<'static, Result<SessionToken, AuthError>>>;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Phase {
    Fresh,
    Refreshed,
}

#[derive(Clone)]
pub struct SessionService {
    inner: Arc<Inner>,
}

struct Inner {
    config: SessionConfig,
    http: reqwest::Client,
    store: TokenStore,
    navigator: Arc<dyn Navigator>,
    policy: GuardPolicy,
    events: broadcast::Sender<SessionEvent>,
    inflight: Mutex<Option<SharedRefresh>>,
}

impl SessionService {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: SessionConfig, store: TokenStore, navigator: Arc<dyn Navigator>) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .cookie_provider(store.jar())
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| AuthError::Network(e.to_string()))?;
        let policy = GuardPolicy::new(config.login_path.clone(), DEFAULT_LANDING_PATH);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            inner: Arc::new(Inner { config, http, store, navigator, policy, events, inflight: Mutex::new(None) }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn token_store(&self) -> &TokenStore {
        &self.inner.store
    }

    /// Credentialed HTTP client (shares the session cookie jar).
    #[must_use]
    pub fn http(&self) -> &reqwest::Client {
        &self.inner.http
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.store.is_authenticated()
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Login location that returns to `current` after sign-in.
    #[must_use]
    pub fn login_location(&self, current: &str) -> String {
        self.inner.policy.login_location(current)
    }

    /// `POST /auth/login`; stores the returned token on success.
    ///
    /// # Errors
    ///
    /// `Rejected` with the server's text on a non-success status, `Network`
    /// or `Decode` on transport/body failures, `Storage` if the token cannot
    /// be persisted.
    pub async fn login(&self, credentials: &Credentials) -> Result<SessionToken, AuthError> {
        let response = self
            .inner
            .http
            .post(self.inner.config.endpoint(LOGIN_ENDPOINT))
            .json(credentials)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), email = %credentials.email, "login rejected");
            let message = if body.trim().is_empty() { DEFAULT_LOGIN_ERROR.to_owned() } else { body };
            return Err(AuthError::Rejected(message));
        }

        let token: SessionToken = response
            .json()
            .await
            .map_err(|e| AuthError::Decode(e.to_string()))?;
        self.inner
            .store
            .set_token(&token.access_token, token.expires_in)?;
        emit(&self.inner.events, SessionEvent::SignedIn);
        tracing::info!(email = %credentials.email, expires_in = token.expires_in, "signed in");
        Ok(token)
    }

    /// `POST /auth/refresh`, shared by all concurrent callers.
    ///
    /// # Errors
    ///
    /// Always `SessionExpired` on failure, after local state has been cleared.
    pub async fn refresh(&self) -> Result<SessionToken, AuthError> {
        let pending = {
            let mut slot = self
                .inner
                .inflight
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(pending) = slot.as_ref() {
                pending.clone()
            } else {
                let call = RefreshCall {
                    http: self.inner.http.clone(),
                    url: self.inner.config.endpoint(REFRESH_ENDPOINT),
                    store: self.inner.store.clone(),
                    events: self.inner.events.clone(),
                };
                let pending = call.run().boxed().shared();
                *slot = Some(pending.clone());
                pending
            }
        };

        let outcome = pending.clone().await;

        let mut slot = self
            .inner
            .inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|current| current.ptr_eq(&pending)) {
            *slot = None;
        }
        outcome
    }

    /// Clear local state, then tell the server, identified by the token held
    /// before clearing and the jar's cookies. The server call is best-effort:
    /// its failure is logged and never surfaces.
    pub async fn logout(&self) {
        let token = self.inner.store.get_token();
        self.inner.store.clear();
        emit(&self.inner.events, SessionEvent::SignedOut(SignOutReason::SignedOut));

        let mut request = self.inner.http.post(self.inner.config.endpoint(LOGOUT_ENDPOINT));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        match request.send().await {
            Ok(response) if !response.status().is_success() => {
                tracing::warn!(status = response.status().as_u16(), "server logout rejected");
            }
            Ok(_) => tracing::info!("signed out"),
            Err(e) => tracing::warn!(error = %e, "server logout failed"),
        }
    }

    /// Send `method url` with the current token as a bearer credential.
    ///
    /// An expired token is refreshed before sending; a 401 answered to a
    /// live token triggers one refresh and one resend. At most one refresh
    /// happens per call. Whatever the final response is, it is returned
    /// unmodified.
    ///
    /// # Errors
    ///
    /// `Auth(SessionExpired)` when the refresh fails (the navigator has
    /// already been sent to the login page), `Transport` when the request
    /// itself fails.
    pub async fn authenticated_request(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Response, RequestError> {
        let store = &self.inner.store;
        let mut phase = Phase::Fresh;
        let mut token = store.get_token();

        if token.is_some() && store.is_expired() {
            token = Some(self.refresh_or_redirect().await?.access_token);
            phase = Phase::Refreshed;
        }

        loop {
            let response = self.send(method.clone(), url, body, token.as_deref()).await?;
            if response.status() == StatusCode::UNAUTHORIZED && token.is_some() && phase == Phase::Fresh {
                tracing::debug!(%url, "token refused, refreshing once");
                token = Some(self.refresh_or_redirect().await?.access_token);
                phase = Phase::Refreshed;
                continue;
            }
            return Ok(response);
        }
    }

    /// # Errors
    ///
    /// See [`Self::authenticated_request`].
    pub async fn get(&self, url: &str) -> Result<Response, RequestError> {
        self.authenticated_request(Method::GET, url, None).await
    }

    /// # Errors
    ///
    /// See [`Self::authenticated_request`].
    pub async fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<Response, RequestError> {
        self.authenticated_request(Method::POST, url, Some(body)).await
    }

    /// # Errors
    ///
    /// See [`Self::authenticated_request`].
    pub async fn put_json(&self, url: &str, body: &serde_json::Value) -> Result<Response, RequestError> {
        self.authenticated_request(Method::PUT, url, Some(body)).await
    }

    /// # Errors
    ///
    /// See [`Self::authenticated_request`].
    pub async fn delete(&self, url: &str) -> Result<Response, RequestError> {
        self.authenticated_request(Method::DELETE, url, None).await
    }

    async fn refresh_or_redirect(&self) -> Result<SessionToken, AuthError> {
        match self.refresh().await {
            Ok(token) => Ok(token),
            Err(e) => {
                let current = self.inner.navigator.current_location();
                let location = self.login_location(&current);
                tracing::info!(%location, "session expired, redirecting to login");
                self.inner.navigator.navigate(&location);
                Err(e)
            }
        }
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
        token: Option<&str>,
    ) -> Result<Response, reqwest::Error> {
        let mut request = self.inner.http.request(method, url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        request.send().await
    }
}

// =============================================================================
// REFRESH CALL
// =============================================================================

struct RefreshCall {
    http: reqwest::Client,
    url: String,
    store: TokenStore,
    events: broadcast::Sender<SessionEvent>,
}

impl RefreshCall {
    async fn run(self) -> Result<SessionToken, AuthError> {
        match self.exchange().await {
            Ok(token) => {
                emit(&self.events, SessionEvent::Refreshed);
                tracing::debug!(expires_in = token.expires_in, "access token refreshed");
                Ok(token)
            }
            Err(e) => {
                tracing::warn!(error = %e, "refresh failed, clearing session");
                self.store.clear();
                emit(&self.events, SessionEvent::SignedOut(SignOutReason::Expired));
                Err(AuthError::SessionExpired)
            }
        }
    }

    async fn exchange(&self) -> Result<SessionToken, AuthError> {
        let response = self
            .http
            .post(&self.url)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Rejected(format!("refresh refused with status {}", status.as_u16())));
        }
        let token: SessionToken = response
            .json()
            .await
            .map_err(|e| AuthError::Decode(e.to_string()))?;
        self.store.set_token(&token.access_token, token.expires_in)?;
        Ok(token)
    }
}

fn emit(events: &broadcast::Sender<SessionEvent>, event: SessionEvent) {
    // No subscribers is fine.
    let _ = events.send(event);
}

#[cfg(test)]
#[path = "service_test.rs"]
mod tests;
