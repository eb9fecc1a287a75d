//! Fake auth API and navigator shared by the service and context tests.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::header::{AUTHORIZATION, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde_json::json;
use tokio::task::JoinHandle;

use crate::config::SessionConfig;
use crate::service::{Navigator, SessionService};
use crate::token_store::TokenStore;
use crate::token_store::test_helpers::{ManualClock, memory_store};

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "secret";
pub const T0: i64 = 1_700_000_000_000;

// =============================================================================
// FAKE AUTH API
// =============================================================================

#[derive(Default)]
pub struct FakeState {
    pub logins: AtomicUsize,
    pub refreshes: AtomicUsize,
    pub logouts: AtomicUsize,
    pub protected_hits: AtomicUsize,
    pub refresh_fails: AtomicBool,
    pub refresh_delay_ms: AtomicU64,
    /// Bearer tokens the protected route answers with 401.
    pub rejected_bearers: Mutex<Vec<String>>,
    pub last_bearer: Mutex<Option<String>>,
    pub last_refresh_cookie: Mutex<Option<String>>,
    pub last_logout_bearer: Mutex<Option<String>>,
    pub last_logout_cookie: Mutex<Option<String>>,
}

pub struct FakeAuthApi {
    pub base_url: String,
    pub state: Arc<FakeState>,
    handle: JoinHandle<()>,
}

impl Drop for FakeAuthApi {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl FakeAuthApi {
    pub async fn spawn() -> Self {
        let state = Arc::new(FakeState::default());
        let app = Router::new()
            .route("/auth/login", post(login))
            .route("/auth/refresh", post(refresh))
            .route("/auth/logout", post(logout))
            .route("/scores/all", get(protected))
            .with_state(Arc::clone(&state));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { base_url: format!("http://{addr}"), state, handle }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub fn refreshes(&self) -> usize {
        self.state.refreshes.load(Ordering::SeqCst)
    }

    pub fn reject_bearer(&self, token: &str) {
        self.state.rejected_bearers.lock().unwrap().push(token.to_owned());
    }
}

async fn login(State(state): State<Arc<FakeState>>, Json(body): Json<serde_json::Value>) -> Response {
    state.logins.fetch_add(1, Ordering::SeqCst);
    if body["email"] == ADMIN_EMAIL && body["password"] == ADMIN_PASSWORD {
        (
            [(SET_COOKIE, "sid=server-session; Path=/; HttpOnly")],
            Json(json!({ "accessToken": "tok-login", "expiresIn": 600 })),
        )
            .into_response()
    } else {
        (StatusCode::UNAUTHORIZED, "Invalid credentials").into_response()
    }
}

async fn refresh(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    let n = state.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
    *state.last_refresh_cookie.lock().unwrap() = headers
        .get(COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let delay = state.refresh_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    if state.refresh_fails.load(Ordering::SeqCst) {
        return (StatusCode::UNAUTHORIZED, "no session").into_response();
    }
    Json(json!({ "accessToken": format!("tok-refresh-{n}"), "expiresIn": 600 })).into_response()
}

async fn logout(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> StatusCode {
    state.logouts.fetch_add(1, Ordering::SeqCst);
    *state.last_logout_bearer.lock().unwrap() = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    *state.last_logout_cookie.lock().unwrap() = headers
        .get(COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    StatusCode::NO_CONTENT
}

async fn protected(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    state.protected_hits.fetch_add(1, Ordering::SeqCst);
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_owned);
    *state.last_bearer.lock().unwrap() = bearer.clone();
    let rejected = state.rejected_bearers.lock().unwrap().clone();
    match bearer {
        Some(token) if !rejected.contains(&token) => Json(json!([])).into_response(),
        _ => StatusCode::UNAUTHORIZED.into_response(),
    }
}

// =============================================================================
// NAVIGATOR
// =============================================================================

pub struct RecordingNavigator {
    current: String,
    visits: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn at(current: &str) -> Arc<Self> {
        Arc::new(Self { current: current.to_owned(), visits: Mutex::new(Vec::new()) })
    }

    pub fn visits(&self) -> Vec<String> {
        self.visits.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn current_location(&self) -> String {
        self.current.clone()
    }

    fn navigate(&self, location: &str) {
        self.visits.lock().unwrap().push(location.to_owned());
    }
}

// =============================================================================
// WIRING
// =============================================================================

pub struct Harness {
    pub api: FakeAuthApi,
    pub clock: Arc<ManualClock>,
    pub navigator: Arc<RecordingNavigator>,
    pub service: SessionService,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config(tweak: impl FnOnce(&mut SessionConfig)) -> Self {
        let api = FakeAuthApi::spawn().await;
        let clock = ManualClock::new(T0);
        let navigator = RecordingNavigator::at("/admin/dashboard");
        let mut config = SessionConfig::new(&api.base_url, "http://localhost:3000").unwrap();
        tweak(&mut config);
        let store: TokenStore = memory_store("http://localhost:3000", clock.clone());
        let service = SessionService::new(config, store, navigator.clone()).unwrap();
        Self { api, clock, navigator, service }
    }

    pub fn store(&self) -> &TokenStore {
        self.service.token_store()
    }

    /// Seed a token that is already past its expiry.
    pub fn seed_expired_token(&self, token: &str) {
        self.store().set_token(token, 60).unwrap();
        self.clock.advance_secs(61);
    }
}
