//! Fake scoring + auth API for router tests.

use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::{HeaderMap, HeaderName, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tower::ServiceExt;

use crate::state::test_helpers::test_app_state;

pub const ADMIN_EMAIL: &str = "admin@example.fr";
pub const ADMIN_PASSWORD: &str = "hunter22";
pub const ADMIN_TOKEN: &str = "tok-admin";

#[derive(Default)]
pub struct UpstreamState {
    pub analyzed: AtomicUsize,
    pub logouts: AtomicUsize,
    /// `Authorization` and `Cookie` headers of the last logout call.
    pub last_logout: Mutex<Option<(Option<String>, Option<String>)>>,
}

pub struct FakeUpstream {
    pub base_url: String,
    pub state: Arc<UpstreamState>,
    handle: JoinHandle<()>,
}

impl Drop for FakeUpstream {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl FakeUpstream {
    pub async fn spawn() -> Self {
        let state = Arc::new(UpstreamState::default());
        let app = Router::new()
            .route("/auth/login", post(login))
            .route("/auth/logout", post(logout))
            .route("/scores/analyze", post(analyze))
            .route("/scores/analyze/{id}", get(by_id))
            .route("/scores/email", get(by_email))
            .route("/scores/all", get(all))
            .route("/scores/stats", get(stats))
            .with_state(Arc::clone(&state));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { base_url: format!("http://{addr}"), state, handle }
    }

    /// The application router wired to this upstream.
    pub fn app(&self) -> Router {
        crate::routes::app(test_app_state(&self.base_url))
    }
}

/// Send one request through `app`; returns the response and its body text.
pub async fn call(app: Router, request: Request<Body>) -> (Response<()>, String) {
    let response = app.oneshot(request).await.unwrap();
    let (parts, body) = response.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    (Response::from_parts(parts, ()), String::from_utf8(bytes.to_vec()).unwrap())
}

pub fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn form_request(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(Body::from(body.to_owned())).unwrap()
}

fn sample_output() -> Value {
    json!({
        "diagnostic": { "title": "Coherent salary", "description": "Right on the market." },
        "estimatedGap": {
            "predicted": 45000, "actual": 47000, "difference": 2000,
            "percentage": 4.4, "comment": "Slightly above"
        },
        "salaryPosition": { "percentile": 62, "rankLabel": "upper half", "comparison": "Better than 62%" },
        "chartData": {
            "averageByXp": [{ "xp": 1, "average": 38000 }, { "xp": 3, "average": 44000 }],
            "medianByXp": [{ "xp": 3, "median": 43000 }],
            "histogram": [{ "range": "0.0–0.1", "count": 2 }, { "range": "0.1–0.2", "count": 5 }]
        },
        "coherenceScore": 0.73,
        "meanScore": 0.61,
        "stdScore": 0.12,
        "conseil": "Ask for a <raise>"
    })
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["email"] == ADMIN_EMAIL && body["password"] == ADMIN_PASSWORD {
        Json(json!({ "accessToken": ADMIN_TOKEN, "expiresIn": 600 })).into_response()
    } else {
        (StatusCode::UNAUTHORIZED, "Invalid credentials").into_response()
    }
}

async fn logout(State(state): State<Arc<UpstreamState>>, headers: HeaderMap) -> StatusCode {
    state.logouts.fetch_add(1, Ordering::SeqCst);
    let header = |name: HeaderName| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_owned);
    *state.last_logout.lock().unwrap() = Some((header(AUTHORIZATION), header(COOKIE)));
    StatusCode::NO_CONTENT
}

async fn analyze(State(state): State<Arc<UpstreamState>>, Json(body): Json<Value>) -> Response {
    if body["location"] == "boom" {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    let n = state.analyzed.fetch_add(1, Ordering::SeqCst) + 1;
    Json(json!({ "id": n })).into_response()
}

async fn by_id(Path(id): Path<String>) -> Response {
    match id.as_str() {
        "1" => Json(json!({ "id": id, "output": sample_output() })).into_response(),
        "broken" => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

#[derive(serde::Deserialize)]
struct EmailQuery {
    email: String,
}

async fn by_email(Query(query): Query<EmailQuery>) -> Json<Value> {
    if query.email != "a@b.fr" {
        return Json(json!([]));
    }
    Json(json!([
        { "id": "7", "input": { "location": "Lyon", "compensation": 40000, "total_xp": 9, "email": "a@b.fr" } },
        { "id": "8", "input": { "location": "Nantes", "compensation": 52000, "total_xp": 2, "email": "a@b.fr" } }
    ]))
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {ADMIN_TOKEN}"))
}

async fn all(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!([
        {
            "id": 1, "compensation": 40000, "company_xp": 2, "total_xp": 4,
            "location": "Lyon", "email": "one@example.fr", "consent": true,
            "createdAt": "2025-01-01T09:00:00Z"
        },
        {
            "id": 2, "compensation": 55000, "company_xp": null, "total_xp": 7,
            "location": "Paris \"centre\"", "email": "two@example.fr", "consent": false,
            "createdAt": "2025-03-04T08:09:00Z"
        }
    ]))
    .into_response()
}

async fn stats(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({ "totalScores": 2, "uniqueEmails": 2, "averageCompensation": 47500 })).into_response()
}
