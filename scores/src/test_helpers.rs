//! Fake scoring API shared by the client tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::task::JoinHandle;

pub const ADMIN_TOKEN: &str = "tok-admin";
pub const SLOW_ID: &str = "slow";

pub fn sample_output() -> Value {
    json!({
        "diagnostic": { "title": "Salaire cohérent", "description": "Tu es dans la moyenne." },
        "estimatedGap": {
            "predicted": 45000, "actual": 47000, "difference": 2000,
            "percentage": 4.4, "comment": "Légèrement au-dessus"
        },
        "salaryPosition": { "percentile": 62, "rankLabel": "moitié haute", "comparison": "Mieux que 62%" },
        "chartData": {
            "averageByXp": [{ "xp": 1, "average": 38000 }, { "xp": 3, "average": 44000 }],
            "histogram": [{ "range": "0.0–0.1", "count": 2 }, { "range": "0.1–0.2", "count": 5 }]
        },
        "coherenceScore": 0.73,
        "meanScore": 0.61,
        "stdScore": 0.12
    })
}

fn sample_input(email: &str, compensation: u32, total_xp: u32) -> Value {
    json!({ "location": "Lyon", "compensation": compensation, "total_xp": total_xp, "email": email })
}

#[derive(Default)]
pub struct FakeScores {
    pub analyzed: AtomicUsize,
    pub admin_hits: AtomicUsize,
}

pub struct FakeScoringApi {
    pub base_url: String,
    pub state: Arc<FakeScores>,
    handle: JoinHandle<()>,
}

impl Drop for FakeScoringApi {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl FakeScoringApi {
    pub async fn spawn() -> Self {
        let state = Arc::new(FakeScores::default());
        let app = Router::new()
            .route("/scores/analyze", post(analyze))
            .route("/scores/analyze/{id}", get(by_id))
            .route("/scores/email", get(by_email))
            .route("/scores/all", get(all))
            .route("/scores/stats", get(stats))
            .route("/auth/login", post(login))
            .with_state(Arc::clone(&state));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { base_url: format!("http://{addr}"), state, handle }
    }
}

async fn analyze(State(state): State<Arc<FakeScores>>, Json(body): Json<Value>) -> Response {
    if body["location"] == "boom" {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    let n = state.analyzed.fetch_add(1, Ordering::SeqCst) + 1;
    Json(json!({ "id": format!("s-{n}") })).into_response()
}

async fn by_id(Path(id): Path<String>) -> Response {
    match id.as_str() {
        "known" | "s-1" => Json(json!({
            "id": id,
            "input": sample_input("a@b.fr", 47000, 3),
            "output": sample_output(),
            "createdAt": "2025-01-02T10:00:00Z"
        }))
        .into_response(),
        "flat" => Json(sample_output()).into_response(),
        "garbled" => Json(json!({ "id": "garbled", "output": { "nope": 1 } })).into_response(),
        SLOW_ID => {
            tokio::time::sleep(Duration::from_millis(300)).await;
            Json(json!({ "id": id, "output": sample_output() })).into_response()
        }
        _ => (StatusCode::NOT_FOUND, "no such score").into_response(),
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
        { "id": "1", "input": sample_input("a@b.fr", 40000, 9) },
        { "id": "2", "input": sample_input("a@b.fr", 50000, 2) },
        { "id": "3", "input": sample_input("a@b.fr", 50000, 6) }
    ]))
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {ADMIN_TOKEN}"))
}

async fn all(State(state): State<Arc<FakeScores>>, headers: HeaderMap) -> Response {
    state.admin_hits.fetch_add(1, Ordering::SeqCst);
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
            "location": "Paris", "email": "two@example.fr", "consent": false,
            "createdAt": "2025-03-01T09:00:00Z"
        }
    ]))
    .into_response()
}

async fn stats(State(state): State<Arc<FakeScores>>, headers: HeaderMap) -> Response {
    state.admin_hits.fetch_add(1, Ordering::SeqCst);
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({ "totalScores": 2, "uniqueEmails": 2, "averageCompensation": 47500 })).into_response()
}

async fn login() -> Json<Value> {
    Json(json!({ "accessToken": ADMIN_TOKEN, "expiresIn": 600 }))
}
