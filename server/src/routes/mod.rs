//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every page is server-rendered HTML. The route guard wraps the whole
//! router so protected admin pages never reach their handler without an
//! `access_token` cookie; `/healthz` sits outside the guard.

pub mod admin;
pub mod public;

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::middleware::route_guard;
use crate::state::AppState;

/// Full application router.
pub fn app(state: AppState) -> Router {
    let pages = Router::new()
        .route("/", get(public::home))
        .route("/scores", post(public::submit))
        .route("/scores/lookup", get(public::lookup))
        .route("/scores/{id}", get(public::score))
        .route("/admin", get(admin::login_page).post(admin::login))
        .route("/admin/logout", post(admin::logout))
        .route("/admin/dashboard", get(admin::dashboard))
        .route("/admin/dashboard/export.csv", get(admin::export_csv))
        .layer(axum::middleware::from_fn_with_state(state.clone(), route_guard));

    Router::new()
        .merge(pages)
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
