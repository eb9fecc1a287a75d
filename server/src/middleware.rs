//! Route guard middleware.
//!
//! SYSTEM CONTEXT
//! ==============
//! Runs in front of every page handler. It only looks at the path, the raw
//! query and whether a non-empty `access_token` cookie is present; token
//! validity is checked later by the upstream API when the page loads data.
//!
//! Only GET and HEAD navigations are guarded. Form posts (sign-in, sign-out)
//! reach their handlers, which answer with `303 See Other` themselves; a
//! `307` here would make the browser replay the POST against the redirect.

use axum::extract::{Request, State};
use axum::http::Method;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use session::{GuardDecision, ACCESS_TOKEN_COOKIE};

use crate::state::AppState;

pub(crate) fn has_access_cookie(jar: &CookieJar) -> bool {
    jar.get(ACCESS_TOKEN_COOKIE)
        .is_some_and(|cookie| !cookie.value().is_empty())
}

pub async fn route_guard(State(state): State<AppState>, jar: CookieJar, request: Request, next: Next) -> Response {
    if !matches!(*request.method(), Method::GET | Method::HEAD) {
        return next.run(request).await;
    }

    let uri = request.uri();
    let decision = state
        .policy
        .evaluate(uri.path(), uri.query(), has_access_cookie(&jar));

    match decision {
        GuardDecision::Proceed => next.run(request).await,
        GuardDecision::Redirect(location) => {
            tracing::debug!(path = %uri.path(), %location, "route guard redirect");
            Redirect::temporary(&location).into_response()
        }
    }
}

#[cfg(test)]
#[path = "middleware_test.rs"]
mod tests;
