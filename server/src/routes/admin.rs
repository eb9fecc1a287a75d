//! Admin routes: sign-in, sign-out, dashboard, CSV export.
//!
//! DESIGN
//! ======
//! The browser's `access_token` cookie is the only copy of the admin
//! session. Sign-in borrows a throwaway `SessionService` to talk to the
//! Auth API, then hands the token to the browser. Dashboard calls forward
//! that cookie as a bearer credential; when the upstream answers 401 the
//! cookie is cleared and the admin is sent back to the login page with a
//! `redirect` to where they were.
//!
//! ERROR HANDLING
//! ==============
//! Every failure renders a page. Upstream auth failures become redirects,
//! anything else an error state with a retry link.

use std::fmt::Write as _;

use axum::extract::{Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use axum_extra::extract::cookie::CookieJar;
use scores::export::{csv_filename, scores_csv, sort_scores, CSV_HEADERS};
use scores::report::{date_fr, euro_fr, stat_cards, years_fr};
use scores::{BearerAccess, LoginForm, Score, ScoresError, SortDirection, SortField, TableSort, ValidationError};
use serde::Deserialize;
use session::token_store::{access_cookie, expired_access_cookie};
use session::ACCESS_TOKEN_COOKIE;
use time::OffsetDateTime;

use crate::html::{error_state, escape, field_error, page};
use crate::state::AppState;

const ADMIN_TITLE: &str = "Admin";

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub redirect: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub sort: Option<String>,
    pub dir: Option<String>,
}

impl DashboardQuery {
    /// Unknown values fall back to the default ordering.
    fn table_sort(&self) -> TableSort {
        let default = TableSort::default();
        TableSort {
            field: self
                .sort
                .as_deref()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.field),
            direction: self
                .dir
                .as_deref()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.direction),
        }
    }
}

fn access_token(jar: &CookieJar) -> Option<String> {
    jar.get(ACCESS_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_owned())
        .filter(|token| !token.is_empty())
}

// =============================================================================
// SIGN IN / OUT
// =============================================================================

/// `GET /admin`
pub async fn login_page(Query(query): Query<LoginQuery>) -> Response {
    let form = LoginForm { redirect: query.redirect, ..LoginForm::default() };
    page(ADMIN_TITLE, "", &login_body(&form, &[], None)).into_response()
}

/// `POST /admin`
pub async fn login(State(state): State<AppState>, jar: CookieJar, Form(form): Form<LoginForm>) -> Response {
    let credentials = match form.validate() {
        Ok(credentials) => credentials,
        Err(errors) => {
            let body = login_body(&form, &errors, None);
            return (StatusCode::UNPROCESSABLE_ENTITY, page(ADMIN_TITLE, "", &body)).into_response();
        }
    };

    let session = match state.request_session() {
        Ok(session) => session,
        Err(e) => {
            tracing::error!(error = %e, "failed to build auth client");
            let body = login_body(&form, &[], Some(&e.user_message()));
            return (StatusCode::INTERNAL_SERVER_ERROR, page(ADMIN_TITLE, "", &body)).into_response();
        }
    };

    match session.login(&credentials).await {
        Ok(token) => {
            let cookie = access_cookie(&token.access_token, token.expires_in, state.config.cookie_secure);
            let destination = state.policy.post_login_destination(form.redirect.as_deref());
            (jar.add(cookie), Redirect::to(&destination)).into_response()
        }
        Err(e) => {
            let body = login_body(&form, &[], Some(&e.user_message()));
            (StatusCode::UNAUTHORIZED, page(ADMIN_TITLE, "", &body)).into_response()
        }
    }
}

/// `POST /admin/logout`: the upstream call carries the browser's token and
/// cookies and is best-effort; the cookie is cleared regardless.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> Response {
    if let Some(token) = access_token(&jar) {
        match state.browser_session(&jar, &token) {
            Ok(session) => session.logout().await,
            Err(e) => tracing::warn!(error = %e, "skipping upstream logout"),
        }
    }
    let jar = jar.add(expired_access_cookie(state.config.cookie_secure));
    (jar, Redirect::to(state.policy.login_path())).into_response()
}

// =============================================================================
// DASHBOARD
// =============================================================================

/// `GET /admin/dashboard?sort=&dir=`
pub async fn dashboard(
    State(state): State<AppState>,
    jar: CookieJar,
    uri: Uri,
    Query(query): Query<DashboardQuery>,
) -> Response {
    let Some(token) = access_token(&jar) else {
        return Redirect::temporary(&state.policy.login_location(&original(&uri))).into_response();
    };
    let access = BearerAccess::new(state.scores.http().clone(), token);

    let (all, stats) = tokio::join!(state.scores.all(&access), state.scores.stats(&access));
    let (mut scores, stats) = match (all, stats) {
        (Ok(scores), Ok(stats)) => (scores, stats),
        (Err(e), _) | (_, Err(e)) => return upstream_failure(&state, jar, &uri, &e),
    };

    let sort = query.table_sort();
    sort_scores(&mut scores, sort);
    let body = dashboard_body(&state, &stat_cards(&stats), &scores, sort);
    page("Dashboard", "", &body).into_response()
}

/// `GET /admin/dashboard/export.csv`
pub async fn export_csv(State(state): State<AppState>, jar: CookieJar, uri: Uri) -> Response {
    let Some(token) = access_token(&jar) else {
        return Redirect::temporary(&state.policy.login_location(&original(&uri))).into_response();
    };
    let access = BearerAccess::new(state.scores.http().clone(), token);

    match state.scores.all(&access).await {
        Ok(scores) => {
            let disposition = format!("attachment; filename=\"{}\"", csv_filename(OffsetDateTime::now_utc().date()));
            tracing::info!(rows = scores.len(), "scores exported");
            (
                [(CONTENT_TYPE, "text/csv; charset=utf-8".to_owned()), (CONTENT_DISPOSITION, disposition)],
                scores_csv(&scores),
            )
                .into_response()
        }
        Err(e) => upstream_failure(&state, jar, &uri, &e),
    }
}

fn original(uri: &Uri) -> String {
    uri.path_and_query()
        .map_or_else(|| uri.path().to_owned(), |pq| pq.as_str().to_owned())
}

/// Auth failures sign the browser out; the rest render an error page.
fn upstream_failure(state: &AppState, jar: CookieJar, uri: &Uri, error: &ScoresError) -> Response {
    if matches!(error, ScoresError::Unauthorized | ScoresError::Auth(_)) {
        tracing::info!(path = %uri.path(), "admin session rejected upstream");
        let jar = jar.add(expired_access_cookie(state.config.cookie_secure));
        let location = state.policy.login_location(&original(uri));
        return (jar, Redirect::temporary(&location)).into_response();
    }

    tracing::warn!(error = %error, "admin data unavailable");
    let body = error_state("Dashboard unavailable", &error.user_message(), Some(&original(uri)));
    (StatusCode::BAD_GATEWAY, page(ADMIN_TITLE, "", &body)).into_response()
}

// =============================================================================
// RENDERING
// =============================================================================

fn login_body(form: &LoginForm, errors: &[ValidationError], failure: Option<&str>) -> String {
    let mut out = String::from("<h1>Admin sign-in</h1>\n");
    if let Some(message) = failure {
        let _ = writeln!(out, "<p class=\"form-error\">{}</p>", escape(message));
    }
    out.push_str("<form method=\"post\" action=\"/admin\">\n");
    if let Some(redirect) = &form.redirect {
        let _ = writeln!(out, "<input type=\"hidden\" name=\"redirect\" value=\"{}\">", escape(redirect));
    }
    let _ = write!(
        out,
        "<label for=\"email\">Email</label>\n<input id=\"email\" name=\"email\" type=\"email\" value=\"{}\">\n{}\n\
         <label for=\"password\">Password</label>\n<input id=\"password\" name=\"password\" type=\"password\">\n{}\n\
         <button type=\"submit\">Sign in</button>\n</form>\n",
        escape(&form.email),
        field_error(errors, "email"),
        field_error(errors, "password")
    );
    out
}

fn dashboard_body(state: &AppState, cards: &[scores::StatCard], scores: &[Score], sort: TableSort) -> String {
    let mut out = format!(
        "<header>\n<h1>Dashboard</h1>\n<a href=\"/admin/dashboard/export.csv\">Export CSV</a>\n\
         <form method=\"post\" action=\"{}/logout\"><button type=\"submit\">Sign out</button></form>\n</header>\n",
        escape(state.policy.login_path())
    );

    out.push_str("<section class=\"cards\">\n");
    for card in cards {
        let _ = writeln!(
            out,
            "<div class=\"card\"><h2>{}</h2><p>{}</p></div>",
            escape(&card.title),
            escape(&card.value)
        );
    }
    out.push_str("</section>\n<table class=\"scores\">\n<tr>");

    for (field, header) in SortField::ALL.into_iter().zip(CSV_HEADERS) {
        let next = sort.toggle(field);
        let marker = match (sort.field == field, sort.direction) {
            (true, SortDirection::Asc) => " ▲",
            (true, SortDirection::Desc) => " ▼",
            (false, _) => "",
        };
        let _ = write!(
            out,
            "<th><a href=\"?sort={}&amp;dir={}\">{}{marker}</a></th>",
            next.field.as_str(),
            next.direction.as_str(),
            escape(header)
        );
    }
    out.push_str("</tr>\n");

    for score in scores {
        let _ = writeln!(
            out,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            score.id,
            escape(&euro_fr(Some(score.compensation))),
            escape(&years_fr(score.company_xp)),
            escape(&years_fr(Some(score.total_xp))),
            escape(&score.location),
            escape(&score.email),
            if score.consent { "Oui" } else { "Non" },
            escape(&date_fr(&score.created_at))
        );
    }
    out.push_str("</table>\n");
    out
}

#[cfg(test)]
#[path = "admin_test.rs"]
mod tests;
