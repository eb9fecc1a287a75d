//! Public pages: salary form, analysis progress, score view, email lookup.

use std::fmt::Write as _;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Form;
use reqwest::Url;
use scores::report::{euro_fr, number_fr, years_fr, CurvePoint, Trend, XpRow};
use scores::validation::is_valid_email;
use scores::{EmailMatch, ScoreForm, ScoreView, ScoresError, ValidationError};
use serde::Deserialize;

use crate::html::{error_state, escape, field_error, page};
use crate::state::AppState;

const SITE_TITLE: &str = "Salary coherence";

/// Base for building site-relative links; only path and query are kept.
const SITE_ORIGIN: &str = "http://localhost";

/// Shown one per line while the analysis settles.
const PROGRESS_STEPS: [&str; 6] = [
    "Collecting your answers...",
    "Checking experience level...",
    "Comparing salaries...",
    "Cross-checking with our reference data...",
    "Crunching numbers...",
    "Analysis complete! Results almost ready...",
];

const CHART_WIDTH: f64 = 400.0;
const CHART_HEIGHT: f64 = 160.0;

#[derive(Debug, Default, Deserialize)]
pub struct LookupQuery {
    #[serde(default)]
    pub email: String,
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `GET /`
pub async fn home() -> Response {
    page(SITE_TITLE, "", &home_body(&ScoreForm::default(), &[], "")).into_response()
}

/// `POST /scores`: validate, submit, then show the progress page.
pub async fn submit(State(state): State<AppState>, Form(form): Form<ScoreForm>) -> Response {
    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => {
            let body = home_body(&form, &errors, "");
            return (StatusCode::UNPROCESSABLE_ENTITY, page(SITE_TITLE, "", &body)).into_response();
        }
    };

    match state.scores.analyze(&input).await {
        Ok(created) => {
            let target = score_path(&created.id);
            let delay = state.config.progress_delay.as_secs();
            let head = format!("<meta http-equiv=\"refresh\" content=\"{delay};url={}\">\n", escape(&target));
            page("Analysis in progress", &head, &progress_body(&target)).into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "analysis submission failed");
            let body = format!(
                "{}{}",
                error_state("Analysis failed", &e.user_message(), None),
                form_section(&form, &[])
            );
            (status_for(&e), page(SITE_TITLE, "", &body)).into_response()
        }
    }
}

/// `GET /scores/{id}`
pub async fn score(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let retry = score_path(&id);
    match state.scores.get_by_id(&id).await {
        Ok(record) => {
            let view = ScoreView::from_output(&record.output);
            page(&format!("{} | {SITE_TITLE}", view.title), "", &score_body(&view)).into_response()
        }
        Err(ScoresError::NotFound) => {
            let body = error_state("Score not found", &ScoresError::NotFound.user_message(), Some(&retry));
            (StatusCode::NOT_FOUND, page(SITE_TITLE, "", &body)).into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, %id, "score fetch failed");
            let body = error_state("Score unavailable", &e.user_message(), Some(&retry));
            (status_for(&e), page(SITE_TITLE, "", &body)).into_response()
        }
    }
}

/// `GET /scores/lookup?email=`
pub async fn lookup(State(state): State<AppState>, Query(query): Query<LookupQuery>) -> Response {
    let email = query.email.trim();
    if !is_valid_email(email) {
        let errors = [ValidationError::new("lookup_email", "Invalid email")];
        let body = home_body(&ScoreForm::default(), &errors, email);
        return (StatusCode::UNPROCESSABLE_ENTITY, page(SITE_TITLE, "", &body)).into_response();
    }

    match state.scores.by_email(email).await {
        Ok(matches) => page(SITE_TITLE, "", &lookup_body(email, &matches)).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "email lookup failed");
            let retry = lookup_path(email);
            let body = error_state("Lookup failed", &e.user_message(), Some(&retry));
            (status_for(&e), page(SITE_TITLE, "", &body)).into_response()
        }
    }
}

fn status_for(error: &ScoresError) -> StatusCode {
    match error {
        ScoresError::NotFound => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_GATEWAY,
    }
}

fn site_url(path: &str) -> Option<Url> {
    Url::parse(SITE_ORIGIN).ok()?.join(path).ok()
}

/// `/scores/<id>` with the id encoded as a single path segment.
fn score_path(id: &str) -> String {
    let Some(mut url) = site_url("/scores") else {
        return "/scores".to_owned();
    };
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.push(id);
    }
    url.path().to_owned()
}

/// `/scores/lookup?email=<email>`, form-encoded.
fn lookup_path(email: &str) -> String {
    let Some(mut url) = site_url("/scores/lookup") else {
        return "/scores/lookup".to_owned();
    };
    url.query_pairs_mut().append_pair("email", email);
    match url.query() {
        Some(query) => format!("{}?{query}", url.path()),
        None => url.path().to_owned(),
    }
}

// =============================================================================
// RENDERING
// =============================================================================

fn home_body(form: &ScoreForm, errors: &[ValidationError], lookup_email: &str) -> String {
    format!(
        "<h1>{SITE_TITLE}</h1>\n<p>Is your salary in line with your experience and location?</p>\n{}{}",
        form_section(form, errors),
        lookup_section(lookup_email, errors)
    )
}

fn form_section(form: &ScoreForm, errors: &[ValidationError]) -> String {
    let input = |name: &str, label: &str, kind: &str, value: &str| {
        format!(
            "<label for=\"{name}\">{label}</label>\n<input id=\"{name}\" name=\"{name}\" type=\"{kind}\" value=\"{}\">\n{}\n",
            escape(value),
            field_error(errors, name)
        )
    };
    let checked = if form.consent.is_some() { " checked" } else { "" };

    let mut out = String::from("<form class=\"score-form\" method=\"post\" action=\"/scores\">\n");
    out.push_str(&input("location", "Location", "text", &form.location));
    out.push_str(&input("compensation", "Gross annual salary (€)", "text", &form.compensation));
    out.push_str(&input("total_xp", "Total experience (years)", "text", &form.total_xp));
    out.push_str(&input("company_xp", "Years at current company (optional)", "text", &form.company_xp));
    out.push_str(&input("email", "Email", "email", &form.email));
    let _ = writeln!(
        out,
        "<label><input type=\"checkbox\" name=\"consent\" value=\"on\"{checked}> I agree to be contacted</label>"
    );
    out.push_str("<button type=\"submit\">Analyze my salary</button>\n</form>\n");
    out
}

fn lookup_section(email: &str, errors: &[ValidationError]) -> String {
    format!(
        "<form class=\"lookup\" method=\"get\" action=\"/scores/lookup\">\n\
         <label for=\"lookup_email\">Find my previous analyses</label>\n\
         <input id=\"lookup_email\" name=\"email\" type=\"email\" value=\"{}\">\n{}\n\
         <button type=\"submit\">Search</button>\n</form>\n",
        escape(email),
        field_error(errors, "lookup_email")
    )
}

fn progress_body(target: &str) -> String {
    let mut out = String::from("<section class=\"progress\">\n<h1>Running the analysis</h1>\n<ol>\n");
    for step in PROGRESS_STEPS {
        let _ = writeln!(out, "<li>{}</li>", escape(step));
    }
    let _ = writeln!(out, "</ol>\n<a href=\"{}\">See my score</a>\n</section>", escape(target));
    out
}

fn lookup_body(email: &str, matches: &[EmailMatch]) -> String {
    let mut out = format!("<h1>Analyses for {}</h1>\n", escape(email));
    if matches.is_empty() {
        out.push_str("<p>No previous analysis for this email.</p>\n");
    } else {
        out.push_str("<ul class=\"matches\">\n");
        for item in matches {
            let _ = writeln!(
                out,
                "<li><a href=\"{}\">{} · {} · {}</a></li>",
                escape(&score_path(&item.id)),
                escape(&item.input.location),
                escape(&euro_fr(Some(item.input.compensation))),
                escape(&years_fr(Some(item.input.total_xp)))
            );
        }
        out.push_str("</ul>\n");
    }
    out.push_str("<a href=\"/\">New analysis</a>\n");
    out
}

fn score_body(view: &ScoreView) -> String {
    let mut out = format!(
        "<section class=\"diagnostic\">\n<h1>{}</h1>\n<p>{}</p>\n</section>\n",
        escape(&view.title),
        escape(&view.description)
    );

    out.push_str("<section class=\"gauges\">\n");
    out.push_str(&gauge("Your score", view.user_score10));
    out.push_str(&gauge("Average score", view.mean_score10));
    out.push_str("</section>\n");

    let trend = match view.gap.trend {
        Trend::Above => "above",
        Trend::Below => "below",
        Trend::Even => "even",
    };
    let _ = writeln!(
        out,
        "<section class=\"gap {trend}\">\n<h2>Estimated gap</h2>\n<dl>\n\
         <dt>Your salary</dt><dd>{}</dd>\n<dt>Expected salary</dt><dd>{}</dd>\n\
         <dt>Difference</dt><dd>{} ({} %)</dd>\n</dl>\n<p>{}</p>\n</section>",
        escape(&view.gap.actual),
        escape(&view.gap.predicted),
        escape(&view.gap.difference),
        number_fr(view.gap.percentage),
        escape(&view.gap.comment)
    );

    let _ = writeln!(
        out,
        "<section class=\"position\">\n<h2>Salary position</h2>\n<p>Percentile: {}</p>\n<p>{}</p>\n<p>{}</p>\n</section>",
        number_fr(view.percentile),
        escape(&view.rank_label),
        escape(&view.comparison)
    );

    if let Some(advice) = &view.advice {
        let _ = writeln!(out, "<section class=\"advice\">\n<h2>Advice</h2>\n<p>{}</p>\n</section>", escape(advice));
    }

    out.push_str(&histogram_table(view));
    out.push_str(&gauss_svg(&view.curve, view.user_point));
    out.push_str(&xp_table(&view.by_xp));
    out.push_str("<a href=\"/\">New analysis</a>\n");
    out
}

fn gauge(label: &str, score10: f64) -> String {
    format!(
        "<figure class=\"gauge\">\n<meter min=\"0\" max=\"10\" value=\"{score10}\"></meter>\n\
         <figcaption>{} <strong>{}/10</strong></figcaption>\n</figure>\n",
        escape(label),
        number_fr(score10)
    )
}

fn histogram_table(view: &ScoreView) -> String {
    let mut out = String::from(
        "<section class=\"histogram\">\n<h2>Similar profiles</h2>\n<table>\n<tr><th>Score</th><th>Profiles</th></tr>\n",
    );
    for bar in &view.histogram {
        let _ = writeln!(out, "<tr><td>{}</td><td>{}</td></tr>", escape(&bar.label), bar.count);
    }
    let _ = writeln!(out, "</table>\n<p>{} profiles compared</p>\n</section>", view.population);
    out
}

/// Density curve as an SVG polyline, scaled to its own peak.
fn gauss_svg(curve: &[CurvePoint], user: CurvePoint) -> String {
    let peak = curve.iter().map(|p| p.density).fold(user.density, f64::max);
    let scale_y = |density: f64| {
        if peak > 0.0 {
            CHART_HEIGHT - density / peak * CHART_HEIGHT
        } else {
            CHART_HEIGHT
        }
    };

    let points: Vec<String> = curve
        .iter()
        .map(|p| format!("{:.1},{:.1}", p.score * CHART_WIDTH, scale_y(p.density)))
        .collect();
    format!(
        "<section class=\"gauss\">\n<h2>Score distribution</h2>\n\
         <svg viewBox=\"0 0 {CHART_WIDTH} {CHART_HEIGHT}\" role=\"img\">\n\
         <polyline fill=\"none\" stroke=\"currentColor\" points=\"{}\"/>\n\
         <circle cx=\"{:.1}\" cy=\"{:.1}\" r=\"4\"/>\n</svg>\n</section>\n",
        points.join(" "),
        user.score * CHART_WIDTH,
        scale_y(user.density)
    )
}

fn xp_table(rows: &[XpRow]) -> String {
    if rows.is_empty() {
        return String::new();
    }
    let mut out = String::from(
        "<section class=\"by-xp\">\n<h2>Salary by experience</h2>\n<table>\n\
         <tr><th>Experience</th><th>Average</th><th>Median</th></tr>\n",
    );
    for row in rows {
        let _ = writeln!(
            out,
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(&years_fr(Some(row.xp))),
            escape(&euro_fr(row.average)),
            escape(&euro_fr(row.median))
        );
    }
    out.push_str("</table>\n</section>\n");
    out
}

#[cfg(test)]
#[path = "public_test.rs"]
mod tests;
