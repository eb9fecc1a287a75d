//! Minimal HTML rendering. Every dynamic value goes through [`escape`].

use std::fmt::Write as _;

use axum::response::Html;
use scores::ValidationError;

#[must_use]
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Full document around `body`. `head` is inserted verbatim.
#[must_use]
pub fn page(title: &str, head: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!doctype html>\n<html lang=\"fr\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{}</title>\n{head}</head>\n<body>\n<main>\n{body}</main>\n</body>\n</html>\n",
        escape(title)
    ))
}

/// Error state with an optional retry link.
#[must_use]
pub fn error_state(title: &str, message: &str, retry: Option<&str>) -> String {
    let mut out = format!(
        "<section class=\"error\">\n<h1>{}</h1>\n<p>{}</p>\n",
        escape(title),
        escape(message)
    );
    if let Some(href) = retry {
        let _ = writeln!(out, "<a class=\"retry\" href=\"{}\">Retry</a>", escape(href));
    }
    out.push_str("</section>\n");
    out
}

/// Inline message for `field`, empty when it passed.
#[must_use]
pub fn field_error(errors: &[ValidationError], field: &str) -> String {
    errors
        .iter()
        .find(|e| e.field == field)
        .map(|e| format!("<p class=\"field-error\" data-field=\"{field}\">{}</p>", escape(e.message)))
        .unwrap_or_default()
}

#[cfg(test)]
#[path = "html_test.rs"]
mod tests;
