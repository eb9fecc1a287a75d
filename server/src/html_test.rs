use super::*;

#[test]
fn escape_covers_markup_and_quotes() {
    assert_eq!(escape(r#"<a href="x">'&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;");
    assert_eq!(escape("Saint-Étienne"), "Saint-Étienne");
}

#[test]
fn page_escapes_title_but_not_body() {
    let Html(doc) = page("<Score>", "", "<p>ok</p>");
    assert!(doc.contains("<title>&lt;Score&gt;</title>"));
    assert!(doc.contains("<p>ok</p>"));
}

#[test]
fn error_state_links_retry() {
    let html = error_state("Oops", "<b>down</b>", Some("/scores/1"));
    assert!(html.contains("&lt;b&gt;down&lt;/b&gt;"));
    assert!(html.contains("href=\"/scores/1\""));
    assert!(!error_state("Oops", "down", None).contains("retry"));
}

#[test]
fn field_error_only_for_failing_field() {
    let errors = vec![ValidationError::new("email", "Invalid email")];
    assert!(field_error(&errors, "email").contains("Invalid email"));
    assert!(field_error(&errors, "location").is_empty());
}
