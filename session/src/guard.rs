//! Route Guard policy for page navigations.
//!
//! SYSTEM CONTEXT
//! ==============
//! Evaluated before any page handler runs, with nothing but the request path,
//! its query string and whether an `access_token` cookie came along. The
//! server wraps this in middleware; clients reuse [`GuardPolicy::login_location`]
//! so their own redirects carry the same `redirect=` contract.
//!
//! Only the access-token cookie counts as a session. A refresh cookie alone
//! does not, because the guard cannot tell whether it is still honored.

use reqwest::Url;

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
pub const REDIRECT_PARAM: &str = "redirect";

pub const DEFAULT_LOGIN_PATH: &str = "/admin";
pub const DEFAULT_LANDING_PATH: &str = "/admin/dashboard";
pub const DEFAULT_PROTECTED_PREFIXES: &[&str] = &["/admin/dashboard", "/admin/settings", "/admin/users"];
pub const DEFAULT_EXCLUDED_PREFIXES: &[&str] = &["/api", "/static", "/_next/static", "/_next/image", "/favicon.ico"];

/// Origin used only to borrow `Url`'s query parsing and encoding.
const PLACEHOLDER_ORIGIN: &str = "http://guard.invalid/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Let the request through unmodified.
    Proceed,
    /// Redirect to this path (with its own query, if any).
    Redirect(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardPolicy {
    login_path: String,
    landing_path: String,
    protected_prefixes: Vec<String>,
    excluded_prefixes: Vec<String>,
}

impl Default for GuardPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_LOGIN_PATH, DEFAULT_LANDING_PATH)
    }
}

impl GuardPolicy {
    #[must_use]
    pub fn new(login_path: impl Into<String>, landing_path: impl Into<String>) -> Self {
        Self {
            login_path: login_path.into(),
            landing_path: landing_path.into(),
            protected_prefixes: DEFAULT_PROTECTED_PREFIXES.iter().map(|p| (*p).to_owned()).collect(),
            excluded_prefixes: DEFAULT_EXCLUDED_PREFIXES.iter().map(|p| (*p).to_owned()).collect(),
        }
    }

    #[must_use]
    pub fn with_protected_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.protected_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    #[must_use]
    pub fn landing_path(&self) -> &str {
        &self.landing_path
    }

    /// False for API routes and static assets, which the guard never inspects.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        !self.excluded_prefixes.iter().any(|prefix| has_prefix(path, prefix))
    }

    #[must_use]
    pub fn is_protected(&self, path: &str) -> bool {
        self.protected_prefixes.iter().any(|prefix| has_prefix(path, prefix))
    }

    /// Decide what to do with a navigation to `path?query`.
    #[must_use]
    pub fn evaluate(&self, path: &str, query: Option<&str>, has_access_cookie: bool) -> GuardDecision {
        if !self.matches(path) {
            return GuardDecision::Proceed;
        }

        if path == self.login_path && has_access_cookie {
            let target = redirect_param(query);
            return GuardDecision::Redirect(self.post_login_destination(target.as_deref()));
        }

        if self.is_protected(path) && !has_access_cookie {
            let original = match query.filter(|q| !q.is_empty()) {
                Some(q) => format!("{path}?{q}"),
                None => path.to_owned(),
            };
            return GuardDecision::Redirect(self.login_location(&original));
        }

        GuardDecision::Proceed
    }

    /// Login path carrying `redirect=<original>` so sign-in can return there.
    #[must_use]
    pub fn login_location(&self, original: &str) -> String {
        let Some(mut url) = placeholder_url(&self.login_path) else {
            return self.login_path.clone();
        };
        url.query_pairs_mut()
            .clear()
            .append_pair(REDIRECT_PARAM, original);
        match url.query() {
            Some(query) => format!("{}?{query}", url.path()),
            None => url.path().to_owned(),
        }
    }

    /// Where to send a user who just signed in (or already is signed in).
    #[must_use]
    pub fn post_login_destination(&self, redirect: Option<&str>) -> String {
        match redirect {
            Some(target) if is_safe_redirect(target) && !self.targets_login(target) => target.to_owned(),
            _ => self.landing_path.clone(),
        }
    }

    fn targets_login(&self, target: &str) -> bool {
        let path = target.split(['?', '#']).next().unwrap_or(target);
        path == self.login_path
    }
}

/// Decoded value of the `redirect` parameter in a raw query string.
#[must_use]
pub fn redirect_param(query: Option<&str>) -> Option<String> {
    let query = query.filter(|q| !q.is_empty())?;
    let url = placeholder_url(&format!("/?{query}"))?;
    url.query_pairs()
        .find(|(key, _)| key == REDIRECT_PARAM)
        .map(|(_, value)| value.into_owned())
}

/// Relative, same-origin paths only. `//host` and `/\host` are read as
/// absolute by browsers and are refused.
#[must_use]
pub fn is_safe_redirect(target: &str) -> bool {
    target.starts_with('/') && !target.starts_with("//") && !target.starts_with("/\\")
}

/// Segment-aware prefix test: `/admin/users` covers `/admin/users/7` but not
/// `/admin/usersettings`.
fn has_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || prefix.ends_with('/'),
        None => false,
    }
}

fn placeholder_url(path_and_query: &str) -> Option<Url> {
    Url::parse(PLACEHOLDER_ORIGIN).ok()?.join(path_and_query).ok()
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
