//! Scoring API client.
//!
//! DESIGN
//! ======
//! Public endpoints (analyze, get by id, lookup by email) go through a plain
//! `reqwest::Client`. Admin endpoints go through an [`AdminAccess`], which is
//! either a long-lived [`SessionService`] (refreshes on its own) or a
//! [`BearerAccess`] built from the `access_token` cookie of an incoming page
//! request (stateless, no refresh).

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use futures::future::{AbortHandle, Aborted, abortable};
use reqwest::{Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use session::{SessionConfig, SessionService};

use crate::error::ScoresError;
use crate::export::sort_email_matches;
use crate::types::{AnalyzeResponse, EmailMatch, Score, ScoreInput, ScoreRecord, Stats};

// =============================================================================
// ADMIN ACCESS
// =============================================================================

/// How admin requests are authorized.
#[async_trait::async_trait]
pub trait AdminAccess: Send + Sync {
    /// `GET url` with admin credentials attached.
    ///
    /// # Errors
    ///
    /// Transport failures, or an auth failure of the underlying session.
    async fn admin_get(&self, url: &str) -> Result<Response, ScoresError>;
}

#[async_trait::async_trait]
impl AdminAccess for SessionService {
    async fn admin_get(&self, url: &str) -> Result<Response, ScoresError> {
        Ok(self.get(url).await?)
    }
}

/// A bare bearer token. A 401 is final.
pub struct BearerAccess {
    http: reqwest::Client,
    token: String,
}

impl BearerAccess {
    #[must_use]
    pub fn new(http: reqwest::Client, token: impl Into<String>) -> Self {
        Self { http, token: token.into() }
    }
}

#[async_trait::async_trait]
impl AdminAccess for BearerAccess {
    async fn admin_get(&self, url: &str) -> Result<Response, ScoresError> {
        Ok(self.http.get(url).bearer_auth(&self.token).send().await?)
    }
}

// =============================================================================
// CLIENT
// =============================================================================

#[derive(Clone)]
pub struct ScoresClient {
    http: reqwest::Client,
    api_url: Url,
}

impl ScoresClient {
    /// # Errors
    ///
    /// Returns an error if `api_url` is not absolute or the HTTP client
    /// cannot be built.
    pub fn new(api_url: &str, request_timeout: Duration, connect_timeout: Duration) -> Result<Self, ScoresError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| ScoresError::HttpClientBuild(e.to_string()))?;
        Self::with_http(http, api_url)
    }

    /// Same API and timeouts as a session.
    ///
    /// # Errors
    ///
    /// See [`Self::new`].
    pub fn from_config(config: &SessionConfig) -> Result<Self, ScoresError> {
        Self::new(&config.api_url, config.request_timeout, config.connect_timeout)
    }

    /// # Errors
    ///
    /// Returns an error if `api_url` is not an absolute URL.
    pub fn with_http(http: reqwest::Client, api_url: &str) -> Result<Self, ScoresError> {
        let api_url = Url::parse(api_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| ScoresError::HttpClientBuild(format!("invalid API URL: {api_url}")))?;
        Ok(Self { http, api_url })
    }

    #[must_use]
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Submit salary data; the API answers with the new record's id.
    ///
    /// # Errors
    ///
    /// Network, status or decode failures.
    pub async fn analyze(&self, input: &ScoreInput) -> Result<AnalyzeResponse, ScoresError> {
        let url = self.endpoint(&["scores", "analyze"]);
        let response = self.http.post(url).json(input).send().await?;
        let created: AnalyzeResponse = read_json(response).await?;
        tracing::info!(id = %created.id, "score submitted");
        Ok(created)
    }

    /// # Errors
    ///
    /// `NotFound` on 404, otherwise network, status or decode failures.
    pub async fn get_by_id(&self, id: &str) -> Result<ScoreRecord, ScoresError> {
        let url = self.endpoint(&["scores", "analyze", id]);
        let response = self.http.get(url).send().await?;
        let body: serde_json::Value = read_json(response).await?;
        ScoreRecord::from_value(body).map_err(|e| ScoresError::Decode(e.to_string()))
    }

    /// Prior submissions for `email`, highest salary first.
    ///
    /// # Errors
    ///
    /// Network, status or decode failures.
    pub async fn by_email(&self, email: &str) -> Result<Vec<EmailMatch>, ScoresError> {
        let mut url = self.endpoint(&["scores", "email"]);
        url.query_pairs_mut().append_pair("email", email);
        let response = self.http.get(url).send().await?;
        let mut matches: Vec<EmailMatch> = read_json(response).await?;
        sort_email_matches(&mut matches);
        Ok(matches)
    }

    /// # Errors
    ///
    /// `Unauthorized` when the API refuses the credentials, `Auth` when the
    /// session could not be refreshed, otherwise network/status/decode.
    pub async fn all(&self, access: &dyn AdminAccess) -> Result<Vec<Score>, ScoresError> {
        let response = access.admin_get(self.endpoint(&["scores", "all"]).as_str()).await?;
        read_json(response).await
    }

    /// # Errors
    ///
    /// See [`Self::all`].
    pub async fn stats(&self, access: &dyn AdminAccess) -> Result<Stats, ScoresError> {
        let response = access.admin_get(self.endpoint(&["scores", "stats"]).as_str()).await?;
        read_json(response).await
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.api_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ScoresError> {
    let status = response.status();
    match status {
        StatusCode::NOT_FOUND => return Err(ScoresError::NotFound),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => return Err(ScoresError::Unauthorized),
        s if !s.is_success() => {
            tracing::warn!(status = s.as_u16(), url = %response.url(), "scoring API error");
            return Err(ScoresError::Status { status: s.as_u16() });
        }
        _ => {}
    }
    response
        .json::<T>()
        .await
        .map_err(|e| ScoresError::Decode(e.to_string()))
}

// =============================================================================
// LOADER
// =============================================================================

/// Loads one record at a time: starting a new load (or calling
/// [`Self::cancel`]) aborts the one in flight, which then resolves to
/// `Cancelled`.
pub struct ScoreLoader {
    client: ScoresClient,
    inflight: Mutex<Option<AbortHandle>>,
}

impl ScoreLoader {
    #[must_use]
    pub fn new(client: ScoresClient) -> Self {
        Self { client, inflight: Mutex::new(None) }
    }

    /// # Errors
    ///
    /// `Cancelled` if superseded, otherwise see [`ScoresClient::get_by_id`].
    pub async fn load(&self, id: &str) -> Result<ScoreRecord, ScoresError> {
        let (task, handle) = abortable(self.client.get_by_id(id));
        let previous = self
            .inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
        match task.await {
            Ok(outcome) => outcome,
            Err(Aborted) => {
                tracing::debug!(%id, "score load superseded");
                Err(ScoresError::Cancelled)
            }
        }
    }

    pub fn cancel(&self) {
        let handle = self
            .inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
