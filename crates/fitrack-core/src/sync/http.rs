//! REST implementation of the sync contract.
//!
//! The engine is synchronous, so the adapter owns a current-thread tokio
//! runtime and blocks on each request. Do not call it from inside another
//! tokio runtime.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

use crate::stats::SessionHistory;
use crate::storage::config::SyncConfig;

use super::adapter::{HistorySource, SyncAdapter};
use super::types::SyncError;
use super::wire::{
    AbandonNotice, Ack, CompletionReport, CreateSessionRequest, CreateSessionResponse, PauseNotice,
    ResumeNotice,
};

const SESSIONS_PATH: &str = "workout-sessions";

pub struct HttpSyncAdapter {
    base: Url,
    token: Option<String>,
    client: reqwest::Client,
    runtime: tokio::runtime::Runtime,
}

impl HttpSyncAdapter {
    /// Build an adapter rooted at `base_url`.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the runtime or HTTP client
    /// cannot be built.
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self, SyncError> {
        let mut base = base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base = Url::parse(&base)?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self {
            base,
            token: token.filter(|t| !t.is_empty()),
            client,
            runtime,
        })
    }

    pub fn from_config(config: &SyncConfig) -> Result<Self, SyncError> {
        Self::new(
            &config.base_url,
            config.api_token.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn endpoint(&self, path: &str) -> Result<Url, SyncError> {
        Ok(self.base.join(path)?)
    }

    /// `{base}/workout-sessions/{remote_id}/{action}`, with the id
    /// percent-encoded as a single path segment.
    fn session_endpoint(&self, remote_id: &str, action: &str) -> Result<Url, SyncError> {
        let mut url = self.endpoint(SESSIONS_PATH)?;
        url.path_segments_mut()
            .map_err(|_| SyncError::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .push(remote_id)
            .push(action);
        Ok(url)
    }

    fn post<B, R>(&self, url: Url, body: &B, request_id: Uuid) -> Result<R, SyncError>
    where
        B: Serialize,
        R: DeserializeOwned + Default,
    {
        tracing::debug!(%url, %request_id, "POST");
        let mut request = self
            .client
            .post(url)
            .header("Idempotency-Key", request_id.to_string())
            .json(body);
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }
        let (status, text) = self.runtime.block_on(async {
            let response = request.send().await?;
            let status = response.status();
            let text = response.text().await?;
            Ok::<_, reqwest::Error>((status, text))
        })?;
        decode(status, &text)
    }

    fn get<R>(&self, url: Url) -> Result<R, SyncError>
    where
        R: DeserializeOwned + Default,
    {
        tracing::debug!(%url, "GET");
        let mut request = self.client.get(url);
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }
        let (status, text) = self.runtime.block_on(async {
            let response = request.send().await?;
            let status = response.status();
            let text = response.text().await?;
            Ok::<_, reqwest::Error>((status, text))
        })?;
        decode(status, &text)
    }
}

/// Map a response to a body, treating an empty body as all-default.
fn decode<R>(status: reqwest::StatusCode, text: &str) -> Result<R, SyncError>
where
    R: DeserializeOwned + Default,
{
    if !status.is_success() {
        return Err(SyncError::Rejected {
            status: status.as_u16(),
            message: text.trim().to_string(),
        });
    }
    if text.trim().is_empty() {
        return Ok(R::default());
    }
    Ok(serde_json::from_str(text)?)
}

impl SyncAdapter for HttpSyncAdapter {
    fn create(&self, request: &CreateSessionRequest) -> Result<String, SyncError> {
        let url = self.endpoint(SESSIONS_PATH)?;
        let response: CreateSessionResponse = self.post(url, request, request.request_id)?;
        response.id.ok_or(SyncError::MissingRemoteId)
    }

    fn pause(&self, remote_id: &str, notice: &PauseNotice) -> Result<Ack, SyncError> {
        let url = self.session_endpoint(remote_id, "pause")?;
        self.post(url, notice, notice.request_id)
    }

    fn resume(&self, remote_id: &str, notice: &ResumeNotice) -> Result<Ack, SyncError> {
        let url = self.session_endpoint(remote_id, "resume")?;
        self.post(url, notice, notice.request_id)
    }

    fn complete(&self, remote_id: &str, report: &CompletionReport) -> Result<Ack, SyncError> {
        let url = self.session_endpoint(remote_id, "complete")?;
        self.post(url, report, report.request_id)
    }

    fn abandon(&self, remote_id: &str, notice: &AbandonNotice) -> Result<Ack, SyncError> {
        let url = self.session_endpoint(remote_id, "abandon")?;
        self.post(url, notice, notice.request_id)
    }
}

impl HistorySource for HttpSyncAdapter {
    fn fetch_history(&self) -> Result<SessionHistory, SyncError> {
        let url = self.endpoint(&format!("{SESSIONS_PATH}/history"))?;
        let body: serde_json::Value = self.get(url)?;
        Ok(SessionHistory::from_json(&body))
    }
}
