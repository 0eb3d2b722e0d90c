use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::evaluation::{Evaluation, EvaluationRequest};
use crate::opts::Opts;
use crate::tone::{ToneDecision, ToneRequest};
use crate::transcript::TranscriptEntry;

/// Backend speaking to the coaching API (`/tone-decide`, `/transcript/{id}/add`,
/// `/voice/evaluate`).
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    api_base: String,
}

impl HttpBackend {
    pub fn new(api_base: impl Into<String>, timeout: Duration) -> Result<Self> {
        let api_base: String = api_base.into();
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_owned(),
        })
    }

    pub fn from_opts(opts: &Opts) -> Result<Self> {
        Self::new(opts.api_base.clone(), opts.http_timeout)
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Fetch a short-lived realtime credential from `{root}/session-token`, where `root` is the
    /// API base without its trailing `/api`.
    ///
    /// Intended for [`crate::Connector`] implementations. An empty credential is
    /// [`Error::MissingToken`].
    pub async fn fetch_session_token(&self) -> Result<String> {
        let root = self
            .api_base
            .strip_suffix("/api")
            .unwrap_or(&self.api_base);
        let url = format!("{root}/session-token");

        let res = self.client.get(&url).send().await?;
        let status = res.status();
        if !status.is_success() {
            return Err(Error::Status {
                endpoint: url,
                status: status.as_u16(),
            });
        }

        let body: Value = res.json().await?;
        let token = body
            .pointer("/client_secret/value")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if token.is_empty() {
            return Err(Error::MissingToken);
        }
        Ok(token.to_owned())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path.trim_start_matches('/'))
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        let res = self.client.post(&url).json(body).send().await?;
        let status = res.status();
        if !status.is_success() {
            return Err(Error::Status {
                endpoint: url,
                status: status.as_u16(),
            });
        }
        debug!(%url, status = status.as_u16(), "collaborator call succeeded");
        Ok(res.json().await?)
    }
}

impl Backend for HttpBackend {
    async fn decide_tone(&self, req: &ToneRequest) -> Result<ToneDecision> {
        self.post("tone-decide", req).await
    }

    async fn mirror_transcript(&self, session_id: &str, entries: &[TranscriptEntry]) -> Result<()> {
        let path = format!("transcript/{session_id}/add");
        for entry in entries {
            let _: Value = self.post(&path, entry).await?;
        }
        Ok(())
    }

    async fn evaluate(&self, req: &EvaluationRequest) -> Result<Evaluation> {
        self.post("voice/evaluate", req).await
    }
}
