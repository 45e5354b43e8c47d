//! OpenAI-compatible Backend
//!
//! Streams chat completions from any endpoint that speaks the OpenAI
//! `/chat/completions` protocol (Groq, OpenAI, local gateways).
//!
//! # Wire format
//!
//! - Request: `POST <endpoint>` with a JSON [`ChatRequest`] body and an
//!   optional `Authorization: Bearer <key>` header
//! - Response: `text/event-stream`, one `data: <json>` line per delta,
//!   terminated by `data: [DONE]`

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;

use super::traits::{ByteStream, ChatRequest, LlmBackend};
use crate::error::BackendError;

/// Default completion endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";

/// OpenAI-compatible backend client
#[derive(Clone)]
pub struct OpenAiBackend {
    /// Full URL of the chat completions endpoint
    endpoint: String,
    /// Bearer token, if the endpoint needs one
    api_key: Option<String>,
    /// HTTP client
    http_client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiBackend")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl OpenAiBackend {
    /// Create a new backend
    ///
    /// Only connection establishment is bounded by `connect_timeout`; a
    /// stalled body blocks until the transport gives up.
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        connect_timeout: Duration,
    ) -> Result<Self, BackendError> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()?;

        Ok(Self {
            endpoint: endpoint.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            http_client,
        })
    }

    /// Endpoint this backend posts to
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Whether an API key will be sent
    #[must_use]
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl LlmBackend for OpenAiBackend {
    fn name(&self) -> &'static str {
        "OpenAI-compatible"
    }

    async fn open_stream(&self, request: &ChatRequest) -> Result<ByteStream, BackendError> {
        let url = reqwest::Url::parse(&self.endpoint)
            .map_err(|e| BackendError::InvalidRequest(format!("{}: {e}", self.endpoint)))?;

        let mut builder = self.http_client.post(url).json(request);
        if let Some(ref key) = self.api_key {
            builder = builder.bearer_auth(key);
        }

        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            "Sending completion request"
        );

        let response = builder.send().await?;

        // Check for HTTP errors
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status, body = %body, "Completion endpoint returned an error");
            return Err(BackendError::Status { status, body });
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(BackendError::from));
        Ok(Box::pin(stream))
    }
}
