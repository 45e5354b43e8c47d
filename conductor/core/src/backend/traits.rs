//! LLM Backend Traits
//!
//! Trait definitions for completion backends. The orchestrator only needs a
//! body it can read chunk by chunk; decoding the events in that body is the
//! stream decoder's job, so a backend stays a thin HTTP wrapper.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use serde::Serialize;

use crate::error::BackendError;
use crate::messages::HistoryEntry;

/// Raw response body, chunk by chunk in arrival order
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, BackendError>> + Send>>;

/// Default bounded output length
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Default sampling temperature
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Upstream request body
///
/// Serializes to `{ model, messages: [{role, content}], stream, max_tokens, temperature }`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChatRequest {
    /// Model identifier
    pub model: String,
    /// Conversation so far, ending with the new user turn
    pub messages: Vec<HistoryEntry>,
    /// Streaming mode (always on for chat turns)
    pub stream: bool,
    /// Maximum tokens in the response
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

impl ChatRequest {
    /// Create a streaming request with default generation parameters
    pub fn new(model: impl Into<String>, messages: Vec<HistoryEntry>) -> Self {
        Self {
            model: model.into(),
            messages,
            stream: true,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    /// Set max tokens
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set temperature
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }
}

/// LLM Backend trait
///
/// Implement this trait to point the orchestrator at a different provider or
/// at a scripted stream in tests.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Get the backend name (e.g., "OpenAI-compatible")
    fn name(&self) -> &str;

    /// Issue the request and return the response body as a byte stream
    ///
    /// Must fail with [`BackendError::Status`] when the endpoint answers
    /// with a non-2xx status.
    async fn open_stream(&self, request: &ChatRequest) -> Result<ByteStream, BackendError>;
}
