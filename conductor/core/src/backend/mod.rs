//! LLM Backend Integration
//!
//! Access to completion endpoints through a common trait.
//!
//! # Available Backends
//!
//! - **OpenAI-compatible**: Groq (default), OpenAI, or any gateway speaking
//!   the same streamed chat-completions protocol
//!
//! # Usage
//!
//! ```ignore
//! use streamchat_conductor::backend::{ChatRequest, LlmBackend, OpenAiBackend};
//!
//! let backend = OpenAiBackend::new(endpoint, api_key, connect_timeout)?;
//! let request = ChatRequest::new("llama-3.3-70b-versatile", history);
//! let body = backend.open_stream(&request).await?;
//! ```

mod openai;
mod traits;

pub use openai::{OpenAiBackend, DEFAULT_ENDPOINT};
pub use traits::{ByteStream, ChatRequest, LlmBackend, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};
