//! Request errors
//!
//! Everything that can fail a turn. All of these surface the same way (the
//! placeholder is dropped and connectivity flips to unhealthy); the variants
//! exist so logs and the error banner can say what actually happened.

use thiserror::Error;

/// A request that could not run to completion
#[derive(Debug, Error)]
pub enum BackendError {
    /// The endpoint answered with a non-2xx status
    #[error("API error: {status} - {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, captured for diagnostics
        body: String,
    },

    /// Connection failed before or during streaming
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The stream carried an error payload instead of content
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Request could not be built (bad endpoint, unserializable body)
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl BackendError {
    /// HTTP status, when the endpoint got far enough to send one
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::Upstream(_) | Self::InvalidRequest(_) => None,
        }
    }
}
