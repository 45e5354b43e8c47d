//! Conductor Messages
//!
//! The conversation data model and the messages sent from the Conductor to
//! UI surfaces.
//!
//! # Design Philosophy
//!
//! The Conductor owns the session. Surfaces are pure renderers that mirror
//! what the Conductor tells them: a user turn was added, a fragment arrived,
//! a stream ended or failed, connectivity changed. A surface never mutates
//! conversation state on its own, so a headless test harness sees exactly
//! what a terminal would.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Messages from Conductor to UI Surface
///
/// These messages tell the UI what to display.
/// The UI should not have any business logic - just render what it's told.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ConductorMessage {
    // ============================================
    // Conversation Messages
    // ============================================
    /// Full history snapshot (sent on connect and after restore)
    History {
        /// Messages in insertion order
        messages: Vec<Message>,
    },

    /// A complete message to display (user turns)
    Message {
        /// The message that was appended
        message: Message,
    },

    /// An empty assistant turn was opened and is awaiting its first token
    StreamStart {
        /// Placeholder message ID
        message_id: MessageId,
        /// Creation time of the placeholder
        timestamp: DateTime<Utc>,
    },

    /// A streamed fragment (partial response)
    Token {
        /// Message ID this fragment belongs to
        message_id: MessageId,
        /// The fragment text
        text: String,
    },

    /// Stream has completed and the turn is finalized
    StreamEnd {
        /// Message ID that completed
        message_id: MessageId,
    },

    /// The user cancelled the stream
    StreamCancelled {
        /// Message ID that was cancelled
        message_id: MessageId,
        /// Whether the partial content was kept in the session
        retained: bool,
    },

    /// Stream failed; the placeholder has been removed from the session
    StreamError {
        /// Message ID that was removed
        message_id: MessageId,
        /// Error description
        error: String,
    },

    // ============================================
    // System Messages
    // ============================================
    /// Connectivity to the completion endpoint changed (or was re-reported)
    Connectivity {
        /// Outcome of the most recent request attempt
        connected: bool,
    },

    /// Conversation was cleared
    Cleared,

    /// System notification
    Notify {
        /// Notification level
        level: NotifyLevel,
        /// Message content
        message: String,
    },

    /// Conductor state change
    State {
        /// The new state
        state: ConductorState,
    },

    /// Request surface to quit
    Quit {
        /// Optional goodbye message
        message: Option<String>,
    },
}

/// Message identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl MessageId {
    /// Generate a new unique message ID
    ///
    /// IDs must stay unique across restarts because restored history keeps
    /// its IDs, so a process-local counter is not enough.
    #[must_use]
    pub fn new() -> Self {
        Self(format!("msg_{}", uuid::Uuid::new_v4().simple()))
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who sent a message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User input
    User,
    /// AI assistant
    Assistant,
}

impl MessageRole {
    /// Label shown next to the message in a surface
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::User => "You",
            Self::Assistant => "AI Assistant",
        }
    }
}

/// One conversational turn
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: MessageId,
    /// Who sent this message (fixed at creation)
    pub role: MessageRole,
    /// Message content
    pub content: String,
    /// When the message was created
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a user message with fixed content
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            role: MessageRole::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create an empty assistant placeholder
    #[must_use]
    pub fn assistant_placeholder() -> Self {
        Self {
            id: MessageId::new(),
            role: MessageRole::Assistant,
            content: String::new(),
            timestamp: Utc::now(),
        }
    }

    /// Reduce to the shape sent upstream
    #[must_use]
    pub fn to_history_entry(&self) -> HistoryEntry {
        HistoryEntry {
            role: self.role,
            content: self.content.clone(),
        }
    }
}

/// A message reduced to what the completion endpoint sees
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Who sent the message
    pub role: MessageRole,
    /// Message text
    pub content: String,
}

impl HistoryEntry {
    /// Create a user entry
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create an assistant entry
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Notification levels
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotifyLevel {
    /// Informational
    Info,
    /// Warning
    Warning,
    /// Error
    Error,
}

/// Conductor operational states
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConductorState {
    /// Ready for input
    Ready,
    /// Request issued, no fragment yet
    Thinking,
    /// Streaming a response
    Responding,
    /// Shutting down
    ShuttingDown,
}

impl ConductorState {
    /// Human-readable description
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Ready => "Ready",
            Self::Thinking => "Thinking...",
            Self::Responding => "Responding...",
            Self::ShuttingDown => "Shutting down...",
        }
    }

    /// Whether a turn is in flight
    #[must_use]
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Thinking | Self::Responding)
    }
}
