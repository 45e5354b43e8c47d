//! Session Management
//!
//! The conversation state machine. A session is the ordered list of turns
//! plus the bookkeeping for the one assistant turn that may be in flight.
//!
//! # Turn lifecycle
//!
//! ```text
//! Idle ──submit──▶ AwaitingFirstToken ──fragment──▶ Streaming ──finalize──▶ Finalized
//!                        │    │                        │  │
//!                        │    └────────cancel──────────┼──┴──▶ Cancelled
//!                        └────────────fail─────────────┴─────▶ Failed (placeholder removed)
//! ```
//!
//! Only the in-progress turn accepts fragments. Once a turn settles, every
//! later operation naming it is rejected with [`TurnError::NotInProgress`].

use thiserror::Error;

use crate::messages::{HistoryEntry, Message, MessageId, MessageRole};

/// State of the most recent turn
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnState {
    /// No turn has been issued yet (or the session was cleared)
    Idle,
    /// Request issued, no non-empty fragment yet
    AwaitingFirstToken,
    /// At least one fragment applied
    Streaming,
    /// Stream ran to completion
    Finalized,
    /// Request failed and the placeholder was removed
    Failed,
    /// User aborted the turn
    Cancelled,
}

impl TurnState {
    /// Whether the turn can still be mutated
    #[must_use]
    pub fn is_in_progress(&self) -> bool {
        matches!(self, Self::AwaitingFirstToken | Self::Streaming)
    }
}

/// Rejected turn operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TurnError {
    /// The named turn is not the one currently in progress
    #[error("turn {0} is not in progress")]
    NotInProgress(MessageId),
}

/// A turn accepted by [`Session::submit_user_message`], ready for dispatch
#[derive(Clone, Debug, PartialEq)]
pub struct PendingTurn {
    /// ID of the user message that was appended
    pub user_id: MessageId,
    /// ID of the empty assistant placeholder
    pub assistant_id: MessageId,
    /// Prior history plus the new user turn, in upstream shape
    pub history: Vec<HistoryEntry>,
}

/// A conversation session
#[derive(Clone, Debug)]
pub struct Session {
    /// Conversation history, insertion order
    messages: Vec<Message>,
    /// Assistant turn currently being extended
    in_progress: Option<MessageId>,
    /// State of the most recent turn
    turn_state: TurnState,
    /// Outcome of the most recent request attempt
    connected: bool,
    /// Error surfaced by the last failed turn
    last_error: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Create an empty session
    #[must_use]
    pub fn new() -> Self {
        Self::restore(Vec::new())
    }

    /// Create a session from persisted history
    ///
    /// An empty assistant turn can only be left behind by a process that
    /// exited mid-request; it is dropped rather than replayed upstream.
    #[must_use]
    pub fn restore(mut messages: Vec<Message>) -> Self {
        messages.retain(|m| !(m.role == MessageRole::Assistant && m.content.is_empty()));
        Self {
            messages,
            in_progress: None,
            turn_state: TurnState::Idle,
            connected: true,
            last_error: None,
        }
    }

    /// Start a turn from user input
    ///
    /// Returns `None` without touching state if the text is blank or a turn
    /// is already in flight.
    pub fn submit_user_message(&mut self, text: &str) -> Option<PendingTurn> {
        let text = text.trim();
        if text.is_empty() || self.in_progress.is_some() {
            return None;
        }

        let mut history: Vec<HistoryEntry> =
            self.messages.iter().map(Message::to_history_entry).collect();
        history.push(HistoryEntry::user(text));

        let user = Message::user(text);
        let user_id = user.id.clone();
        self.messages.push(user);

        let placeholder = Message::assistant_placeholder();
        let assistant_id = placeholder.id.clone();
        self.messages.push(placeholder);

        self.in_progress = Some(assistant_id.clone());
        self.turn_state = TurnState::AwaitingFirstToken;
        self.last_error = None;

        Some(PendingTurn {
            user_id,
            assistant_id,
            history,
        })
    }

    /// Append a streamed fragment to the in-progress turn
    pub fn apply_fragment(&mut self, turn_id: &MessageId, text: &str) -> Result<(), TurnError> {
        self.ensure_in_progress(turn_id)?;
        if text.is_empty() {
            return Ok(());
        }

        let msg = self
            .messages
            .iter_mut()
            .find(|m| &m.id == turn_id)
            .ok_or_else(|| TurnError::NotInProgress(turn_id.clone()))?;
        msg.content.push_str(text);
        self.turn_state = TurnState::Streaming;
        Ok(())
    }

    /// Mark the in-progress turn as complete
    pub fn finalize_turn(&mut self, turn_id: &MessageId) -> Result<(), TurnError> {
        self.ensure_in_progress(turn_id)?;
        self.in_progress = None;
        self.turn_state = TurnState::Finalized;
        self.connected = true;
        Ok(())
    }

    /// Drop the in-progress turn and surface `reason`
    ///
    /// A failed attempt leaves no residue: the message count returns to what
    /// it was before the placeholder was added.
    pub fn fail_turn(&mut self, turn_id: &MessageId, reason: impl Into<String>) -> Result<(), TurnError> {
        self.ensure_in_progress(turn_id)?;
        self.messages.retain(|m| &m.id != turn_id);
        self.in_progress = None;
        self.turn_state = TurnState::Failed;
        self.connected = false;
        self.last_error = Some(reason.into());
        Ok(())
    }

    /// Stop mutating the in-progress turn at the user's request
    ///
    /// Streamed content stays. A placeholder that never received text is
    /// dropped so it isn't replayed upstream as an empty assistant turn.
    /// Returns whether the message was kept.
    pub fn cancel_turn(&mut self, turn_id: &MessageId) -> Result<bool, TurnError> {
        self.ensure_in_progress(turn_id)?;
        let retained = self
            .get(turn_id)
            .is_some_and(|m| !m.content.is_empty());
        if !retained {
            self.messages.retain(|m| &m.id != turn_id);
        }
        self.in_progress = None;
        self.turn_state = TurnState::Cancelled;
        Ok(retained)
    }

    /// Reset to an empty conversation
    ///
    /// The surfaced error goes with it. Connectivity is left alone.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.in_progress = None;
        self.turn_state = TurnState::Idle;
        self.last_error = None;
    }

    fn ensure_in_progress(&self, turn_id: &MessageId) -> Result<(), TurnError> {
        if self.in_progress.as_ref() == Some(turn_id) {
            Ok(())
        } else {
            Err(TurnError::NotInProgress(turn_id.clone()))
        }
    }

    /// All messages in insertion order
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the session has no messages
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Get message by ID
    #[must_use]
    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| &m.id == id)
    }

    /// ID of the in-progress assistant turn
    #[must_use]
    pub fn in_progress(&self) -> Option<&MessageId> {
        self.in_progress.as_ref()
    }

    /// State of the most recent turn
    #[must_use]
    pub fn turn_state(&self) -> TurnState {
        self.turn_state
    }

    /// Outcome of the most recent request attempt
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Error from the last failed turn, cleared on the next submission
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Most recent assistant message with content
    #[must_use]
    pub fn last_assistant_message(&self) -> Option<&Message> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::Assistant && !m.content.is_empty())
    }
}
