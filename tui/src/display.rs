//! Display State Types
//!
//! Types that represent the current display state for the TUI.
//! These are derived from ConductorMessages and used for rendering.
//!
//! # Design Philosophy
//!
//! The TUI is a "thin client" - it just renders what the Conductor tells it to.
//! Display state is the bridge between ConductorMessages and rendering.
//! The only state it owns outright is transient feedback (copy confirmation,
//! notifications) that never reaches the session.

use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use streamchat_conductor::{
    ConductorMessage, ConductorState, Message, MessageId, MessageRole, NotifyLevel,
};

/// How long the copy confirmation stays visible
pub const COPIED_FEEDBACK: Duration = Duration::from_secs(2);

/// How long a notification stays visible
pub const NOTIFICATION_TTL: Duration = Duration::from_secs(5);

/// A rendered conversation message
#[derive(Clone, Debug, PartialEq)]
pub struct DisplayMessage {
    /// Unique message ID
    pub id: MessageId,
    /// Who sent this message
    pub role: MessageRole,
    /// The message content
    pub content: String,
    /// When the message was created
    pub timestamp: DateTime<Utc>,
    /// Whether this message is still being streamed
    pub streaming: bool,
}

impl DisplayMessage {
    /// Create a streaming message (content will be appended)
    pub fn streaming(id: MessageId, timestamp: DateTime<Utc>) -> Self {
        Self {
            id,
            role: MessageRole::Assistant,
            content: String::new(),
            timestamp,
            streaming: true,
        }
    }

    /// Append token to streaming message
    pub fn append(&mut self, text: &str) {
        self.content.push_str(text);
    }

    /// Whether this is an assistant turn still waiting for its first token
    pub fn is_waiting(&self) -> bool {
        self.streaming && self.content.is_empty()
    }

    /// Creation time as `HH:MM` in local time
    pub fn time_label(&self) -> String {
        self.timestamp.with_timezone(&Local).format("%H:%M").to_string()
    }
}

impl From<Message> for DisplayMessage {
    fn from(msg: Message) -> Self {
        Self {
            id: msg.id,
            role: msg.role,
            content: msg.content,
            timestamp: msg.timestamp,
            streaming: false,
        }
    }
}

/// A notification to display
#[derive(Clone, Debug)]
pub struct DisplayNotification {
    /// Notification level
    pub level: NotifyLevel,
    /// Message content
    pub message: String,
    /// Time left on screen
    remaining: Duration,
}

/// The full display state for the TUI
#[derive(Debug)]
pub struct DisplayState {
    /// Conversation messages
    pub messages: Vec<DisplayMessage>,
    /// Current streaming message (if any)
    pub streaming_id: Option<MessageId>,
    /// Conductor state
    pub conductor_state: ConductorState,
    /// Outcome of the most recent request
    pub connected: bool,
    /// Error from the most recent failed turn
    pub error: Option<String>,
    /// Pending notification (if any)
    pub notification: Option<DisplayNotification>,
    /// Set once the Conductor asked the surface to quit
    pub quit: bool,
    /// Reply picked for copying; `None` means the latest one
    pub selected: Option<MessageId>,
    /// Time left on the copy confirmation
    copied: Option<Duration>,
}

impl Default for DisplayState {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            streaming_id: None,
            conductor_state: ConductorState::Ready,
            connected: true,
            error: None,
            notification: None,
            quit: false,
            selected: None,
            copied: None,
        }
    }
}

impl DisplayState {
    /// Create a new display state
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a ConductorMessage to update display state
    pub fn apply_message(&mut self, msg: ConductorMessage) {
        match msg {
            // Conversation messages
            ConductorMessage::History { messages } => {
                self.messages = messages.into_iter().map(DisplayMessage::from).collect();
                self.streaming_id = None;
                self.selected = None;
            }
            ConductorMessage::Message { message } => {
                if message.role == MessageRole::User {
                    self.error = None;
                }
                self.messages.push(message.into());
            }
            ConductorMessage::StreamStart {
                message_id,
                timestamp,
            } => {
                self.messages
                    .push(DisplayMessage::streaming(message_id.clone(), timestamp));
                self.streaming_id = Some(message_id);
            }
            ConductorMessage::Token { message_id, text } => {
                match self.find_mut(&message_id) {
                    Some(msg) => msg.append(&text),
                    None => {
                        let mut msg = DisplayMessage::streaming(message_id.clone(), Utc::now());
                        msg.append(&text);
                        self.messages.push(msg);
                        self.streaming_id = Some(message_id);
                    }
                }
            }
            ConductorMessage::StreamEnd { message_id } => {
                if let Some(msg) = self.find_mut(&message_id) {
                    msg.streaming = false;
                }
                self.end_stream(&message_id);
            }
            ConductorMessage::StreamCancelled {
                message_id,
                retained,
            } => {
                if retained {
                    if let Some(msg) = self.find_mut(&message_id) {
                        msg.streaming = false;
                    }
                } else {
                    self.remove(&message_id);
                }
                self.end_stream(&message_id);
            }
            ConductorMessage::StreamError { message_id, error } => {
                self.remove(&message_id);
                self.end_stream(&message_id);
                self.error = Some(error);
            }

            // System messages
            ConductorMessage::Connectivity { connected } => {
                self.connected = connected;
            }
            ConductorMessage::Cleared => {
                self.messages.clear();
                self.streaming_id = None;
                self.error = None;
                self.selected = None;
            }
            ConductorMessage::Notify { level, message } => {
                self.notification = Some(DisplayNotification {
                    level,
                    message,
                    remaining: NOTIFICATION_TTL,
                });
            }
            ConductorMessage::State { state } => {
                self.conductor_state = state;
            }
            ConductorMessage::Quit { message } => {
                if let Some(message) = message {
                    self.notification = Some(DisplayNotification {
                        level: NotifyLevel::Info,
                        message,
                        remaining: NOTIFICATION_TTL,
                    });
                }
                self.quit = true;
            }
        }
    }

    /// Update timers
    pub fn update(&mut self, delta: Duration) {
        self.copied = self
            .copied
            .and_then(|left| left.checked_sub(delta))
            .filter(|left| !left.is_zero());

        let expired = match self.notification.as_mut() {
            Some(n) => match n.remaining.checked_sub(delta) {
                Some(left) if !left.is_zero() => {
                    n.remaining = left;
                    false
                }
                _ => true,
            },
            None => false,
        };
        if expired {
            self.notification = None;
        }
    }

    /// Show the copy confirmation
    pub fn mark_copied(&mut self) {
        self.copied = Some(COPIED_FEEDBACK);
    }

    /// Whether the copy confirmation is visible
    pub fn is_copied(&self) -> bool {
        self.copied.is_some()
    }

    /// Clear the notification
    pub fn clear_notification(&mut self) {
        self.notification = None;
    }

    /// Check if currently streaming
    pub fn is_streaming(&self) -> bool {
        self.streaming_id.is_some()
    }

    /// Content of the most recent non-empty assistant message
    pub fn last_assistant_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::Assistant && !m.content.is_empty())
            .map(|m| m.content.as_str())
    }

    /// Text Ctrl+Y copies: the selected reply, else the latest one
    pub fn copy_text(&self) -> Option<&str> {
        self.selected
            .as_ref()
            .and_then(|id| self.replies().find(|m| &m.id == id))
            .map(|m| m.content.as_str())
            .or_else(|| self.last_assistant_text())
    }

    /// Move the copy selection one reply back in time
    ///
    /// With nothing selected, the latest reply is picked first.
    pub fn select_older(&mut self) {
        let ids: Vec<&MessageId> = self.replies().map(|m| &m.id).collect();
        let next = match self.selected_index(&ids) {
            Some(i) => ids[i.saturating_sub(1)],
            None => match ids.last() {
                Some(id) => *id,
                None => return,
            },
        };
        self.selected = Some(next.clone());
    }

    /// Move the copy selection one reply forward; past the latest it ends
    pub fn select_newer(&mut self) {
        let ids: Vec<&MessageId> = self.replies().map(|m| &m.id).collect();
        let next = self
            .selected_index(&ids)
            .and_then(|i| ids.get(i + 1))
            .map(|id| (*id).clone());
        self.selected = next;
    }

    /// Assistant messages with something to copy, oldest first
    fn replies(&self) -> impl Iterator<Item = &DisplayMessage> {
        self.messages
            .iter()
            .filter(|m| m.role == MessageRole::Assistant && !m.content.is_empty())
    }

    fn selected_index(&self, ids: &[&MessageId]) -> Option<usize> {
        let selected = self.selected.as_ref()?;
        ids.iter().position(|id| *id == selected)
    }

    fn find_mut(&mut self, id: &MessageId) -> Option<&mut DisplayMessage> {
        self.messages.iter_mut().rev().find(|m| &m.id == id)
    }

    fn remove(&mut self, id: &MessageId) {
        self.messages.retain(|m| &m.id != id);
    }

    fn end_stream(&mut self, id: &MessageId) {
        if self.streaming_id.as_ref() == Some(id) {
            self.streaming_id = None;
        }
    }
}
