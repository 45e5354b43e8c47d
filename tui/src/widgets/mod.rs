//! Widgets
//!
//! - [`Conversation`]: the scrollable message list
//! - [`InputBox`]: the bordered compose box with its character counter

pub mod conversation;
pub mod input;

pub use conversation::{Conversation, ConversationState};
pub use input::InputBox;
