//! Surface Events
//!
//! Events sent from UI surfaces to the Conductor.
//!
//! Surfaces report what the user did; they don't decide what it means.
//! Whether a submitted message starts a turn, or a cancel has anything to
//! cancel, is the Conductor's call.

use serde::{Deserialize, Serialize};

/// Kind of surface driving the Conductor
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurfaceType {
    /// Full-screen terminal UI
    Tui,
    /// Single-shot command line mode
    Headless,
    /// Test harness
    Test,
}

/// Events from UI Surface to Conductor
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurfaceEvent {
    /// Surface connected and wants the current state
    Connected {
        /// Surface type identifier
        surface_type: SurfaceType,
    },

    /// User submitted a message
    UserMessage {
        /// Raw text as typed (trimmed by the session)
        content: String,
    },

    /// User asked to abort the in-flight response
    CancelRequested,

    /// User asked to clear the conversation
    ClearRequested,

    /// User wants to quit
    QuitRequested,
}
