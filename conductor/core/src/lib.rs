//! Streamchat Conductor - Headless Core of a Streaming Chat Client
//!
//! This crate holds everything a chat client needs except the screen: the
//! conversation state machine, the streaming response decoder, the request
//! orchestrator, and session persistence. It can drive a terminal UI, a
//! one-shot CLI, or run headless under test.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        UI Surfaces                           │
//! │        ┌──────────────┐            ┌──────────────────┐      │
//! │        │     TUI      │            │  --once / tests  │      │
//! │        │  (ratatui)   │            │                  │      │
//! │        └──────┬───────┘            └────────┬─────────┘      │
//! │               └──────────────┬──────────────┘                │
//! │                      SurfaceEvent (up)                       │
//! │                    ConductorMessage (down)                   │
//! └──────────────────────────────┼───────────────────────────────┘
//!                                │
//! ┌──────────────────────────────┼───────────────────────────────┐
//! │                       CONDUCTOR CORE                         │
//! │  ┌───────────────────────────┴────────────────────────────┐  │
//! │  │                       Conductor                        │  │
//! │  │  ┌──────────┐  ┌──────────────┐  ┌──────────────────┐  │  │
//! │  │  │ Session  │  │ SessionStore │  │   Orchestrator   │  │  │
//! │  │  │ (turns)  │  │ (snapshots)  │  │ ─▶ decode_stream │  │  │
//! │  │  └──────────┘  └──────────────┘  │ ─▶ LlmBackend    │  │  │
//! │  │                                  └──────────────────┘  │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`Conductor`]: Owns the session and reacts to surface events
//! - [`Session`]: Ordered turns plus the one assistant turn in flight
//! - [`StreamDecoder`]: Turns `data:` lines into response fragments
//! - [`RequestOrchestrator`]: One cancellable streaming request per turn
//! - [`SessionStore`]: Snapshot storage ([`FileSessionStore`], [`MemorySessionStore`])
//!
//! # Quick Start
//!
//! ```ignore
//! use streamchat_conductor::{
//!     load_config, Conductor, ConductorConfig, FileSessionStore, OpenAiBackend,
//!     SurfaceEvent, SurfaceType,
//! };
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = load_config()?;
//!     let backend = OpenAiBackend::new(
//!         settings.endpoint.clone(),
//!         settings.api_key.clone(),
//!         settings.connect_timeout,
//!     )?;
//!     let store = FileSessionStore::new(&settings.data_dir, &settings.session_key);
//!
//!     let (tx, mut rx) = mpsc::channel(100);
//!     let mut conductor =
//!         Conductor::new(backend, store, ConductorConfig::from_settings(&settings), tx);
//!
//!     conductor
//!         .handle_event(SurfaceEvent::Connected { surface_type: SurfaceType::Headless })
//!         .await?;
//!     conductor
//!         .handle_event(SurfaceEvent::UserMessage { content: "Hello".into() })
//!         .await?;
//!
//!     while conductor.is_busy() {
//!         conductor.next_turn_event().await;
//!         while let Ok(msg) = rx.try_recv() {
//!             // Render message
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # No TUI Dependencies
//!
//! This crate has **zero** dependencies on ratatui, crossterm, or any other
//! UI framework.

#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod conductor;
pub mod config;
pub mod error;
pub mod events;
pub mod messages;
pub mod orchestrator;
pub mod persistence;
pub mod session;
pub mod stream;

#[cfg(test)]
mod test_utils;

// Re-exports for convenience
pub use backend::{ByteStream, ChatRequest, LlmBackend, OpenAiBackend, DEFAULT_ENDPOINT};
pub use conductor::{Conductor, ConductorConfig};
pub use config::{
    default_config_path, default_data_dir, load_config, load_config_from_path,
    load_config_with_env, ChatSettings, ChatToml, ConfigError, ConfigOverrides, ConfigSource,
};
pub use error::BackendError;
pub use events::{SurfaceEvent, SurfaceType};
pub use messages::{
    ConductorMessage, ConductorState, HistoryEntry, Message, MessageId, MessageRole, NotifyLevel,
};
pub use orchestrator::{DispatchHandle, GenerationParams, RequestOrchestrator, TurnEvent};
pub use persistence::{FileSessionStore, MemorySessionStore, SessionStore, StoreError};
pub use session::{PendingTurn, Session, TurnError, TurnState};
pub use stream::{decode_stream, DecodedEvent, StreamDecoder, Utf8StreamDecoder};
