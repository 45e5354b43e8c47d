//! Streamchat TUI - Terminal surface for the streamchat conductor
//!
//! A full-screen chat client: the reply streams in as it is generated,
//! the conversation survives restarts, and the latest reply can be copied
//! to the clipboard over OSC 52.
//!
//! # Architecture
//!
//! - **ConductorClient**: Embeds the headless Conductor
//! - **DisplayState**: Mirrors what the Conductor reports
//! - **Widgets**: Message list and compose box
//! - **App**: Event loop tying keys, turn progress and rendering together

pub mod app;
pub mod clipboard;
pub mod conductor_client;
pub mod display;
pub mod theme;
pub mod widgets;

pub use app::{map_key, App, KeyAction};
pub use conductor_client::ConductorClient;
pub use display::{DisplayMessage, DisplayState};
