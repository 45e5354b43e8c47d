//! Conductor Client
//!
//! Thin wrapper around the Conductor for TUI integration.
//! This client embeds the Conductor directly (no network) and provides
//! a convenient interface for sending events and receiving messages.
//!
//! # Architecture
//!
//! The TUI is a "thin client" - it doesn't contain any business logic.
//! All orchestration happens in the Conductor. The TUI's job is:
//! 1. Convert terminal events to SurfaceEvents
//! 2. Send SurfaceEvents to Conductor
//! 3. Receive ConductorMessages
//! 4. Render display state based on messages

use tokio::sync::mpsc;

use streamchat_conductor::{
    ChatSettings, Conductor, ConductorConfig, ConductorMessage, ConductorState, FileSessionStore,
    LlmBackend, OpenAiBackend, Session, SessionStore, SurfaceEvent, SurfaceType, TurnEvent,
};

/// Capacity of the Conductor -> surface channel
const MESSAGE_BUFFER: usize = 256;

/// Client for communicating with the embedded Conductor
pub struct ConductorClient<B: LlmBackend = OpenAiBackend, S: SessionStore = FileSessionStore> {
    /// The embedded Conductor instance
    conductor: Conductor<B, S>,
    /// Receiver for messages from Conductor
    rx: mpsc::Receiver<ConductorMessage>,
}

impl ConductorClient {
    /// Build a client against the configured endpoint and session file
    pub fn from_settings(settings: &ChatSettings) -> anyhow::Result<Self> {
        let backend = OpenAiBackend::new(
            settings.endpoint.clone(),
            settings.api_key.clone(),
            settings.connect_timeout,
        )?;
        if !backend.has_api_key() {
            tracing::warn!("No API key configured; requests will be sent unauthenticated");
        }

        let store = FileSessionStore::new(&settings.data_dir, &settings.session_key);
        tracing::debug!(path = %store.path().display(), "Session file");

        Ok(Self::new(
            backend,
            store,
            ConductorConfig::from_settings(settings),
        ))
    }
}

impl<B: LlmBackend + 'static, S: SessionStore> ConductorClient<B, S> {
    /// Create a client around an explicit backend and store
    pub fn new(backend: B, store: S, config: ConductorConfig) -> Self {
        let (tx, rx) = mpsc::channel(MESSAGE_BUFFER);
        let conductor = Conductor::new(backend, store, config, tx);
        Self { conductor, rx }
    }

    /// Connect this surface to the Conductor
    pub async fn connect(&mut self, surface_type: SurfaceType) -> anyhow::Result<()> {
        self.conductor
            .handle_event(SurfaceEvent::Connected { surface_type })
            .await
    }

    /// Send a user message to the Conductor
    pub async fn send_message(&mut self, content: String) -> anyhow::Result<()> {
        self.conductor
            .handle_event(SurfaceEvent::UserMessage { content })
            .await
    }

    /// Cancel the response in flight
    pub async fn cancel(&mut self) -> anyhow::Result<()> {
        self.conductor
            .handle_event(SurfaceEvent::CancelRequested)
            .await
    }

    /// Start a fresh conversation
    pub async fn clear(&mut self) -> anyhow::Result<()> {
        self.conductor
            .handle_event(SurfaceEvent::ClearRequested)
            .await
    }

    /// Notify Conductor that user wants to quit
    pub async fn request_quit(&mut self) -> anyhow::Result<()> {
        self.conductor
            .handle_event(SurfaceEvent::QuitRequested)
            .await
    }

    /// Apply queued turn progress (call from a tick)
    pub async fn poll_streaming(&mut self) -> bool {
        self.conductor.poll_streaming().await
    }

    /// Wait for turn progress without applying it
    ///
    /// Cancel-safe, for use as a `select!` branch. Pass the result to
    /// [`Self::apply_turn_event`].
    pub async fn recv_turn_event(&mut self) -> TurnEvent {
        self.conductor.recv_turn_event().await
    }

    /// Apply turn progress received with [`Self::recv_turn_event`]
    pub async fn apply_turn_event(&mut self, event: TurnEvent) {
        self.conductor.apply_turn_event(event).await;
    }

    /// Wait for and apply the next turn event
    pub async fn next_turn_event(&mut self) {
        self.conductor.next_turn_event().await;
    }

    /// Try to receive a message from the Conductor (non-blocking)
    pub fn try_recv(&mut self) -> Option<ConductorMessage> {
        self.rx.try_recv().ok()
    }

    /// Receive all pending messages from the Conductor (non-blocking)
    pub fn recv_all(&mut self) -> Vec<ConductorMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            messages.push(msg);
        }
        messages
    }

    /// Get the current Conductor state
    pub fn state(&self) -> ConductorState {
        self.conductor.state()
    }

    /// Whether a response is in flight
    pub fn is_busy(&self) -> bool {
        self.conductor.is_busy()
    }

    /// Model in use
    pub fn model(&self) -> &str {
        self.conductor.model()
    }

    /// The Conductor's session
    pub fn session(&self) -> &Session {
        self.conductor.session()
    }
}
