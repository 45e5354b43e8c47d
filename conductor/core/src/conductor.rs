//! Conductor - The Orchestration Core
//!
//! The Conductor owns the conversation. It ties together:
//! - the [`Session`] state machine
//! - the [`SessionStore`] that keeps a snapshot across restarts
//! - the [`RequestOrchestrator`] that streams completions
//! - the channel to the UI surface
//!
//! # Design Philosophy
//!
//! The Conductor is UI-agnostic. It doesn't know or care whether it's talking
//! to a terminal, a one-shot CLI, or a test harness. It communicates through:
//! - `ConductorMessage`: what the surface should display
//! - `SurfaceEvent`: what the user did
//!
//! Turn progress arrives on an internal channel as [`TurnEvent`]s. The
//! surface loop drives it with [`Conductor::next_turn_event`] (or
//! [`Conductor::poll_streaming`] from a tick). Events for a turn that is no
//! longer in progress are dropped, so a cancelled or cleared turn can never
//! be written to again.

use tokio::sync::mpsc;

use crate::backend::{LlmBackend, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};
use crate::config::{ChatSettings, DEFAULT_MODEL};
use crate::events::{SurfaceEvent, SurfaceType};
use crate::messages::{ConductorMessage, ConductorState, MessageId, NotifyLevel};
use crate::orchestrator::{DispatchHandle, GenerationParams, RequestOrchestrator, TurnEvent};
use crate::persistence::SessionStore;
use crate::session::{Session, TurnState};

/// Most surface messages applying one turn event can produce
/// (a terminal event sends three, plus a save warning)
const MESSAGES_PER_TURN_EVENT: usize = 4;

/// Conductor configuration
#[derive(Clone, Debug, PartialEq)]
pub struct ConductorConfig {
    /// Model to request
    pub model: String,
    /// Maximum tokens per response
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Capacity of the turn event channel
    pub turn_buffer: usize,
}

impl Default for ConductorConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            turn_buffer: 256,
        }
    }
}

impl ConductorConfig {
    /// Take generation settings from resolved configuration
    #[must_use]
    pub fn from_settings(settings: &ChatSettings) -> Self {
        Self {
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            ..Self::default()
        }
    }
}

/// The Conductor - headless orchestration core
pub struct Conductor<B: LlmBackend, S: SessionStore> {
    /// Configuration
    config: ConductorConfig,
    /// Issues completion requests
    orchestrator: RequestOrchestrator<B>,
    /// Snapshot storage
    store: S,
    /// Current session
    session: Session,
    /// Current operational state
    state: ConductorState,
    /// Channel to send messages to UI surface
    tx: mpsc::Sender<ConductorMessage>,
    /// Connected surface
    surface_type: Option<SurfaceType>,
    /// The one request that may be in flight
    dispatch: Option<DispatchHandle>,
    /// Turn progress from dispatched requests
    turn_tx: mpsc::Sender<TurnEvent>,
    turn_rx: mpsc::Receiver<TurnEvent>,
}

impl<B: LlmBackend + 'static, S: SessionStore> Conductor<B, S> {
    /// Create a Conductor, restoring whatever `store` holds
    pub fn new(
        backend: B,
        store: S,
        config: ConductorConfig,
        tx: mpsc::Sender<ConductorMessage>,
    ) -> Self {
        let session = Session::restore(store.load());
        let params = GenerationParams {
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        };
        let orchestrator = RequestOrchestrator::new(backend, params);
        let (turn_tx, turn_rx) = mpsc::channel(config.turn_buffer.max(1));

        tracing::info!(
            model = %config.model,
            backend = orchestrator.backend_name(),
            restored = session.len(),
            "Conductor created"
        );

        Self {
            config,
            orchestrator,
            store,
            session,
            state: ConductorState::Ready,
            tx,
            surface_type: None,
            dispatch: None,
            turn_tx,
            turn_rx,
        }
    }

    /// Current session
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Get current state
    pub fn state(&self) -> ConductorState {
        self.state
    }

    /// Whether a turn is in flight
    pub fn is_busy(&self) -> bool {
        self.session.in_progress().is_some()
    }

    /// Model in use
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Connected surface, if any
    pub fn surface_type(&self) -> Option<SurfaceType> {
        self.surface_type
    }

    /// Handle an event from the UI surface
    pub async fn handle_event(&mut self, event: SurfaceEvent) -> anyhow::Result<()> {
        match event {
            SurfaceEvent::Connected { surface_type } => {
                tracing::debug!(?surface_type, "Surface connected");
                self.surface_type = Some(surface_type);

                self.send(ConductorMessage::History {
                    messages: self.session.messages().to_vec(),
                })
                .await;
                self.send(ConductorMessage::Connectivity {
                    connected: self.session.is_connected(),
                })
                .await;
                self.send(ConductorMessage::State { state: self.state })
                    .await;
            }

            SurfaceEvent::UserMessage { content } => {
                self.handle_user_message(&content).await;
            }

            SurfaceEvent::CancelRequested => {
                self.cancel_in_flight().await;
            }

            SurfaceEvent::ClearRequested => {
                self.clear().await;
            }

            SurfaceEvent::QuitRequested => {
                self.shutdown().await?;
            }
        }

        Ok(())
    }

    /// Start a turn
    async fn handle_user_message(&mut self, content: &str) {
        let Some(pending) = self.session.submit_user_message(content) else {
            tracing::debug!(busy = self.is_busy(), "Ignoring user message");
            return;
        };

        if let Some(user) = self.session.get(&pending.user_id).cloned() {
            self.send(ConductorMessage::Message { message: user }).await;
        }
        let timestamp = self
            .session
            .get(&pending.assistant_id)
            .map(|m| m.timestamp)
            .unwrap_or_else(chrono::Utc::now);
        self.send(ConductorMessage::StreamStart {
            message_id: pending.assistant_id.clone(),
            timestamp,
        })
        .await;
        self.set_state(ConductorState::Thinking).await;
        self.persist().await;

        let handle = self.orchestrator.dispatch(
            pending.assistant_id,
            pending.history,
            self.turn_tx.clone(),
        );
        self.dispatch = Some(handle);
    }

    /// Wait for the next turn event and apply it
    ///
    /// Pends forever while no request is in flight, so it is safe to use as
    /// a `select!` branch.
    pub async fn next_turn_event(&mut self) {
        let event = self.recv_turn_event().await;
        self.apply_turn_event(event).await;
    }

    /// Wait for the next turn event without applying it
    pub async fn recv_turn_event(&mut self) -> TurnEvent {
        match self.turn_rx.recv().await {
            Some(event) => event,
            // The Conductor holds a sender, so the channel never closes
            None => std::future::pending().await,
        }
    }

    /// Apply queued turn events without waiting
    ///
    /// Stops while the surface channel lacks room for one more event's
    /// messages, leaving the rest queued for the next call. The caller is the
    /// one draining the surface channel, so waiting on it here would never end.
    ///
    /// Returns true if there was activity.
    pub async fn poll_streaming(&mut self) -> bool {
        let mut applied = false;
        while self.tx.capacity() >= MESSAGES_PER_TURN_EVENT {
            let Ok(event) = self.turn_rx.try_recv() else {
                break;
            };
            self.apply_turn_event(event).await;
            applied = true;
        }
        applied
    }

    /// Apply one turn event to the session
    pub async fn apply_turn_event(&mut self, event: TurnEvent) {
        if self.session.in_progress() != Some(event.turn_id()) {
            tracing::trace!(turn_id = %event.turn_id(), "Dropping event for settled turn");
            if event.is_terminal() {
                self.release_dispatch(event.turn_id());
            }
            return;
        }

        match event {
            TurnEvent::Fragment { turn_id, text } => {
                let was_waiting = self.session.turn_state() == TurnState::AwaitingFirstToken;
                if let Err(e) = self.session.apply_fragment(&turn_id, &text) {
                    tracing::debug!(error = %e, "Fragment rejected");
                    return;
                }
                if text.is_empty() {
                    return;
                }
                if was_waiting {
                    self.set_state(ConductorState::Responding).await;
                }
                self.send(ConductorMessage::Token {
                    message_id: turn_id,
                    text,
                })
                .await;
                self.persist().await;
            }

            TurnEvent::Completed { turn_id } => {
                if let Err(e) = self.session.finalize_turn(&turn_id) {
                    tracing::debug!(error = %e, "Completion rejected");
                    return;
                }
                self.release_dispatch(&turn_id);
                self.send(ConductorMessage::StreamEnd {
                    message_id: turn_id,
                })
                .await;
                self.send(ConductorMessage::Connectivity { connected: true })
                    .await;
                self.set_state(ConductorState::Ready).await;
                self.persist().await;
            }

            TurnEvent::Failed { turn_id, reason } => {
                if let Err(e) = self.session.fail_turn(&turn_id, reason.clone()) {
                    tracing::debug!(error = %e, "Failure rejected");
                    return;
                }
                self.release_dispatch(&turn_id);
                self.send(ConductorMessage::StreamError {
                    message_id: turn_id,
                    error: reason,
                })
                .await;
                self.send(ConductorMessage::Connectivity { connected: false })
                    .await;
                self.set_state(ConductorState::Ready).await;
                self.persist().await;
            }

            TurnEvent::Cancelled { turn_id } => {
                // Cancellation the Conductor didn't ask for
                self.settle_cancelled(&turn_id).await;
            }
        }
    }

    /// Cancel the in-flight turn, if any
    async fn cancel_in_flight(&mut self) {
        let Some(turn_id) = self.session.in_progress().cloned() else {
            return;
        };
        if let Some(ref handle) = self.dispatch {
            handle.cancel();
        }
        self.settle_cancelled(&turn_id).await;
    }

    async fn settle_cancelled(&mut self, turn_id: &MessageId) {
        let retained = match self.session.cancel_turn(turn_id) {
            Ok(retained) => retained,
            Err(e) => {
                tracing::debug!(error = %e, "Cancel rejected");
                return;
            }
        };
        tracing::info!(turn_id = %turn_id, retained, "Turn cancelled");

        self.send(ConductorMessage::StreamCancelled {
            message_id: turn_id.clone(),
            retained,
        })
        .await;
        self.set_state(ConductorState::Ready).await;
        self.persist().await;
    }

    /// Reset the conversation and erase the snapshot
    async fn clear(&mut self) {
        if let Some(handle) = self.dispatch.take() {
            handle.cancel();
        }
        self.session.clear();

        if let Err(e) = self.store.clear() {
            tracing::warn!(error = %e, "Failed to erase saved session");
            self.notify(
                NotifyLevel::Warning,
                &format!("Could not erase saved conversation: {e}"),
            )
            .await;
        }

        self.send(ConductorMessage::Cleared).await;
        if self.state != ConductorState::Ready {
            self.set_state(ConductorState::Ready).await;
        }
    }

    /// Shut down the Conductor
    pub async fn shutdown(&mut self) -> anyhow::Result<()> {
        if let Some(turn_id) = self.session.in_progress().cloned() {
            if let Some(ref handle) = self.dispatch {
                handle.cancel();
            }
            // Keep whatever streamed so far, same as a user cancel
            if self.session.cancel_turn(&turn_id).is_ok() {
                self.persist().await;
            }
        }
        self.dispatch = None;

        self.set_state(ConductorState::ShuttingDown).await;
        self.send(ConductorMessage::Quit { message: None }).await;
        Ok(())
    }

    fn release_dispatch(&mut self, turn_id: &MessageId) {
        if self
            .dispatch
            .as_ref()
            .is_some_and(|h| h.turn_id() == turn_id)
        {
            self.dispatch = None;
        }
    }

    /// Save the session; failures become a warning
    async fn persist(&mut self) {
        if let Err(e) = self.store.save(self.session.messages()) {
            tracing::warn!(error = %e, "Failed to save session");
            self.notify(
                NotifyLevel::Warning,
                &format!("Could not save conversation: {e}"),
            )
            .await;
        }
    }

    /// Set state and notify UI
    async fn set_state(&mut self, state: ConductorState) {
        self.state = state;
        self.send(ConductorMessage::State { state }).await;
    }

    /// Send notification
    async fn notify(&self, level: NotifyLevel, message: &str) {
        self.send(ConductorMessage::Notify {
            level,
            message: message.to_string(),
        })
        .await;
    }

    /// Send a message to the UI surface
    async fn send(&self, msg: ConductorMessage) {
        if let Err(e) = self.tx.send(msg).await {
            tracing::warn!("Failed to send message to surface: {}", e);
        }
    }
}
