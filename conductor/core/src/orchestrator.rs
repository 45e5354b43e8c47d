//! Request Orchestrator
//!
//! Issues one completion request per turn and reports what happens to it.
//!
//! # Design
//!
//! Each [`dispatch`](RequestOrchestrator::dispatch) spawns a task that owns
//! the request from start to finish and reports through a channel:
//!
//! ```text
//! dispatch ──▶ open_stream ──▶ decode_stream ──▶ TurnEvent::Fragment ... ──▶ terminal event
//!                                                                      (Completed | Failed | Cancelled)
//! ```
//!
//! Fragments are sent in the order the body delivers them, and exactly one
//! terminal event follows. The caller gets a [`DispatchHandle`] per request,
//! so cancelling one request can never reach a newer one.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::backend::{ChatRequest, LlmBackend, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};
use crate::error::BackendError;
use crate::messages::{HistoryEntry, MessageId};
use crate::stream::{decode_stream, DecodedEvent};

/// Progress of a dispatched turn
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TurnEvent {
    /// Next piece of assistant text
    Fragment {
        /// Turn this fragment belongs to
        turn_id: MessageId,
        /// Fragment text
        text: String,
    },
    /// Body exhausted normally
    Completed {
        /// Turn that completed
        turn_id: MessageId,
    },
    /// Request failed outright or the connection dropped
    Failed {
        /// Turn that failed
        turn_id: MessageId,
        /// Human-readable reason
        reason: String,
    },
    /// Stopped by [`DispatchHandle::cancel`]
    Cancelled {
        /// Turn that was cancelled
        turn_id: MessageId,
    },
}

impl TurnEvent {
    /// Turn this event belongs to
    #[must_use]
    pub fn turn_id(&self) -> &MessageId {
        match self {
            Self::Fragment { turn_id, .. }
            | Self::Completed { turn_id }
            | Self::Failed { turn_id, .. }
            | Self::Cancelled { turn_id } => turn_id,
        }
    }

    /// Whether this is the last event for its turn
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Fragment { .. })
    }
}

/// How a turn's task ended
enum TurnOutcome {
    Completed,
    Failed(String),
    Cancelled,
}

/// Fixed generation parameters sent with every request
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationParams {
    /// Model identifier
    pub model: String,
    /// Bounded output length
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

impl GenerationParams {
    /// Parameters for `model` with default limits
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

/// Handle to one in-flight request
#[derive(Debug)]
pub struct DispatchHandle {
    turn_id: MessageId,
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl DispatchHandle {
    /// Turn this request serves
    #[must_use]
    pub fn turn_id(&self) -> &MessageId {
        &self.turn_id
    }

    /// Abort the request; it settles with [`TurnEvent::Cancelled`]
    ///
    /// Fragments already queued in the channel may still be delivered.
    pub fn cancel(&self) {
        if !self.token.is_cancelled() {
            tracing::debug!(turn_id = %self.turn_id, "Cancelling dispatch");
        }
        self.token.cancel();
    }

    /// Whether cancellation was requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Whether the request task has settled
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Issues requests against a backend
pub struct RequestOrchestrator<B: LlmBackend> {
    backend: Arc<B>,
    params: GenerationParams,
}

impl<B: LlmBackend + 'static> RequestOrchestrator<B> {
    /// Create an orchestrator
    pub fn new(backend: B, params: GenerationParams) -> Self {
        Self {
            backend: Arc::new(backend),
            params,
        }
    }

    /// Generation parameters in use
    #[must_use]
    pub fn params(&self) -> &GenerationParams {
        &self.params
    }

    /// Backend name, for status display
    #[must_use]
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Backend requests are issued against
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Build the upstream body for a history
    #[must_use]
    pub fn build_request(&self, history: Vec<HistoryEntry>) -> ChatRequest {
        ChatRequest::new(self.params.model.clone(), history)
            .with_max_tokens(self.params.max_tokens)
            .with_temperature(self.params.temperature)
    }

    /// Issue a request for `turn_id` and stream its progress into `events`
    ///
    /// Must be called from within a tokio runtime. Callers keep at most one
    /// dispatch in flight.
    pub fn dispatch(
        &self,
        turn_id: MessageId,
        history: Vec<HistoryEntry>,
        events: mpsc::Sender<TurnEvent>,
    ) -> DispatchHandle {
        let request = self.build_request(history);
        let token = CancellationToken::new();

        tracing::info!(
            turn_id = %turn_id,
            backend = self.backend.name(),
            model = %request.model,
            "Dispatching turn"
        );

        let task = tokio::spawn(run_turn(
            Arc::clone(&self.backend),
            request,
            turn_id.clone(),
            events,
            token.clone(),
        ));

        DispatchHandle {
            turn_id,
            token,
            task,
        }
    }
}

async fn run_turn<B: LlmBackend + ?Sized>(
    backend: Arc<B>,
    request: ChatRequest,
    turn_id: MessageId,
    events: mpsc::Sender<TurnEvent>,
    token: CancellationToken,
) {
    let outcome = stream_turn(backend.as_ref(), &request, &turn_id, &events, &token).await;

    let terminal = match outcome {
        TurnOutcome::Completed => {
            tracing::info!(turn_id = %turn_id, "Turn completed");
            TurnEvent::Completed { turn_id }
        }
        TurnOutcome::Failed(reason) => {
            tracing::warn!(turn_id = %turn_id, reason = %reason, "Turn failed");
            TurnEvent::Failed { turn_id, reason }
        }
        TurnOutcome::Cancelled => {
            tracing::info!(turn_id = %turn_id, "Turn cancelled");
            TurnEvent::Cancelled { turn_id }
        }
    };

    if events.send(terminal).await.is_err() {
        tracing::debug!("Turn event receiver dropped before terminal event");
    }
}

async fn stream_turn<B: LlmBackend + ?Sized>(
    backend: &B,
    request: &ChatRequest,
    turn_id: &MessageId,
    events: &mpsc::Sender<TurnEvent>,
    token: &CancellationToken,
) -> TurnOutcome {
    let body = tokio::select! {
        biased;
        _ = token.cancelled() => return TurnOutcome::Cancelled,
        result = backend.open_stream(request) => match result {
            Ok(body) => body,
            Err(e) => return TurnOutcome::Failed(e.to_string()),
        },
    };

    let mut decoded = std::pin::pin!(decode_stream(body));
    let mut fragments = 0usize;

    loop {
        let next = tokio::select! {
            biased;
            _ = token.cancelled() => return TurnOutcome::Cancelled,
            next = decoded.next() => next,
        };

        match next {
            None => {
                tracing::debug!(turn_id = %turn_id, fragments, "Response body exhausted");
                return TurnOutcome::Completed;
            }
            Some(Ok(DecodedEvent::Fragment(text))) => {
                fragments += 1;
                let event = TurnEvent::Fragment {
                    turn_id: turn_id.clone(),
                    text,
                };
                tokio::select! {
                    biased;
                    _ = token.cancelled() => return TurnOutcome::Cancelled,
                    sent = events.send(event) => {
                        if sent.is_err() {
                            // Nobody is listening any more
                            return TurnOutcome::Cancelled;
                        }
                    }
                }
            }
            Some(Ok(DecodedEvent::Done)) => {
                tracing::trace!(turn_id = %turn_id, "Stream sentinel received");
            }
            Some(Ok(DecodedEvent::UpstreamError(message))) => {
                return TurnOutcome::Failed(BackendError::Upstream(message).to_string());
            }
            Some(Err(e)) => return TurnOutcome::Failed(e.to_string()),
        }
    }
}
