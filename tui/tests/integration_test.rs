//! Integration Tests for TUI + Conductor
//!
//! These tests drive the real App, ConductorClient and Conductor end to end,
//! with a mock backend whose response bodies are fed chunk by chunk from the
//! test.
//!
//! # Test Coverage
//!
//! 1. **Message Exchange**: typed input streams back a reply
//! 2. **Failure**: a 500 drops the placeholder and shows the error
//! 3. **Cancellation**: partial reply kept, later chunks ignored
//! 4. **Clear**: an in-flight turn is abandoned and the snapshot erased
//! 5. **Persistence**: a new client restores the previous conversation
//! 6. **Rendering**: header, empty state and error banner

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use pretty_assertions::assert_eq;
use ratatui::backend::TestBackend;
use ratatui::Terminal;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_stream::wrappers::ReceiverStream;

use streamchat_conductor::{
    BackendError, ByteStream, ChatRequest, ConductorConfig, ConductorState, FileSessionStore,
    LlmBackend, MemorySessionStore, MessageRole, SessionStore,
};
use streamchat_tui::{App, ConductorClient};

// ============================================================================
// Channel-fed Mock Backend
// ============================================================================

type Chunk = Result<Bytes, BackendError>;

enum Reply {
    Body(mpsc::Receiver<Chunk>),
    Fail(BackendError),
}

#[derive(Default)]
struct Shared {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<ChatRequest>>,
}

/// Mock backend; clones share one reply queue so the test keeps a handle
#[derive(Clone, Default)]
struct MockBackend {
    shared: Arc<Shared>,
}

impl MockBackend {
    fn new() -> Self {
        Self::default()
    }

    /// Queue a reply whose chunks the test sends
    fn reply(&self) -> mpsc::Sender<Chunk> {
        let (tx, rx) = mpsc::channel(32);
        self.shared
            .replies
            .lock()
            .unwrap()
            .push_back(Reply::Body(rx));
        tx
    }

    /// Queue a reply that arrives complete
    fn reply_with(&self, chunks: &[&str]) {
        let tx = self.reply();
        for chunk in chunks {
            tx.try_send(Ok(Bytes::from(chunk.to_string()))).unwrap();
        }
    }

    fn fail_with(&self, error: BackendError) {
        self.shared
            .replies
            .lock()
            .unwrap()
            .push_back(Reply::Fail(error));
    }

    fn request_count(&self) -> usize {
        self.shared.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmBackend for MockBackend {
    fn name(&self) -> &str {
        "Mock"
    }

    async fn open_stream(&self, request: &ChatRequest) -> Result<ByteStream, BackendError> {
        self.shared.requests.lock().unwrap().push(request.clone());
        let reply = self.shared.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Body(rx)) => Ok(Box::pin(ReceiverStream::new(rx))),
            Some(Reply::Fail(e)) => Err(e),
            None => futures::future::pending().await,
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn delta(text: &str) -> String {
    format!(
        "data: {}\n",
        serde_json::json!({"choices": [{"delta": {"content": text}}]})
    )
}

const DONE: &str = "data: [DONE]\n";

async fn start_app<S: SessionStore>(
    backend: MockBackend,
    store: S,
    input_limit: usize,
) -> App<MockBackend, S> {
    let client = ConductorClient::new(backend, store, ConductorConfig::default());
    let mut app = App::new(client, input_limit);
    app.connect().await.unwrap();
    app
}

async fn type_text<S: SessionStore>(app: &mut App<MockBackend, S>, text: &str) {
    for c in text.chars() {
        app.handle_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
            .await;
    }
}

async fn press<S: SessionStore>(app: &mut App<MockBackend, S>, code: KeyCode) {
    app.handle_key(KeyEvent::new(code, KeyModifiers::NONE)).await;
}

/// Apply turn events until the turn settles
async fn settle<S: SessionStore>(app: &mut App<MockBackend, S>) {
    timeout(Duration::from_secs(5), async {
        while app.conductor_mut().is_busy() {
            app.conductor_mut().next_turn_event().await;
        }
    })
    .await
    .expect("turn did not settle");
    app.process_conductor_messages();
}

/// Apply exactly one turn event
async fn step<S: SessionStore>(app: &mut App<MockBackend, S>) {
    timeout(Duration::from_secs(5), app.conductor_mut().next_turn_event())
        .await
        .expect("no turn event");
    app.process_conductor_messages();
}

fn screen(terminal: &Terminal<TestBackend>) -> String {
    let buf = terminal.backend().buffer();
    (0..buf.area.height)
        .map(|y| {
            (0..buf.area.width)
                .map(|x| buf[(x, y)].symbol().to_string())
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ============================================================================
// Message Exchange
// ============================================================================

#[tokio::test]
async fn test_hello_streams_into_assistant_turn() {
    let backend = MockBackend::new();
    let body = backend.reply();
    let mut app = start_app(backend.clone(), MemorySessionStore::new(), 1000).await;

    type_text(&mut app, "Hi").await;
    press(&mut app, KeyCode::Enter).await;

    assert_eq!(app.input(), "");
    assert_eq!(app.display().messages.len(), 2);
    assert!(app.display().messages[1].is_waiting());
    assert_eq!(app.display().conductor_state, ConductorState::Thinking);

    body.send(Ok(Bytes::from(delta("He")))).await.unwrap();
    body.send(Ok(Bytes::from(delta("llo")))).await.unwrap();
    body.send(Ok(Bytes::from(DONE))).await.unwrap();
    drop(body);
    settle(&mut app).await;

    let messages = &app.display().messages;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, MessageRole::User);
    assert_eq!(messages[0].content, "Hi");
    assert_eq!(messages[1].content, "Hello");
    assert!(!messages[1].streaming);
    assert_eq!(app.display().conductor_state, ConductorState::Ready);
    assert!(app.display().connected);
    assert_eq!(backend.request_count(), 1);
}

#[tokio::test]
async fn test_chunk_boundaries_do_not_change_reply() {
    let backend = MockBackend::new();
    let body = backend.reply();
    let mut app = start_app(backend, MemorySessionStore::new(), 1000).await;

    type_text(&mut app, "Greet me").await;
    press(&mut app, KeyCode::Enter).await;

    let payload = format!("{}{}{DONE}", delta("héllo "), delta("wörld ✨"));
    let bytes = payload.as_bytes();
    // Split every 3 bytes, cutting through multi-byte characters
    for chunk in bytes.chunks(3) {
        body.send(Ok(Bytes::copy_from_slice(chunk))).await.unwrap();
    }
    drop(body);
    settle(&mut app).await;

    assert_eq!(app.display().messages[1].content, "héllo wörld ✨");
}

#[tokio::test]
async fn test_multi_turn_sends_history() {
    let backend = MockBackend::new();
    backend.reply_with(&[&delta("First"), DONE]);
    backend.reply_with(&[&delta("Second"), DONE]);
    let mut app = start_app(backend.clone(), MemorySessionStore::new(), 1000).await;

    type_text(&mut app, "one").await;
    press(&mut app, KeyCode::Enter).await;
    settle(&mut app).await;
    type_text(&mut app, "two").await;
    press(&mut app, KeyCode::Enter).await;
    settle(&mut app).await;

    let contents: Vec<&str> = app
        .display()
        .messages
        .iter()
        .map(|m| m.content.as_str())
        .collect();
    assert_eq!(contents, vec!["one", "First", "two", "Second"]);

    let requests = backend.shared.requests.lock().unwrap();
    assert_eq!(requests[1].messages.len(), 3);
}

#[tokio::test]
async fn test_earlier_reply_can_be_picked_for_copy() {
    let backend = MockBackend::new();
    backend.reply_with(&[&delta("First"), DONE]);
    backend.reply_with(&[&delta("Second"), DONE]);
    let mut app = start_app(backend, MemorySessionStore::new(), 1000).await;

    for text in ["one", "two"] {
        type_text(&mut app, text).await;
        press(&mut app, KeyCode::Enter).await;
        settle(&mut app).await;
    }
    assert_eq!(app.display().copy_text(), Some("Second"));

    let alt_up = KeyEvent::new(KeyCode::Up, KeyModifiers::ALT);
    app.handle_key(alt_up).await;
    app.handle_key(alt_up).await;
    assert_eq!(app.display().copy_text(), Some("First"));

    let mut terminal = Terminal::new(TestBackend::new(100, 24)).unwrap();
    terminal.draw(|frame| app.draw(frame)).unwrap();
    let picked = screen(&terminal)
        .lines()
        .filter(|line| line.contains("Ctrl+Y copies"))
        .count();
    assert_eq!(picked, 1);

    app.handle_key(KeyEvent::new(KeyCode::Down, KeyModifiers::ALT))
        .await;
    app.handle_key(KeyEvent::new(KeyCode::Down, KeyModifiers::ALT))
        .await;
    assert!(app.display().selected.is_none());
    assert_eq!(app.display().copy_text(), Some("Second"));
}

#[tokio::test]
async fn test_no_turn_progress_while_idle() {
    let mut app = start_app(MockBackend::new(), MemorySessionStore::new(), 1000).await;
    let mut next = tokio_test::task::spawn(app.conductor_mut().recv_turn_event());
    tokio_test::assert_pending!(next.poll());
}

// ============================================================================
// Failure
// ============================================================================

#[tokio::test]
async fn test_server_error_reverts_to_user_turn() {
    let backend = MockBackend::new();
    backend.fail_with(BackendError::Status {
        status: 500,
        body: "internal".to_string(),
    });
    let mut app = start_app(backend, MemorySessionStore::new(), 1000).await;

    type_text(&mut app, "Hi").await;
    press(&mut app, KeyCode::Enter).await;
    settle(&mut app).await;

    assert_eq!(app.display().messages.len(), 1);
    assert_eq!(app.display().messages[0].content, "Hi");
    assert!(!app.display().connected);
    assert_eq!(
        app.display().error.as_deref(),
        Some("API error: 500 - internal")
    );
    assert_eq!(app.conductor_mut().session().len(), 1);
}

#[tokio::test]
async fn test_retry_after_failure_clears_banner() {
    let backend = MockBackend::new();
    backend.fail_with(BackendError::Status {
        status: 503,
        body: String::new(),
    });
    backend.reply_with(&[&delta("Back"), DONE]);
    let mut app = start_app(backend, MemorySessionStore::new(), 1000).await;

    type_text(&mut app, "Hi").await;
    press(&mut app, KeyCode::Enter).await;
    settle(&mut app).await;
    assert!(app.display().error.is_some());

    type_text(&mut app, "again").await;
    press(&mut app, KeyCode::Enter).await;
    assert!(app.display().error.is_none());
    settle(&mut app).await;

    assert!(app.display().connected);
    assert_eq!(app.display().messages.len(), 3);
}

#[tokio::test]
async fn test_midstream_error_payload_fails_turn() {
    let backend = MockBackend::new();
    backend.reply_with(&[
        &delta("partial"),
        "data: {\"error\":{\"message\":\"rate limited\"}}\n",
    ]);
    let mut app = start_app(backend, MemorySessionStore::new(), 1000).await;

    type_text(&mut app, "Hi").await;
    press(&mut app, KeyCode::Enter).await;
    settle(&mut app).await;

    assert_eq!(app.display().messages.len(), 1);
    assert_eq!(
        app.display().error.as_deref(),
        Some("upstream error: rate limited")
    );
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test]
async fn test_escape_cancels_and_keeps_partial_reply() {
    let backend = MockBackend::new();
    let body = backend.reply();
    let mut app = start_app(backend, MemorySessionStore::new(), 1000).await;

    type_text(&mut app, "Tell me").await;
    press(&mut app, KeyCode::Enter).await;

    body.send(Ok(Bytes::from(delta("He")))).await.unwrap();
    step(&mut app).await;
    body.send(Ok(Bytes::from(delta("llo")))).await.unwrap();
    step(&mut app).await;

    press(&mut app, KeyCode::Esc).await;
    assert!(app.is_running());
    assert!(!app.conductor_mut().is_busy());

    // Anything the stream still delivers is ignored
    let _ = body.send(Ok(Bytes::from(delta(" world")))).await;
    app.conductor_mut().poll_streaming().await;
    app.process_conductor_messages();

    let reply = &app.display().messages[1];
    assert_eq!(reply.content, "Hello");
    assert!(!reply.streaming);
    assert!(app.display().connected);
    assert!(app.display().error.is_none());
    assert_eq!(app.display().conductor_state, ConductorState::Ready);
}

#[tokio::test]
async fn test_typing_ignored_while_waiting() {
    let backend = MockBackend::new();
    let _body = backend.reply();
    let mut app = start_app(backend, MemorySessionStore::new(), 1000).await;

    type_text(&mut app, "first").await;
    press(&mut app, KeyCode::Enter).await;
    type_text(&mut app, "second").await;
    press(&mut app, KeyCode::Enter).await;

    assert_eq!(app.input(), "");
    assert_eq!(app.display().messages.len(), 2);
    assert_eq!(app.conductor_mut().session().len(), 2);
}

// ============================================================================
// Clear
// ============================================================================

#[tokio::test]
async fn test_clear_mid_turn_erases_everything() {
    let backend = MockBackend::new();
    let body = backend.reply();
    let store = MemorySessionStore::new();
    let mut app = start_app(backend, store.clone(), 1000).await;

    type_text(&mut app, "Hi").await;
    press(&mut app, KeyCode::Enter).await;
    body.send(Ok(Bytes::from(delta("Hel")))).await.unwrap();
    step(&mut app).await;

    app.conductor_mut().clear().await.unwrap();
    let _ = body.send(Ok(Bytes::from(delta("lo")))).await;
    app.conductor_mut().poll_streaming().await;
    app.process_conductor_messages();

    assert!(app.display().messages.is_empty());
    assert!(app.conductor_mut().session().is_empty());
    assert!(!store.has_snapshot());
    assert_eq!(app.display().conductor_state, ConductorState::Ready);
}

#[tokio::test]
async fn test_ctrl_l_clears_idle_conversation() {
    let backend = MockBackend::new();
    backend.reply_with(&[&delta("Hello"), DONE]);
    let store = MemorySessionStore::new();
    let mut app = start_app(backend, store.clone(), 1000).await;

    type_text(&mut app, "Hi").await;
    press(&mut app, KeyCode::Enter).await;
    settle(&mut app).await;
    assert!(store.has_snapshot());

    app.handle_key(KeyEvent::new(KeyCode::Char('l'), KeyModifiers::CONTROL))
        .await;

    assert!(app.display().messages.is_empty());
    assert!(!store.has_snapshot());
}

// ============================================================================
// Persistence
// ============================================================================

#[tokio::test]
async fn test_conversation_survives_restart() {
    let dir = tempfile::tempdir().unwrap();

    let backend = MockBackend::new();
    backend.reply_with(&[&delta("Hello"), DONE]);
    let mut app = start_app(
        backend,
        FileSessionStore::new(dir.path(), "chatMessages"),
        1000,
    )
    .await;
    type_text(&mut app, "Hi").await;
    press(&mut app, KeyCode::Enter).await;
    settle(&mut app).await;
    drop(app);

    let restarted = start_app(
        MockBackend::new(),
        FileSessionStore::new(dir.path(), "chatMessages"),
        1000,
    )
    .await;

    let contents: Vec<&str> = restarted
        .display()
        .messages
        .iter()
        .map(|m| m.content.as_str())
        .collect();
    assert_eq!(contents, vec!["Hi", "Hello"]);
}

#[tokio::test]
async fn test_quit_mid_turn_keeps_partial_reply_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let backend = MockBackend::new();
    let body = backend.reply();
    let mut app = start_app(
        backend,
        FileSessionStore::new(dir.path(), "chatMessages"),
        1000,
    )
    .await;

    type_text(&mut app, "Hi").await;
    press(&mut app, KeyCode::Enter).await;
    body.send(Ok(Bytes::from(delta("Hel")))).await.unwrap();
    step(&mut app).await;

    app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL))
        .await;
    assert!(!app.is_running());
    assert!(app.display().quit);
    drop(app);

    let saved = FileSessionStore::new(dir.path(), "chatMessages").load();
    assert_eq!(saved.len(), 2);
    assert_eq!(saved[1].content, "Hel");
}

// ============================================================================
// Input
// ============================================================================

#[tokio::test]
async fn test_input_limit_refuses_extra_characters() {
    let mut app = start_app(MockBackend::new(), MemorySessionStore::new(), 5).await;

    type_text(&mut app, "abcdefghij").await;
    assert_eq!(app.input(), "abcde");

    press(&mut app, KeyCode::Backspace).await;
    type_text(&mut app, "xyz").await;
    assert_eq!(app.input(), "abcdx");
}

#[tokio::test]
async fn test_shift_enter_inserts_newline() {
    let mut app = start_app(MockBackend::new(), MemorySessionStore::new(), 1000).await;

    type_text(&mut app, "one").await;
    app.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::SHIFT))
        .await;
    type_text(&mut app, "two").await;

    assert_eq!(app.input(), "one\ntwo");
}

#[tokio::test]
async fn test_blank_input_is_not_sent() {
    let backend = MockBackend::new();
    let mut app = start_app(backend.clone(), MemorySessionStore::new(), 1000).await;

    type_text(&mut app, "   ").await;
    press(&mut app, KeyCode::Enter).await;

    assert_eq!(backend.request_count(), 0);
    assert!(app.display().messages.is_empty());
}

// ============================================================================
// Rendering
// ============================================================================

#[tokio::test]
async fn test_empty_screen() {
    let mut app = start_app(MockBackend::new(), MemorySessionStore::new(), 1000).await;
    let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();

    terminal.draw(|frame| app.draw(frame)).unwrap();
    let text = screen(&terminal);

    assert!(text.contains("Streamchat"));
    assert!(text.contains("Connected"));
    assert!(text.contains("Start a conversation"));
    assert!(text.contains("0/1000"));
}

#[tokio::test]
async fn test_error_banner_and_disconnected_indicator() {
    let backend = MockBackend::new();
    backend.fail_with(BackendError::Status {
        status: 500,
        body: "boom".to_string(),
    });
    let mut app = start_app(backend, MemorySessionStore::new(), 1000).await;
    type_text(&mut app, "Hi").await;
    press(&mut app, KeyCode::Enter).await;
    settle(&mut app).await;

    let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
    terminal.draw(|frame| app.draw(frame)).unwrap();
    let text = screen(&terminal);

    assert!(text.contains("Error: API error: 500 - boom"));
    assert!(text.contains("Disconnected"));
    assert!(text.contains("You"));
}
