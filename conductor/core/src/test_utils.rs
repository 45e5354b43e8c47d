//! Test utilities shared by the core's unit tests

use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::backend::{ByteStream, ChatRequest, LlmBackend};
use crate::error::BackendError;

/// Sender side of a scripted response body
pub type ChunkSender = mpsc::Sender<Result<Bytes, BackendError>>;

/// One `data:` line carrying a content delta
pub fn delta_line(text: &str) -> String {
    format!(
        "data: {}\n",
        serde_json::json!({"choices": [{"delta": {"content": text}}]})
    )
}

/// What the next `open_stream` call should do
pub enum Script {
    /// Stream whatever the test pushes into the paired sender
    Body(mpsc::Receiver<Result<Bytes, BackendError>>),
    /// Fail before any body arrives
    Fail(BackendError),
    /// Never answer
    Hang,
}

/// Backend whose responses are driven by the test, one script per request
#[derive(Default)]
pub struct ScriptedBackend {
    scripts: Mutex<Vec<Script>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedBackend {
    /// Backend with no scripts queued yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a body-streaming response and return its sender
    pub fn push_body(&self) -> ChunkSender {
        let (tx, rx) = mpsc::channel(64);
        self.scripts.lock().unwrap().push(Script::Body(rx));
        tx
    }

    /// Queue a complete body delivered as one chunk
    pub fn push_complete(&self, body: impl Into<String>) {
        let (tx, rx) = mpsc::channel(1);
        tx.try_send(Ok(Bytes::from(body.into()))).unwrap();
        self.scripts.lock().unwrap().push(Script::Body(rx));
    }

    /// Queue a failure
    pub fn push_failure(&self, error: BackendError) {
        self.scripts.lock().unwrap().push(Script::Fail(error));
    }

    /// Queue a request that never answers
    pub fn push_hang(&self) {
        self.scripts.lock().unwrap().push(Script::Hang);
    }

    /// Requests seen so far
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "Scripted"
    }

    async fn open_stream(&self, request: &ChatRequest) -> Result<ByteStream, BackendError> {
        self.requests.lock().unwrap().push(request.clone());
        let script = {
            let mut scripts = self.scripts.lock().unwrap();
            if scripts.is_empty() {
                None
            } else {
                Some(scripts.remove(0))
            }
        };

        match script {
            Some(Script::Body(rx)) => Ok(Box::pin(ReceiverStream::new(rx))),
            Some(Script::Fail(e)) => Err(e),
            Some(Script::Hang) | None => futures::future::pending().await,
        }
    }
}
