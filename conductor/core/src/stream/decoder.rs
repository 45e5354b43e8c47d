//! Server-sent event decoder
//!
//! Turns the raw body of a streamed chat completion into text fragments.
//! The body is a sequence of lines; the ones that matter look like
//!
//! ```text
//! data: {"choices":[{"delta":{"content":"He"}}]}
//! data: {"choices":[{"delta":{"content":"llo"}}]}
//! data: [DONE]
//! ```
//!
//! Anything else (blank keep-alives, comments, other fields, JSON that
//! doesn't parse) is noise and gets dropped. The decoder knows nothing
//! about sessions or turns.

use std::collections::VecDeque;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::Deserialize;

use super::utf8::Utf8StreamDecoder;
use crate::error::BackendError;

/// Prefix of a payload line
const DATA_PREFIX: &str = "data: ";

/// End-of-stream sentinel
const DONE_SENTINEL: &str = "[DONE]";

/// Something worth reporting from the stream
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DecodedEvent {
    /// Next piece of assistant text (never empty)
    Fragment(String),
    /// The `[DONE]` sentinel was seen
    Done,
    /// The payload was an error object instead of a completion chunk
    UpstreamError(String),
}

#[derive(Debug, Deserialize)]
struct ChunkPayload {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    delta: Option<Delta>,
}

#[derive(Debug, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

/// Incremental line decoder
#[derive(Debug, Default)]
pub struct StreamDecoder {
    utf8: Utf8StreamDecoder,
    /// Text after the last newline seen so far
    buffer: String,
    /// Sentinel or error seen; all further input is ignored
    done: bool,
}

impl StreamDecoder {
    /// Create a new decoder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one network chunk, returning the events completed by it
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<DecodedEvent> {
        if self.done {
            return Vec::new();
        }
        let text = self.utf8.decode(chunk);
        self.buffer.push_str(&text);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=pos).collect();
            if let Some(event) = self.process_line(&line) {
                events.push(event);
            }
            if self.done {
                self.buffer.clear();
                break;
            }
        }
        events
    }

    /// Flush at end of stream, treating a final unterminated line as complete
    pub fn finish(&mut self) -> Vec<DecodedEvent> {
        if self.done {
            return Vec::new();
        }
        let tail = self.utf8.finish();
        self.buffer.push_str(&tail);

        let line = std::mem::take(&mut self.buffer);
        if line.is_empty() {
            return Vec::new();
        }
        self.process_line(&line).into_iter().collect()
    }

    /// Whether the sentinel (or an error payload) ended the stream
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done
    }

    fn process_line(&mut self, line: &str) -> Option<DecodedEvent> {
        let line = line.trim_end_matches(['\n', '\r']);
        let data = line.strip_prefix(DATA_PREFIX)?.trim();

        if data == DONE_SENTINEL {
            self.done = true;
            return Some(DecodedEvent::Done);
        }

        let payload: ChunkPayload = match serde_json::from_str(data) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::trace!(error = %e, line = %data, "Dropping malformed stream line");
                return None;
            }
        };

        if let Some(error) = payload.error {
            self.done = true;
            return Some(DecodedEvent::UpstreamError(error_message(&error)));
        }

        payload
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.delta)
            .and_then(|d| d.content)
            .filter(|text| !text.is_empty())
            .map(DecodedEvent::Fragment)
    }
}

/// Best-effort human text for an error payload
fn error_message(error: &serde_json::Value) -> String {
    match error {
        serde_json::Value::String(s) => s.clone(),
        other => other
            .get("message")
            .and_then(serde_json::Value::as_str)
            .map_or_else(|| other.to_string(), String::from),
    }
}

struct DecodeState<S> {
    inner: S,
    decoder: StreamDecoder,
    queue: VecDeque<DecodedEvent>,
    exhausted: bool,
}

/// Lazily decode a stream of byte chunks
///
/// Yields events in arrival order. After `Done` the remaining body is still
/// drained (and discarded) before the stream ends, so the connection is read
/// to completion. A transport error before the sentinel ends the stream with
/// that error; after the sentinel it is only logged.
pub fn decode_stream<S>(bytes: S) -> impl Stream<Item = Result<DecodedEvent, BackendError>> + Send
where
    S: Stream<Item = Result<Bytes, BackendError>> + Unpin + Send,
{
    let state = DecodeState {
        inner: bytes,
        decoder: StreamDecoder::new(),
        queue: VecDeque::new(),
        exhausted: false,
    };

    futures::stream::unfold(state, |mut st| async move {
        loop {
            if let Some(event) = st.queue.pop_front() {
                return Some((Ok(event), st));
            }
            if st.exhausted {
                return None;
            }

            match st.inner.next().await {
                Some(Ok(chunk)) => {
                    let events = st.decoder.feed(&chunk);
                    st.queue.extend(events);
                }
                Some(Err(e)) if st.decoder.is_done() => {
                    tracing::debug!(error = %e, "Transport error while draining finished stream");
                    st.exhausted = true;
                }
                Some(Err(e)) => {
                    st.exhausted = true;
                    return Some((Err(e), st));
                }
                None => {
                    st.exhausted = true;
                    let events = st.decoder.finish();
                    st.queue.extend(events);
                }
            }
        }
    })
}
