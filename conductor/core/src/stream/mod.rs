//! Streaming response decoding
//!
//! Byte chunks in, text fragments out. Two layers:
//!
//! - [`Utf8StreamDecoder`]: bytes to text, stateful across chunk boundaries
//! - [`StreamDecoder`]: text to `data:` lines to [`DecodedEvent`]s
//!
//! [`decode_stream`] wraps both around any byte stream.

mod decoder;
mod utf8;

pub use decoder::{decode_stream, DecodedEvent, StreamDecoder};
pub use utf8::Utf8StreamDecoder;
