//! Incremental UTF-8 decoding
//!
//! Network chunks split multi-byte characters wherever they like. This
//! decoder holds back an incomplete trailing sequence until the bytes that
//! complete it arrive, so a character is never mangled at a chunk boundary.

/// Longest UTF-8 sequence; an incomplete tail is always shorter than this.
const MAX_SEQUENCE_LEN: usize = 4;

/// Stateful byte-to-text decoder
#[derive(Debug, Default)]
pub struct Utf8StreamDecoder {
    /// Bytes of a sequence that started in a previous chunk
    pending: Vec<u8>,
}

impl Utf8StreamDecoder {
    /// Create a new decoder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a chunk, keeping any incomplete trailing sequence for later
    ///
    /// Invalid sequences become U+FFFD rather than failing the stream.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.pending);
        bytes.extend_from_slice(chunk);

        let mut out = String::with_capacity(bytes.len());
        let mut rest: &[u8] = &bytes;

        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    // valid_up_to guarantees this prefix is UTF-8
                    out.push_str(&String::from_utf8_lossy(valid));

                    match e.error_len() {
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[bad..];
                        }
                        None => {
                            // Truncated sequence at the end of input
                            debug_assert!(after.len() < MAX_SEQUENCE_LEN);
                            self.pending = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }

        out
    }

    /// Flush at end of stream; a dangling partial sequence becomes U+FFFD
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            String::new()
        } else {
            self.pending.clear();
            char::REPLACEMENT_CHARACTER.to_string()
        }
    }

    /// Whether bytes are being held for the next chunk
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}
