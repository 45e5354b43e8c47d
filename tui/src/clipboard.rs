//! Clipboard via OSC 52
//!
//! Terminals that support OSC 52 put the base64 payload on the system
//! clipboard, including over SSH. Copying is fire-and-forget: the terminal
//! gives no acknowledgement, so success means the sequence was written.

use std::io::{self, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Escape sequence that sets the clipboard to `text`
#[must_use]
pub fn osc52_sequence(text: &str) -> String {
    format!("\x1b]52;c;{}\x07", STANDARD.encode(text.as_bytes()))
}

/// Write the copy sequence for `text` to `out`
pub fn copy_to<W: Write>(out: &mut W, text: &str) -> io::Result<()> {
    out.write_all(osc52_sequence(text).as_bytes())?;
    out.flush()
}
