//! Theme and Colors
//!
//! A quiet palette: blue for the user, neutral for the assistant, and
//! saturated colors only for status (connectivity, errors, copy feedback).

use ratatui::style::{Color, Modifier, Style};

// ============================================================================
// Conversation Colors
// ============================================================================

/// User turns and the input box accent
pub const USER_BLUE: Color = Color::Rgb(96, 165, 250);

/// Assistant turns
pub const ASSISTANT_TEXT: Color = Color::Rgb(229, 231, 235);

/// Assistant label
pub const ASSISTANT_LABEL: Color = Color::Rgb(167, 139, 250);

/// Timestamps, hints, borders
pub const DIM_GRAY: Color = Color::Rgb(107, 114, 128);

/// Dots of the waiting indicator that are not lit
pub const PENDING_DOT: Color = Color::Rgb(75, 85, 99);

// ============================================================================
// Status Colors
// ============================================================================

/// Error banner and the disconnected indicator
pub const ERROR_RED: Color = Color::Rgb(248, 113, 113);

/// Connected indicator and copy feedback
pub const SUCCESS_GREEN: Color = Color::Rgb(74, 222, 128);

/// Warnings and the input counter near its limit
pub const WARNING_YELLOW: Color = Color::Rgb(250, 204, 21);

// ============================================================================
// Styles
// ============================================================================

/// Title in the header
#[must_use]
pub fn title_style() -> Style {
    Style::default().fg(ASSISTANT_TEXT).add_modifier(Modifier::BOLD)
}

/// Secondary text
#[must_use]
pub fn dim_style() -> Style {
    Style::default().fg(DIM_GRAY)
}

/// Style for the input counter given how full the box is
#[must_use]
pub fn counter_style(len: usize, limit: usize) -> Style {
    if len >= limit {
        Style::default().fg(ERROR_RED)
    } else if len * 10 >= limit * 9 {
        Style::default().fg(WARNING_YELLOW)
    } else {
        dim_style()
    }
}
