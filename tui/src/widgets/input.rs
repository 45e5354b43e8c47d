//! Input Widget
//!
//! The compose box: bordered, wraps what the user typed, keeps the cursor
//! row in view, and shows an `n/limit` counter on the bottom border.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Widget};
use textwrap::wrap;

use crate::theme::{counter_style, dim_style, DIM_GRAY, USER_BLUE};

/// Height of the input box including borders
pub const INPUT_HEIGHT: u16 = 5;

/// The compose box
pub struct InputBox<'a> {
    text: &'a str,
    limit: usize,
    enabled: bool,
}

impl<'a> InputBox<'a> {
    pub fn new(text: &'a str, limit: usize) -> Self {
        Self {
            text,
            limit,
            enabled: true,
        }
    }

    /// Disabled while a response is in flight
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

impl Widget for InputBox<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let len = self.text.chars().count();
        let border_color = if self.enabled { USER_BLUE } else { DIM_GRAY };

        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(border_color))
            .title(" Message ")
            .title_bottom(
                Line::from(Span::styled(
                    format!(" {len}/{} ", self.limit),
                    counter_style(len, self.limit),
                ))
                .right_aligned(),
            );

        let inner = block.inner(area);
        block.render(area, buf);
        if inner.width == 0 || inner.height == 0 {
            return;
        }

        let lines = if !self.enabled && self.text.is_empty() {
            vec![Line::from(Span::styled("Waiting for response...", dim_style()))]
        } else {
            input_lines(self.text, inner.width as usize, self.enabled)
        };

        // Keep the last rows (where the cursor is) visible
        let height = inner.height as usize;
        let skip = lines.len().saturating_sub(height);
        for (i, line) in lines.iter().skip(skip).enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            let y = inner.y + i as u16;
            buf.set_line(inner.x, y, line, inner.width);
        }
    }
}

/// Wrap the input and append a cursor when editing
fn input_lines(text: &str, width: usize, cursor: bool) -> Vec<Line<'static>> {
    let style = Style::default().fg(USER_BLUE);
    let mut display = text.to_string();
    if cursor {
        display.push('_');
    }

    let mut lines = Vec::new();
    for raw in display.split('\n') {
        if raw.is_empty() {
            lines.push(Line::default());
            continue;
        }
        for piece in wrap(raw, width.max(1)) {
            lines.push(Line::from(Span::styled(piece.into_owned(), style)));
        }
    }
    lines
}
