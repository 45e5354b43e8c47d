//! Conversation Widget
//!
//! A borderless, scrollable message list. The scroll offset counts lines up
//! from the bottom, so new content stays in view unless the user scrolled
//! away.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::StatefulWidget;
use streamchat_conductor::{MessageId, MessageRole};
use textwrap::wrap;

use crate::display::DisplayMessage;
use crate::theme::{
    dim_style, ASSISTANT_LABEL, ASSISTANT_TEXT, DIM_GRAY, PENDING_DOT, USER_BLUE,
};

/// Dots in the waiting indicator
const PENDING_DOTS: usize = 3;

/// Shown when there is nothing to display
const EMPTY_TITLE: &str = "Start a conversation";
const EMPTY_HINT: &str = "Type a message below and press Enter";

/// Trails the label of the reply picked for copying
const SELECTED_HINT: &str = "  ◀ Ctrl+Y copies";

/// Scroll state for the conversation
#[derive(Debug, Default)]
pub struct ConversationState {
    /// Scroll offset (lines from bottom, 0 = latest)
    pub scroll_offset: usize,
    /// Total content lines at the last render
    pub total_lines: usize,
    /// Visible height at the last render
    pub viewport: usize,
}

impl ConversationState {
    /// Scroll towards older messages
    pub fn scroll_up(&mut self, lines: usize) {
        let max = self.total_lines.saturating_sub(self.viewport);
        self.scroll_offset = (self.scroll_offset + lines).min(max);
    }

    /// Scroll towards newer messages
    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
    }

    /// Follow the latest message again
    pub fn scroll_to_bottom(&mut self) {
        self.scroll_offset = 0;
    }

    /// Half a viewport, at least one line
    pub fn page(&self) -> usize {
        (self.viewport / 2).max(1)
    }
}

/// The message list
pub struct Conversation<'a> {
    messages: &'a [DisplayMessage],
    tick: u64,
    selected: Option<&'a MessageId>,
}

impl<'a> Conversation<'a> {
    /// `tick` drives the waiting animation
    pub fn new(messages: &'a [DisplayMessage], tick: u64) -> Self {
        Self {
            messages,
            tick,
            selected: None,
        }
    }

    /// Mark the reply picked for copying
    pub fn selected(mut self, selected: Option<&'a MessageId>) -> Self {
        self.selected = selected;
        self
    }
}

impl StatefulWidget for Conversation<'_> {
    type State = ConversationState;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let height = area.height as usize;
        state.viewport = height;

        if self.messages.is_empty() {
            state.total_lines = 0;
            state.scroll_offset = 0;
            render_empty(area, buf);
            return;
        }

        let lines = build_lines(self.messages, area.width as usize, self.tick, self.selected);
        state.total_lines = lines.len();

        // Clamp scroll
        let max_scroll = state.total_lines.saturating_sub(height);
        state.scroll_offset = state.scroll_offset.min(max_scroll);

        let visible_end = state.total_lines - state.scroll_offset;
        let visible_start = visible_end.saturating_sub(height);

        for (i, line) in lines[visible_start..visible_end].iter().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            let y = area.y + i as u16;
            buf.set_line(area.x, y, line, area.width);
        }

        if state.scroll_offset > 0 {
            let marker = format!(" {} more ", state.scroll_offset);
            #[allow(clippy::cast_possible_truncation)]
            let x = area.right().saturating_sub(marker.len() as u16);
            buf.set_string(x, area.bottom().saturating_sub(1), marker, dim_style());
        }
    }
}

fn render_empty(area: Rect, buf: &mut Buffer) {
    if area.height < 2 {
        return;
    }
    let mid = area.y + area.height / 2;
    for (y, text, style) in [
        (
            mid.saturating_sub(1),
            EMPTY_TITLE,
            Style::default().fg(ASSISTANT_TEXT).add_modifier(Modifier::BOLD),
        ),
        (mid, EMPTY_HINT, dim_style()),
    ] {
        let width = unicode_width::UnicodeWidthStr::width(text);
        #[allow(clippy::cast_possible_truncation)]
        let x = area.x + area.width.saturating_sub(width as u16) / 2;
        buf.set_string(x, y, text, style);
    }
}

/// Lay out every message as styled lines wrapped to `width`
pub fn build_lines(
    messages: &[DisplayMessage],
    width: usize,
    tick: u64,
    selected: Option<&MessageId>,
) -> Vec<Line<'static>> {
    let width = width.max(1);
    let mut lines = Vec::new();

    for msg in messages {
        let (label_color, text_color) = match msg.role {
            MessageRole::User => (USER_BLUE, USER_BLUE),
            MessageRole::Assistant => (ASSISTANT_LABEL, ASSISTANT_TEXT),
        };

        let mut label = Style::default().fg(label_color).add_modifier(Modifier::BOLD);
        let is_selected = selected == Some(&msg.id);
        if is_selected {
            label = label.add_modifier(Modifier::REVERSED);
        }
        let mut header = vec![
            Span::styled(msg.role.label(), label),
            Span::styled(format!("  {}", msg.time_label()), dim_style()),
        ];
        if is_selected {
            header.push(Span::styled(SELECTED_HINT, dim_style()));
        }
        lines.push(Line::from(header));

        if msg.is_waiting() {
            lines.push(pending_line(tick));
        } else {
            let text_style = Style::default().fg(text_color);
            for raw in msg.content.lines() {
                if raw.is_empty() {
                    lines.push(Line::default());
                    continue;
                }
                for piece in wrap(raw, width) {
                    lines.push(Line::from(Span::styled(piece.into_owned(), text_style)));
                }
            }
            if msg.streaming {
                lines.push(Line::from(Span::styled("▌", Style::default().fg(DIM_GRAY))));
            }
        }

        lines.push(Line::default());
    }

    lines
}

/// `●●●` with one dot lit, advancing each tick
fn pending_line(tick: u64) -> Line<'static> {
    #[allow(clippy::cast_possible_truncation)]
    let lit = (tick % PENDING_DOTS as u64) as usize;
    let spans = (0..PENDING_DOTS)
        .map(|i| {
            let color = if i == lit { ASSISTANT_LABEL } else { PENDING_DOT };
            Span::styled("●", Style::default().fg(color))
        })
        .collect::<Vec<_>>();
    Line::from(spans)
}
