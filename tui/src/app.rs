//! Main Application
//!
//! The App struct manages the TUI lifecycle as a thin display client:
//! - Event loop (keyboard, turn progress, animation tick)
//! - ConductorClient for orchestration
//! - DisplayState for rendering
//!
//! The App:
//! 1. Converts terminal events to SurfaceEvents
//! 2. Sends events to the embedded Conductor via ConductorClient
//! 3. Receives ConductorMessages and updates DisplayState
//! 4. Renders based on DisplayState

use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::{Frame, Terminal};
use tokio::time::MissedTickBehavior;

use streamchat_conductor::{
    FileSessionStore, LlmBackend, NotifyLevel, OpenAiBackend, SessionStore, SurfaceType,
};

use crate::clipboard;
use crate::conductor_client::ConductorClient;
use crate::display::DisplayState;
use crate::theme::{
    dim_style, title_style, ERROR_RED, SUCCESS_GREEN, WARNING_YELLOW,
};
use crate::widgets::input::INPUT_HEIGHT;
use crate::widgets::{Conversation, ConversationState, InputBox};

/// Animation tick for the waiting indicator
const FRAME: Duration = Duration::from_millis(300);

/// Footer hint line
const HINTS: &str =
    "Enter send · Shift+Enter newline · Esc cancel/quit · Ctrl+L clear · Alt+↑/↓ pick · Ctrl+Y copy · PgUp/PgDn scroll";

/// What a key press asks for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyAction {
    /// Leave the app
    Quit,
    /// Stop the response in flight
    Cancel,
    /// Start a fresh conversation
    Clear,
    /// Copy the picked assistant reply (the latest if none is picked)
    Copy,
    /// Pick an older reply to copy
    SelectOlder,
    /// Pick a newer reply to copy
    SelectNewer,
    /// Send the input
    Submit,
    /// Insert a line break
    Newline,
    /// Type a character
    Insert(char),
    /// Delete the last character
    Backspace,
    /// Scroll towards older messages
    ScrollUp,
    /// Scroll towards newer messages
    ScrollDown,
    /// Nothing to do
    Ignore,
}

/// Map a key press to an action
///
/// While a response is in flight only cancel, quit and scrolling go through.
pub fn map_key(key: KeyEvent, busy: bool) -> KeyAction {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let alt = key.modifiers.contains(KeyModifiers::ALT);

    let action = match key.code {
        KeyCode::Char('c') if ctrl => return KeyAction::Quit,
        KeyCode::Esc if busy => return KeyAction::Cancel,
        KeyCode::Esc => return KeyAction::Quit,
        KeyCode::PageUp => return KeyAction::ScrollUp,
        KeyCode::PageDown => return KeyAction::ScrollDown,

        KeyCode::Char('l') if ctrl => KeyAction::Clear,
        KeyCode::Char('y') if ctrl => KeyAction::Copy,
        KeyCode::Up if alt => KeyAction::SelectOlder,
        KeyCode::Down if alt => KeyAction::SelectNewer,
        KeyCode::Enter
            if key
                .modifiers
                .intersects(KeyModifiers::SHIFT | KeyModifiers::ALT) =>
        {
            KeyAction::Newline
        }
        KeyCode::Enter => KeyAction::Submit,
        KeyCode::Char(_) if ctrl => KeyAction::Ignore,
        KeyCode::Char(c) => KeyAction::Insert(c),
        KeyCode::Backspace => KeyAction::Backspace,
        _ => KeyAction::Ignore,
    };

    if busy {
        KeyAction::Ignore
    } else {
        action
    }
}

/// Main application state
pub struct App<B: LlmBackend = OpenAiBackend, S: SessionStore = FileSessionStore> {
    // === Core State ===
    /// Is the app still running?
    running: bool,

    // === Conductor Integration ===
    /// Client for communicating with the embedded Conductor
    conductor: ConductorClient<B, S>,
    /// Display state derived from ConductorMessages
    display: DisplayState,

    // === UI State ===
    /// Message list scroll
    conversation: ConversationState,
    /// User input buffer
    input: String,
    /// Maximum input length in characters
    input_limit: usize,
    /// Animation frame counter
    tick: u64,
    /// Last frame time (for timers)
    last_frame: Instant,
}

impl<B: LlmBackend + 'static, S: SessionStore> App<B, S> {
    /// Create a new App around a client
    pub fn new(conductor: ConductorClient<B, S>, input_limit: usize) -> Self {
        Self {
            running: true,
            conductor,
            display: DisplayState::new(),
            conversation: ConversationState::default(),
            input: String::new(),
            input_limit,
            tick: 0,
            last_frame: Instant::now(),
        }
    }

    /// Main event loop
    pub async fn run(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> anyhow::Result<()> {
        self.connect().await?;

        let mut events = EventStream::new();
        let mut ticker = tokio::time::interval(FRAME);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        terminal.draw(|frame| self.draw(frame))?;

        while self.running {
            tokio::select! {
                biased;

                // Terminal events - highest priority
                maybe_event = events.next() => match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        self.handle_key(key).await;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "Terminal event error");
                    }
                    None => {
                        tracing::info!("Terminal event stream closed");
                        self.request_quit().await;
                    }
                },

                // Turn progress from the Conductor
                event = self.conductor.recv_turn_event() => {
                    self.conductor.apply_turn_event(event).await;
                }

                _ = ticker.tick() => {
                    self.tick = self.tick.wrapping_add(1);
                }
            }

            self.process_conductor_messages();
            self.update();
            terminal.draw(|frame| self.draw(frame))?;
        }

        Ok(())
    }

    /// Attach to the Conductor and pull the restored history
    pub async fn connect(&mut self) -> anyhow::Result<()> {
        self.conductor.connect(SurfaceType::Tui).await?;
        self.process_conductor_messages();
        Ok(())
    }

    /// Whether the loop should keep going
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Display state (for inspection)
    pub fn display(&self) -> &DisplayState {
        &self.display
    }

    /// Current input buffer
    pub fn input(&self) -> &str {
        &self.input
    }

    /// The embedded client
    pub fn conductor_mut(&mut self) -> &mut ConductorClient<B, S> {
        &mut self.conductor
    }

    /// Process all pending messages from the Conductor
    pub fn process_conductor_messages(&mut self) {
        for msg in self.conductor.recv_all() {
            self.display.apply_message(msg);
        }
        if self.display.quit {
            self.running = false;
        }
    }

    /// Handle keyboard input
    pub async fn handle_key(&mut self, key: KeyEvent) {
        match map_key(key, self.conductor.is_busy()) {
            KeyAction::Quit => self.request_quit().await,
            KeyAction::Cancel => {
                if let Err(e) = self.conductor.cancel().await {
                    tracing::warn!(error = %e, "Cancel failed");
                }
            }
            KeyAction::Clear => {
                if !self.display.messages.is_empty() {
                    if let Err(e) = self.conductor.clear().await {
                        tracing::warn!(error = %e, "Clear failed");
                    }
                    self.conversation.scroll_to_bottom();
                }
            }
            KeyAction::Copy => self.copy_reply(),
            KeyAction::SelectOlder => self.display.select_older(),
            KeyAction::SelectNewer => self.display.select_newer(),
            KeyAction::Submit => self.submit().await,
            KeyAction::Newline => self.insert('\n'),
            KeyAction::Insert(c) => self.insert(c),
            KeyAction::Backspace => {
                self.input.pop();
            }
            KeyAction::ScrollUp => {
                let page = self.conversation.page();
                self.conversation.scroll_up(page);
            }
            KeyAction::ScrollDown => {
                let page = self.conversation.page();
                self.conversation.scroll_down(page);
            }
            KeyAction::Ignore => {}
        }
        self.process_conductor_messages();
    }

    fn insert(&mut self, c: char) {
        if self.input.chars().count() < self.input_limit {
            self.input.push(c);
        }
    }

    async fn submit(&mut self) {
        if self.input.trim().is_empty() {
            return;
        }
        let message = std::mem::take(&mut self.input);
        if let Err(e) = self.conductor.send_message(message).await {
            tracing::warn!(error = %e, "Send failed");
        }
        self.conversation.scroll_to_bottom();
    }

    async fn request_quit(&mut self) {
        if let Err(e) = self.conductor.request_quit().await {
            tracing::warn!(error = %e, "Quit request failed");
        }
        self.process_conductor_messages();
        // Leave even if the Conductor never answered
        self.running = false;
    }

    fn copy_reply(&mut self) {
        let Some(text) = self.display.copy_text().map(str::to_owned) else {
            return;
        };
        match clipboard::copy_to(&mut io::stdout(), &text) {
            Ok(()) => self.display.mark_copied(),
            Err(e) => tracing::warn!(error = %e, "Clipboard write failed"),
        }
    }

    /// Update timers
    fn update(&mut self) {
        let now = Instant::now();
        let delta = now - self.last_frame;
        self.last_frame = now;
        self.display.update(delta);
    }

    /// Render the whole screen
    pub fn draw(&mut self, frame: &mut Frame) {
        let error_height = u16::from(self.display.error.is_some());
        let [header, banner, body, input, footer] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(error_height),
            Constraint::Min(1),
            Constraint::Length(INPUT_HEIGHT),
            Constraint::Length(1),
        ])
        .areas(frame.area());

        self.render_header(frame, header);
        if let Some(ref error) = self.display.error {
            frame.render_widget(
                Paragraph::new(format!(" Error: {error}"))
                    .style(Style::default().fg(ERROR_RED).add_modifier(Modifier::BOLD)),
                banner,
            );
        }
        frame.render_stateful_widget(
            Conversation::new(&self.display.messages, self.tick)
                .selected(self.display.selected.as_ref()),
            body,
            &mut self.conversation,
        );
        frame.render_widget(
            InputBox::new(&self.input, self.input_limit).enabled(!self.conductor.is_busy()),
            input,
        );
        self.render_footer(frame, footer);
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let (dot_color, status) = if self.display.connected {
            (SUCCESS_GREEN, "Connected")
        } else {
            (ERROR_RED, "Disconnected")
        };

        let left = Line::from(vec![
            Span::styled(" Streamchat", title_style()),
            Span::styled(format!("  {}", self.conductor.model()), dim_style()),
        ]);
        let right = Line::from(vec![
            Span::styled(
                format!("{}  ", self.display.conductor_state.description()),
                dim_style(),
            ),
            Span::styled("● ", Style::default().fg(dot_color)),
            Span::styled(format!("{status} "), Style::default().fg(dot_color)),
        ]);

        #[allow(clippy::cast_possible_truncation)]
        let right_width = right.width() as u16;
        let [left_area, right_area] =
            Layout::horizontal([Constraint::Min(0), Constraint::Length(right_width)]).areas(area);
        frame.render_widget(Paragraph::new(left), left_area);
        frame.render_widget(Paragraph::new(right), right_area);
    }

    fn render_footer(&self, frame: &mut Frame, area: Rect) {
        let line = if self.display.is_copied() {
            Line::from(Span::styled(" Copied!", Style::default().fg(SUCCESS_GREEN)))
        } else if let Some(ref n) = self.display.notification {
            let color = match n.level {
                NotifyLevel::Info => SUCCESS_GREEN,
                NotifyLevel::Warning => WARNING_YELLOW,
                NotifyLevel::Error => ERROR_RED,
            };
            Line::from(Span::styled(format!(" {}", n.message), Style::default().fg(color)))
        } else {
            Line::from(Span::styled(format!(" {HINTS}"), dim_style()))
        };
        frame.render_widget(Paragraph::new(line), area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    #[test]
    fn test_enter_submits_and_shift_enter_breaks_line() {
        assert_eq!(map_key(key(KeyCode::Enter), false), KeyAction::Submit);
        assert_eq!(
            map_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::SHIFT), false),
            KeyAction::Newline
        );
        assert_eq!(
            map_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::ALT), false),
            KeyAction::Newline
        );
    }

    #[test]
    fn test_escape_cancels_when_busy_and_quits_when_idle() {
        assert_eq!(map_key(key(KeyCode::Esc), true), KeyAction::Cancel);
        assert_eq!(map_key(key(KeyCode::Esc), false), KeyAction::Quit);
    }

    #[test]
    fn test_control_shortcuts() {
        assert_eq!(map_key(ctrl('c'), false), KeyAction::Quit);
        assert_eq!(map_key(ctrl('c'), true), KeyAction::Quit);
        assert_eq!(map_key(ctrl('l'), false), KeyAction::Clear);
        assert_eq!(map_key(ctrl('y'), false), KeyAction::Copy);
        assert_eq!(map_key(ctrl('x'), false), KeyAction::Ignore);
    }

    #[test]
    fn test_alt_arrows_pick_reply() {
        let alt = |code| KeyEvent::new(code, KeyModifiers::ALT);
        assert_eq!(map_key(alt(KeyCode::Up), false), KeyAction::SelectOlder);
        assert_eq!(map_key(alt(KeyCode::Down), false), KeyAction::SelectNewer);
        assert_eq!(map_key(key(KeyCode::Up), false), KeyAction::Ignore);
        assert_eq!(map_key(alt(KeyCode::Up), true), KeyAction::Ignore);
    }

    #[test]
    fn test_typing_is_ignored_while_busy() {
        assert_eq!(map_key(key(KeyCode::Char('a')), false), KeyAction::Insert('a'));
        assert_eq!(map_key(key(KeyCode::Char('a')), true), KeyAction::Ignore);
        assert_eq!(map_key(key(KeyCode::Enter), true), KeyAction::Ignore);
        assert_eq!(map_key(key(KeyCode::Backspace), true), KeyAction::Ignore);
        assert_eq!(map_key(ctrl('l'), true), KeyAction::Ignore);
    }

    #[test]
    fn test_scrolling_works_while_busy() {
        assert_eq!(map_key(key(KeyCode::PageUp), true), KeyAction::ScrollUp);
        assert_eq!(map_key(key(KeyCode::PageDown), true), KeyAction::ScrollDown);
    }

    #[test]
    fn test_shifted_capital_is_inserted() {
        assert_eq!(
            map_key(KeyEvent::new(KeyCode::Char('A'), KeyModifiers::SHIFT), false),
            KeyAction::Insert('A')
        );
    }
}
