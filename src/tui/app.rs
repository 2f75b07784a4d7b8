// TUI application state
//
// Everything the chat screen needs besides the transcript itself: the
// draft being typed, which product option is highlighted, scroll position
// and the log strip. Key handling is pure; it turns key presses into
// `Intent`s that the event loop hands to the chat controller.

use crate::chat::ConnectionState;
use crate::logging::LogBuffer;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::time::{Duration, Instant};

/// Lines moved per PageUp/PageDown
const PAGE_LINES: usize = 10;

/// Spinner frames for the typing indicator
const SPINNER: [&str; 4] = ["·  ", "·· ", "···", " ··"];

/// Debounce for Enter, so terminals without release events do not double-submit
const SUBMIT_DEBOUNCE: Duration = Duration::from_millis(150);

/// What the user asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Submit(String),
    Select(usize),
    FindSimilar(usize),
    NewChat,
    Quit,
}

pub struct App {
    /// Draft message
    pub input: String,

    /// Highlighted product option, if any
    pub selected_option: Option<usize>,

    /// Lines scrolled up from the bottom of the transcript
    pub scroll_back: usize,

    /// Whether the log strip is visible
    pub show_logs: bool,

    /// Latest socket state, for the title bar
    pub connection: ConnectionState,

    pub log_buffer: LogBuffer,

    /// Animation frame counter
    frame: usize,

    last_submit: Option<Instant>,
}

impl App {
    pub fn new(log_buffer: LogBuffer) -> Self {
        Self {
            input: String::new(),
            selected_option: None,
            scroll_back: 0,
            show_logs: true,
            connection: ConnectionState::Idle,
            log_buffer,
            frame: 0,
            last_submit: None,
        }
    }

    pub fn tick_animation(&mut self) {
        self.frame = self.frame.wrapping_add(1);
    }

    pub fn spinner(&self) -> &'static str {
        SPINNER[self.frame % SPINNER.len()]
    }

    /// Forget a highlight that no longer points at an option
    pub fn clamp_selection(&mut self, option_count: usize) {
        if self.selected_option.is_some_and(|i| i >= option_count) {
            self.selected_option = None;
        }
    }

    fn cycle_option(&mut self, option_count: usize, forward: bool) {
        if option_count == 0 {
            self.selected_option = None;
            return;
        }
        self.selected_option = Some(match (self.selected_option, forward) {
            (None, true) => 0,
            (None, false) => option_count - 1,
            (Some(i), true) => (i + 1) % option_count,
            (Some(i), false) => (i + option_count - 1) % option_count,
        });
    }

    fn submit_allowed(&mut self) -> bool {
        let now = Instant::now();
        if self
            .last_submit
            .is_some_and(|last| now.duration_since(last) < SUBMIT_DEBOUNCE)
        {
            return false;
        }
        self.last_submit = Some(now);
        true
    }

    /// Apply a key press; `option_count` is the number of product options
    /// currently on screen.
    pub fn handle_key(&mut self, key: KeyEvent, option_count: usize) -> Option<Intent> {
        if key.kind != KeyEventKind::Press {
            return None;
        }
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        match key.code {
            KeyCode::Char('c') | KeyCode::Char('q') if ctrl => Some(Intent::Quit),
            KeyCode::Char('n') if ctrl => {
                self.input.clear();
                self.selected_option = None;
                self.scroll_back = 0;
                Some(Intent::NewChat)
            }
            KeyCode::Char('f') if ctrl => self.selected_option.map(Intent::FindSimilar),
            KeyCode::Char('l') if ctrl => {
                self.show_logs = !self.show_logs;
                None
            }
            KeyCode::Char(c) => {
                self.input.push(c);
                None
            }
            KeyCode::Backspace => {
                self.input.pop();
                None
            }
            KeyCode::Tab | KeyCode::Down => {
                self.cycle_option(option_count, true);
                None
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.cycle_option(option_count, false);
                None
            }
            KeyCode::PageUp => {
                self.scroll_back = self.scroll_back.saturating_add(PAGE_LINES);
                None
            }
            KeyCode::PageDown => {
                self.scroll_back = self.scroll_back.saturating_sub(PAGE_LINES);
                None
            }
            KeyCode::Esc => {
                if self.selected_option.is_some() {
                    self.selected_option = None;
                } else {
                    self.input.clear();
                }
                None
            }
            KeyCode::Enter => {
                if !self.submit_allowed() {
                    return None;
                }
                if self.input.trim().is_empty() {
                    let index = self.selected_option.take()?;
                    return Some(Intent::Select(index));
                }
                self.scroll_back = 0;
                self.selected_option = None;
                Some(Intent::Submit(std::mem::take(&mut self.input)))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.handle_key(press(KeyCode::Char(c)), 0);
        }
    }

    #[test]
    fn test_enter_submits_and_clears_draft() {
        let mut app = App::new(LogBuffer::new());
        type_text(&mut app, "hi there");
        app.handle_key(press(KeyCode::Backspace), 0);

        let intent = app.handle_key(press(KeyCode::Enter), 0);
        assert_eq!(intent, Some(Intent::Submit("hi ther".to_string())));
        assert!(app.input.is_empty());
    }

    #[test]
    fn test_enter_on_empty_draft_selects_highlighted_option() {
        let mut app = App::new(LogBuffer::new());
        assert_eq!(app.handle_key(press(KeyCode::Enter), 3), None);

        app.last_submit = None;
        app.handle_key(press(KeyCode::Tab), 3);
        app.handle_key(press(KeyCode::Tab), 3);
        assert_eq!(app.selected_option, Some(1));

        let intent = app.handle_key(press(KeyCode::Enter), 3);
        assert_eq!(intent, Some(Intent::Select(1)));
        assert_eq!(app.selected_option, None);
    }

    #[test]
    fn test_option_cycling_wraps() {
        let mut app = App::new(LogBuffer::new());
        app.handle_key(press(KeyCode::Up), 3);
        assert_eq!(app.selected_option, Some(2));
        app.handle_key(press(KeyCode::Down), 3);
        assert_eq!(app.selected_option, Some(0));
        app.handle_key(press(KeyCode::Tab), 0);
        assert_eq!(app.selected_option, None);
    }

    #[test]
    fn test_find_similar_needs_a_highlight() {
        let mut app = App::new(LogBuffer::new());
        assert_eq!(app.handle_key(ctrl('f'), 2), None);
        app.handle_key(press(KeyCode::Tab), 2);
        assert_eq!(app.handle_key(ctrl('f'), 2), Some(Intent::FindSimilar(0)));
    }

    #[test]
    fn test_ctrl_c_quits() {
        let mut app = App::new(LogBuffer::new());
        assert_eq!(app.handle_key(ctrl('c'), 0), Some(Intent::Quit));
        assert_eq!(app.handle_key(ctrl('q'), 0), Some(Intent::Quit));
    }

    #[test]
    fn test_clamp_selection_after_options_shrink() {
        let mut app = App::new(LogBuffer::new());
        app.selected_option = Some(4);
        app.clamp_selection(2);
        assert_eq!(app.selected_option, None);
    }
}
