// TUI module - terminal chat front-end
//
// This module manages the terminal UI using ratatui. It handles:
// - Terminal initialization and cleanup
// - Event loop (keyboard input, timer ticks, session events)
// - Routing user intents to the chat controller

pub mod app;
pub mod ui;

use crate::chat::{ChatController, SessionEvent};
use crate::logging::LogBuffer;
use crate::routes::LOGIN_PATH;
use anyhow::{Context, Result};
use app::{App, Intent};
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::time::Duration;
use tokio::sync::mpsc;

/// Why the front-end stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exit {
    Quit,
    /// The session was invalidated; the user has to sign in again
    LoginRequired,
}

type ChatTerminal = Terminal<CrosstermBackend<io::Stdout>>;

/// Run the TUI until the user quits or the session is invalidated
pub async fn run_tui(
    controller: &mut ChatController,
    events: &mut mpsc::UnboundedReceiver<SessionEvent>,
    navigation: &mut mpsc::UnboundedReceiver<String>,
    log_buffer: LogBuffer,
) -> Result<Exit> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to setup terminal")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("Failed to create terminal")?;

    let mut app = App::new(log_buffer);
    let result = run_event_loop(&mut terminal, &mut app, controller, events, navigation).await;

    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("Failed to restore terminal")?;
    terminal.show_cursor().context("Failed to show cursor")?;

    result
}

fn draw(terminal: &mut ChatTerminal, app: &App, controller: &ChatController) -> Result<()> {
    let conversation = controller.conversation().map(|c| c.id.as_str());
    terminal
        .draw(|f| ui::draw(f, app, controller.state(), conversation))
        .context("Failed to draw terminal")?;
    Ok(())
}

/// Keyboard input, if any arrived within a short poll window
async fn poll_input() -> Option<Event> {
    if event::poll(Duration::from_millis(10)).unwrap_or(false) {
        event::read().ok()
    } else {
        None
    }
}

async fn run_event_loop(
    terminal: &mut ChatTerminal,
    app: &mut App,
    controller: &mut ChatController,
    events: &mut mpsc::UnboundedReceiver<SessionEvent>,
    navigation: &mut mpsc::UnboundedReceiver<String>,
) -> Result<Exit> {
    let mut tick_interval = tokio::time::interval(Duration::from_millis(200));
    let mut connection = controller.session().watch_state();

    loop {
        app.connection = *connection.borrow_and_update();
        app.clamp_selection(controller.state().product_options().len());
        draw(terminal, app, controller)?;

        let mut intent = None;
        tokio::select! {
            input = poll_input() => {
                if let Some(Event::Key(key)) = input {
                    let option_count = controller.state().product_options().len();
                    intent = app.handle_key(key, option_count);
                }
            }

            _ = tick_interval.tick() => app.tick_animation(),

            Some(event) = events.recv() => controller.handle_event(event),

            Ok(()) = connection.changed() => {}

            Some(path) = navigation.recv() => {
                if path == LOGIN_PATH {
                    tracing::warn!("Session ended, returning to login");
                    return Ok(Exit::LoginRequired);
                }
            }
        }

        let Some(intent) = intent else {
            continue;
        };

        // Clear the input box before a possibly slow round trip
        draw(terminal, app, controller)?;
        match intent {
            Intent::Quit => return Ok(Exit::Quit),
            Intent::Submit(text) => controller.submit(&text).await,
            Intent::Select(index) => {
                controller.select_product(index);
            }
            Intent::FindSimilar(index) => {
                controller.find_similar(index).await;
            }
            Intent::NewChat => controller.new_chat(),
        }
    }
}
