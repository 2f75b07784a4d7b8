// shopchat - terminal client for the shopping assistant
//
// Signs the user in against the assistant backend, then holds a realtime
// chat session: messages go out over a WebSocket, replies and product
// suggestions come back on the same socket.
//
// Architecture:
// - auth: token stores and the shared sign-in state
// - api (reqwest): REST calls for accounts and conversations
// - chat: socket session actor, frame codec, transcript state, controller
// - tui (ratatui) / repl: full-screen and line-oriented front-ends
// - routes: which screens need a signed-in user

mod api;
mod auth;
mod chat;
mod cli;
mod config;
mod logging;
mod repl;
mod routes;
mod startup;
mod tui;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use config::{Config, LogRotation, LoggingConfig};
use logging::{LogBuffer, TuiLogLayer};
use std::io::IsTerminal;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Rolling JSON file writer, if file logging is enabled and the directory is usable
fn file_writer(
    logging: &LoggingConfig,
) -> Option<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    if !logging.file_enabled {
        return None;
    }
    if let Err(e) = std::fs::create_dir_all(&logging.file_dir) {
        eprintln!(
            "Warning: Could not create log directory {:?}: {}",
            logging.file_dir, e
        );
        return None;
    }

    let appender = match logging.file_rotation {
        LogRotation::Hourly => {
            tracing_appender::rolling::hourly(&logging.file_dir, &logging.file_prefix)
        }
        LogRotation::Daily => {
            tracing_appender::rolling::daily(&logging.file_dir, &logging.file_prefix)
        }
        LogRotation::Never => {
            tracing_appender::rolling::never(&logging.file_dir, &logging.file_prefix)
        }
    };

    // Writes happen on a background thread; the guard flushes on drop
    Some(tracing_appender::non_blocking(appender))
}

/// Install the global subscriber.
///
/// In TUI mode logs go to the in-memory buffer (stderr would garble the
/// screen); otherwise to stderr so stdout stays clean for chat output.
/// Precedence: RUST_LOG env var > config file > default "info".
fn init_tracing(config: &Config, use_tui: bool, log_buffer: &LogBuffer) -> Option<WorkerGuard> {
    let default_filter = format!("shopchat={}", config.logging.level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    let (file_layer, guard) = match file_writer(&config.logging) {
        Some((writer, guard)) => (
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_ansi(false),
            ),
            Some(guard),
        ),
        None => (None, None),
    };

    let tui_layer = use_tui.then(|| TuiLogLayer::new(log_buffer.clone()));
    let stderr_layer =
        (!use_tui).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(tui_layer)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config commands run before anything is loaded, so a broken config
    // file can still be reset or edited
    if cli::handle_config_command(cli.command.as_ref()) {
        return Ok(());
    }

    // Ensure config template exists (helps users discover options)
    Config::ensure_config_exists();

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    // Piped output gets the line-oriented front-end
    if !std::io::stdout().is_terminal() {
        config.enable_tui = false;
    }
    let use_tui = Commands::uses_tui(cli.command.as_ref(), &config);

    let log_buffer = LogBuffer::new();
    let file_guard = init_tracing(&config, use_tui, &log_buffer);

    tracing::debug!(
        "Starting (backend: {}, tui: {})",
        config.backend_url,
        use_tui
    );

    if let Err(e) = cli::run(cli.command, config, log_buffer).await {
        tracing::debug!("Exiting with error: {:?}", e);
        eprintln!("Error: {:#}", e);
        drop(file_guard);
        std::process::exit(1);
    }

    tracing::debug!("Shutdown complete");
    drop(file_guard);
    Ok(())
}
