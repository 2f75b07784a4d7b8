//! Configuration for the chat client
//!
//! Configuration is loaded in order of precedence:
//! 1. Environment variables (highest priority)
//! 2. Config file (~/.config/shopchat/config.toml)
//! 3. Built-in defaults (lowest priority)

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

// ─────────────────────────────────────────────────────────────────────────────
// Submodules
// ─────────────────────────────────────────────────────────────────────────────

mod observability;
mod serialization;
pub mod transport;


// ─────────────────────────────────────────────────────────────────────────────
// Re-exports
// ─────────────────────────────────────────────────────────────────────────────

pub use observability::{FileLogging, LogRotation, LoggingConfig};
pub use transport::Transport;

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Backend origin used when neither env nor file provide one
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// Fixed delay before a dropped chat socket is reopened
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 1500;

// ─────────────────────────────────────────────────────────────────────────────
// Session Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Realtime session settings
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Delay between a socket close and the next connect attempt.
    /// Fixed: there is no backoff growth and no retry cap.
    pub reconnect_delay_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
        }
    }
}

impl SessionConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    fn from_file(file: Option<FileSession>) -> Self {
        let file = file.unwrap_or_default();
        let defaults = Self::default();

        Self {
            reconnect_delay_ms: file
                .reconnect_delay_ms
                .unwrap_or(defaults.reconnect_delay_ms),
        }
    }
}

/// Session settings as loaded from config file
#[derive(Debug, Deserialize, Default)]
pub struct FileSession {
    pub reconnect_delay_ms: Option<u64>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Application Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Single configured backend origin; HTTP and WebSocket bases derive from it
    pub backend_url: String,

    /// Directory holding the cookie jar and local storage files
    pub data_dir: PathBuf,

    /// Whether to run the TUI (disabled = line-oriented headless mode)
    pub enable_tui: bool,

    /// Realtime session settings
    pub session: SessionConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = default_data_dir();
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            logging: LoggingConfig::under(&data_dir),
            data_dir,
            enable_tui: true,
            session: SessionConfig::default(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|p| p.join("shopchat"))
        .unwrap_or_else(|| PathBuf::from("./.shopchat"))
}

// ─────────────────────────────────────────────────────────────────────────────
// File Configuration (deserialization layer)
// ─────────────────────────────────────────────────────────────────────────────

/// Config file structure (subset of Config that makes sense to persist)
#[derive(Debug, Deserialize, Default)]
pub(crate) struct FileConfig {
    pub backend_url: Option<String>,
    pub data_dir: Option<String>,

    /// Optional [session] section
    pub session: Option<FileSession>,

    /// Optional [logging] section
    pub logging: Option<FileLogging>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration Loading
// ─────────────────────────────────────────────────────────────────────────────

impl Config {
    /// Get the config file path: ~/.config/shopchat/config.toml
    /// Uses Unix-style ~/.config on all platforms for consistency
    pub fn config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|p| p.join(".config").join("shopchat").join("config.toml"))
    }

    /// Create config file with defaults if it doesn't exist
    pub fn ensure_config_exists() {
        let Some(path) = Self::config_path() else {
            return;
        };

        if path.exists() {
            return;
        }

        if let Some(parent) = path.parent() {
            if std::fs::create_dir_all(parent).is_err() {
                return; // config is optional
            }
        }

        let _ = std::fs::write(&path, Self::default().to_toml());
    }

    /// Load file config if it exists
    ///
    /// A config file that exists but cannot be parsed is a startup error:
    /// the caller reports it and exits.
    fn load_file_config() -> anyhow::Result<FileConfig> {
        let Some(path) = Self::config_path() else {
            return Ok(FileConfig::default());
        };

        match std::fs::read_to_string(&path) {
            Ok(contents) => toml::from_str(&contents).map_err(|e| {
                anyhow::anyhow!(
                    "failed to parse configuration file {}: {}\n\
                     Check for missing quotes, invalid booleans or typos in section names.",
                    path.display(),
                    e
                )
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FileConfig::default()),
            Err(e) => Err(anyhow::anyhow!(
                "cannot read configuration file {}: {}",
                path.display(),
                e
            )),
        }
    }

    /// Load configuration: env vars -> file -> defaults
    pub fn from_env() -> anyhow::Result<Self> {
        let file = Self::load_file_config()?;
        Ok(Self::resolve(file, |key| std::env::var(key).ok()))
    }

    /// Merge file values with environment overrides.
    ///
    /// `env` is injected so precedence can be tested without touching the
    /// process environment.
    pub(crate) fn resolve(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Self {
        let backend_url = env("SHOPCHAT_BACKEND_URL")
            .or(file.backend_url)
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());

        let data_dir = env("SHOPCHAT_DATA_DIR")
            .or(file.data_dir)
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        // TUI toggle: env only (runtime flag)
        let enable_tui = env("SHOPCHAT_NO_TUI")
            .map(|v| v != "1" && v.to_lowercase() != "true")
            .unwrap_or(true);

        let session = SessionConfig::from_file(file.session);
        let logging = LoggingConfig::from_file(file.logging, &data_dir);

        Self {
            backend_url,
            data_dir,
            enable_tui,
            session,
            logging,
        }
    }

    /// Resolve HTTP and WebSocket bases from the configured origin
    pub fn transport(&self) -> Result<Transport, transport::TransportConfigError> {
        Transport::from_origin(&self.backend_url)
    }
}
