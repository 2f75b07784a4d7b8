//! `[logging]` section: filter level and optional JSON log files
//!
//! Values are checked while the file is parsed, so a typo in `level` or
//! `file_rotation` fails config loading with the offending value in the
//! message instead of quietly logging at some other level.

use serde::{de, Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use tracing_subscriber::filter::LevelFilter;

/// Accepted values for `level`, as shown in error messages
const LEVEL_NAMES: &str = "trace, debug, info, warn, error, off";

/// How often the log file rolls over
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Hourly,
    #[default]
    Daily,
    /// One file for the lifetime of the data directory
    Never,
}

impl LogRotation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Never => "never",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Lowercase level name; becomes the `shopchat=<level>` filter directive
    pub level: String,
    /// Write JSON logs to `file_dir` next to the TUI buffer or stderr
    pub file_enabled: bool,
    pub file_dir: PathBuf,
    pub file_rotation: LogRotation,
    /// File name stem, e.g. `shopchat.2024-01-15`
    pub file_prefix: String,
}

impl LoggingConfig {
    /// Defaults, with log files kept under the client's data directory
    pub fn under(data_dir: &Path) -> Self {
        Self {
            level: "info".to_string(),
            file_enabled: false,
            file_dir: data_dir.join("logs"),
            file_rotation: LogRotation::Daily,
            file_prefix: "shopchat".to_string(),
        }
    }

    /// Overlay the file section on the defaults for `data_dir`
    pub fn from_file(file: Option<FileLogging>, data_dir: &Path) -> Self {
        let file = file.unwrap_or_default();
        let defaults = Self::under(data_dir);

        Self {
            level: file.level.unwrap_or(defaults.level),
            file_enabled: file.file_enabled.unwrap_or(defaults.file_enabled),
            file_dir: file.file_dir.map(PathBuf::from).unwrap_or(defaults.file_dir),
            file_rotation: file.file_rotation.unwrap_or(defaults.file_rotation),
            file_prefix: file.file_prefix.unwrap_or(defaults.file_prefix),
        }
    }
}

/// `[logging]` as written in the config file
#[derive(Debug, Deserialize, Default)]
pub struct FileLogging {
    #[serde(default, deserialize_with = "level_name")]
    pub level: Option<String>,
    pub file_enabled: Option<bool>,
    pub file_dir: Option<String>,
    pub file_rotation: Option<LogRotation>,
    pub file_prefix: Option<String>,
}

fn level_name<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    match raw.trim().parse::<LevelFilter>() {
        Ok(_) => Ok(Some(raw.trim().to_lowercase())),
        Err(_) => Err(de::Error::custom(format!(
            "unknown log level {:?}, expected one of {}",
            raw, LEVEL_NAMES
        ))),
    }
}
