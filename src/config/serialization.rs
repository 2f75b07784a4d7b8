//! Config serialization to TOML
//!
//! Single source of truth for config file format.

use super::Config;

impl Config {
    /// Render the config as a commented TOML document
    pub fn to_toml(&self) -> String {
        format!(
            r#"# shopchat configuration
#
# Precedence: environment variables > this file > built-in defaults
#   SHOPCHAT_BACKEND_URL  overrides backend_url
#   SHOPCHAT_DATA_DIR     overrides data_dir
#   SHOPCHAT_NO_TUI=1     runs the line-oriented client instead of the TUI

# Backend origin. REST calls go to this origin, the chat socket to its ws/wss twin.
backend_url = {backend_url:?}

# Where the cookie jar and local storage files live
data_dir = {data_dir:?}

[session]
# Fixed delay before a dropped chat socket is reopened (no backoff, no cap)
reconnect_delay_ms = {reconnect_delay_ms}

[logging]
level = {level:?}
file_enabled = {file_enabled}
file_dir = {file_dir:?}
file_rotation = "{file_rotation}"   # hourly | daily | never
file_prefix = {file_prefix:?}
"#,
            backend_url = self.backend_url,
            data_dir = self.data_dir.display().to_string(),
            reconnect_delay_ms = self.session.reconnect_delay_ms,
            level = self.logging.level,
            file_enabled = self.logging.file_enabled,
            file_dir = self.logging.file_dir.display().to_string(),
            file_rotation = self.logging.file_rotation.as_str(),
            file_prefix = self.logging.file_prefix,
        )
    }
}
