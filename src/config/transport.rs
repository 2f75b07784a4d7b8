//! Transport base resolution
//!
//! Everything the client talks to hangs off one configured origin. The HTTP
//! base is that origin without a trailing slash; the WebSocket base swaps
//! `http` for `ws` and `https` for `wss`.

use url::Url;

/// Path of the realtime chat endpoint under the WebSocket base
pub const CHAT_SOCKET_PATH: &str = "/ws/chat";

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TransportConfigError {
    #[error("backend URL is empty")]
    Missing,
    #[error("backend URL must start with http:// or https://, got {0:?}")]
    UnsupportedScheme(String),
    #[error("backend URL is not a valid URL: {0}")]
    Invalid(String),
}

/// HTTP and WebSocket bases derived from the backend origin
#[derive(Debug, Clone, PartialEq)]
pub struct Transport {
    http_base: String,
    ws_base: String,
}

impl Transport {
    pub fn from_origin(origin: &str) -> Result<Self, TransportConfigError> {
        let trimmed = origin.trim();
        if trimmed.is_empty() {
            return Err(TransportConfigError::Missing);
        }

        let http_base = trimmed.strip_suffix('/').unwrap_or(trimmed).to_string();
        let parsed =
            Url::parse(&http_base).map_err(|e| TransportConfigError::Invalid(e.to_string()))?;

        // Url lowercases the scheme; the original text keeps the same byte length
        let ws_base = match parsed.scheme() {
            "https" => format!("wss{}", &http_base["https".len()..]),
            "http" => format!("ws{}", &http_base["http".len()..]),
            _ => return Err(TransportConfigError::UnsupportedScheme(http_base)),
        };

        Ok(Self { http_base, ws_base })
    }

    /// Origin for REST calls, no trailing slash
    pub fn http_base(&self) -> &str {
        &self.http_base
    }

    /// Origin for the realtime socket, no trailing slash
    pub fn ws_base(&self) -> &str {
        &self.ws_base
    }

    /// Absolute URL for a REST path such as `/api/v1/auth/login`
    pub fn http_url(&self, path: &str) -> String {
        format!("{}{}", self.http_base, path)
    }

    /// Chat socket URL with the bearer token as the `token` query parameter
    pub fn chat_socket_url(&self, token: &str) -> String {
        format!(
            "{}{}?token={}",
            self.ws_base,
            CHAT_SOCKET_PATH,
            urlencoding::encode(token)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_origin_maps_to_ws() {
        let t = Transport::from_origin("http://localhost:8000/").unwrap();
        assert_eq!(t.http_base(), "http://localhost:8000");
        assert_eq!(t.ws_base(), "ws://localhost:8000");
    }

    #[test]
    fn test_https_origin_maps_to_wss() {
        let t = Transport::from_origin("HTTPS://api.example.com").unwrap();
        assert_eq!(t.ws_base(), "wss://api.example.com");
    }

    #[test]
    fn test_chat_socket_url_encodes_token() {
        let t = Transport::from_origin("https://api.example.com").unwrap();
        assert_eq!(
            t.chat_socket_url("a b+c/="),
            "wss://api.example.com/ws/chat?token=a%20b%2Bc%2F%3D"
        );
    }

    #[test]
    fn test_rejects_missing_and_non_http_origins() {
        assert_eq!(
            Transport::from_origin("  "),
            Err(TransportConfigError::Missing)
        );
        assert!(matches!(
            Transport::from_origin("ftp://example.com"),
            Err(TransportConfigError::UnsupportedScheme(_))
        ));
    }
}
