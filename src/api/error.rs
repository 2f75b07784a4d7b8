//! REST error types

use crate::auth::store::StoreError;
use serde_json::Value;

/// Errors that can occur while talking to the backend
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// 401 from any endpoint; the session has already been invalidated
    #[error("not authorized, please sign in again")]
    Unauthorized,

    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Pull a human-readable message out of an error body.
///
/// Backends answer with `{"message": ...}` or `{"detail": ...}` where
/// `detail` may itself be structured; anything else is shown as-is.
pub(crate) fn error_message(body: &str) -> String {
    let trimmed = body.trim();
    let Ok(json) = serde_json::from_str::<Value>(trimmed) else {
        return trimmed.to_string();
    };

    for key in ["message", "detail"] {
        match json.get(key) {
            Some(Value::String(s)) => return s.clone(),
            Some(Value::Null) | None => {}
            Some(other) => return other.to_string(),
        }
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_prefers_message_then_detail() {
        assert_eq!(error_message(r#"{"message":"nope","detail":"x"}"#), "nope");
        assert_eq!(error_message(r#"{"detail":"Email taken"}"#), "Email taken");
        assert_eq!(
            error_message(r#"{"detail":[{"msg":"field required"}]}"#),
            r#"[{"msg":"field required"}]"#
        );
        assert_eq!(error_message("Bad Gateway\n"), "Bad Gateway");
    }
}
