// Conversation bootstrap - create + activate a conversation on first send

use super::session::{ConversationHandle, SessionHandle};
use async_trait::async_trait;
use serde_json::Value;

/// Longest title kept as-is
pub const MAX_TITLE_CHARS: usize = 60;

const TITLE_ELLIPSIS: &str = "...";

/// Shown in the transcript when a conversation could not be started
pub const BOOTSTRAP_FAILED_MESSAGE: &str =
    "Sorry, I couldn't start a new conversation. Please try again.";

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("failed to create conversation: {0}")]
    Create(String),
    #[error("create response carried no conversation id: {0}")]
    MissingId(Value),
    #[error("failed to activate conversation {id}: {message}")]
    Activate { id: String, message: String },
}

/// The two backend calls a bootstrap needs
#[async_trait]
pub trait ConversationApi: Send + Sync {
    async fn create_conversation(&self, title: &str) -> Result<Value, String>;
    async fn activate_conversation(&self, id: &str) -> Result<(), String>;
}

/// Conversation title from the first user message.
///
/// Whitespace runs collapse to one space; anything over the limit keeps the
/// first 57 characters and gains `...`.
pub fn derive_title(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= MAX_TITLE_CHARS {
        return collapsed;
    }
    let keep = MAX_TITLE_CHARS - TITLE_ELLIPSIS.len();
    let mut title: String = collapsed.chars().take(keep).collect();
    title.push_str(TITLE_ELLIPSIS);
    title
}

/// Conversation id from a create response: `id` or `data.id`, string or number
pub fn extract_id(response: &Value) -> Option<String> {
    let id = response
        .get("id")
        .or_else(|| response.get("data").and_then(|d| d.get("id")))?;
    match id {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Create and activate a conversation for `first_message`, then point the
/// session at it and wait for the socket handshake. A failed handshake is
/// not an error here: the session reports it and keeps retrying.
pub async fn bootstrap(
    api: &dyn ConversationApi,
    session: &SessionHandle,
    first_message: &str,
) -> Result<ConversationHandle, BootstrapError> {
    let title = derive_title(first_message);
    tracing::info!("Starting conversation: {}", title);

    let response = api
        .create_conversation(&title)
        .await
        .map_err(BootstrapError::Create)?;
    let id = extract_id(&response).ok_or(BootstrapError::MissingId(response))?;

    api.activate_conversation(&id)
        .await
        .map_err(|message| BootstrapError::Activate {
            id: id.clone(),
            message,
        })?;

    let handle = ConversationHandle { id };
    session.activate(handle.clone());
    let state = session.open().await;
    tracing::debug!("Conversation {} socket {}", handle.id, state.label());
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::session::tests::{signed_in_auth, spawn_session, MemoryConnector};
    use crate::chat::session::ConnectionState;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct StubApi {
        create_response: Option<Value>,
        fail_activate: bool,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ConversationApi for StubApi {
        async fn create_conversation(&self, title: &str) -> Result<Value, String> {
            self.calls.lock().unwrap().push(format!("create:{}", title));
            self.create_response
                .clone()
                .ok_or_else(|| "backend down".to_string())
        }

        async fn activate_conversation(&self, id: &str) -> Result<(), String> {
            self.calls.lock().unwrap().push(format!("activate:{}", id));
            if self.fail_activate {
                Err("not found".to_string())
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn test_short_title_kept() {
        assert_eq!(derive_title("  red   running\tshoes "), "red running shoes");
        let exact = "a".repeat(60);
        assert_eq!(derive_title(&exact), exact);
    }

    #[test]
    fn test_long_title_truncated_to_sixty() {
        let long = "b".repeat(61);
        let title = derive_title(&long);
        assert_eq!(title.chars().count(), 60);
        assert_eq!(title, format!("{}...", "b".repeat(57)));
    }

    #[test]
    fn test_title_counts_characters_not_bytes() {
        let long = "ü".repeat(70);
        let title = derive_title(&long);
        assert_eq!(title, format!("{}...", "ü".repeat(57)));
    }

    #[test]
    fn test_extract_id_shapes() {
        assert_eq!(extract_id(&json!({"id": "c-1"})), Some("c-1".to_string()));
        assert_eq!(extract_id(&json!({"id": 42})), Some("42".to_string()));
        assert_eq!(
            extract_id(&json!({"data": {"id": "nested"}})),
            Some("nested".to_string())
        );
        assert_eq!(extract_id(&json!({"id": ""})), None);
        assert_eq!(extract_id(&json!({"title": "x"})), None);
    }

    #[tokio::test]
    async fn test_bootstrap_creates_activates_and_connects() {
        let api = StubApi {
            create_response: Some(json!({"data": {"id": 7}})),
            ..Default::default()
        };
        let (connector, mut servers) = MemoryConnector::new();
        let (session, _events) = spawn_session(connector, signed_in_auth());

        let handle = bootstrap(&api, &session, "find me shoes").await.unwrap();

        assert_eq!(handle.id, "7");
        assert_eq!(
            *api.calls.lock().unwrap(),
            vec!["create:find me shoes".to_string(), "activate:7".to_string()]
        );
        let _server = servers.recv().await.unwrap();
        assert_eq!(session.state(), ConnectionState::Open);
    }

    #[tokio::test]
    async fn test_bootstrap_failures_do_not_connect() {
        let (connector, _servers) = MemoryConnector::new();
        let (session, _events) = spawn_session(connector.clone(), signed_in_auth());

        let down = StubApi::default();
        let result = bootstrap(&down, &session, "hi").await;
        assert!(matches!(result, Err(BootstrapError::Create(_))));

        let no_id = StubApi {
            create_response: Some(json!({"ok": true})),
            ..Default::default()
        };
        let result = bootstrap(&no_id, &session, "hi").await;
        assert!(matches!(result, Err(BootstrapError::MissingId(_))));

        let inactive = StubApi {
            create_response: Some(json!({"id": "c-9"})),
            fail_activate: true,
            ..Default::default()
        };
        let result = bootstrap(&inactive, &session, "hi").await;
        assert!(matches!(result, Err(BootstrapError::Activate { .. })));

        assert_eq!(connector.attempts(), 0);
        assert_eq!(session.state(), ConnectionState::Idle);
    }
}
