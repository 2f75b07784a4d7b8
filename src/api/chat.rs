//! Conversation history and product search endpoints

use super::client::{decode, unwrap_data, ApiClient};
use super::error::ApiError;
use crate::chat::bootstrap::ConversationApi;
use crate::chat::frame::ProductOption;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};

pub const CONVERSATIONS_PATH: &str = "/api/v1/chat/history/conversations";
pub const FIND_SIMILAR_PATH: &str = "/api/v1/chat/find-similar-products";

/// Ids arrive as strings from some deployments and numbers from others
fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Conversation {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Conversation {
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or("Untitled conversation")
    }
}

/// A stored message as the history endpoint returns it
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryMessage {
    #[serde(default, alias = "text", alias = "message")]
    pub content: String,
    #[serde(default, alias = "isUser")]
    pub is_user: Option<bool>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default, alias = "created_at")]
    pub timestamp: Option<String>,
}

impl HistoryMessage {
    /// Explicit flag wins; otherwise a `user` role marks the user's side
    pub fn from_user(&self) -> bool {
        self.is_user
            .unwrap_or_else(|| self.role.as_deref() == Some("user"))
    }

    /// Server timestamp, RFC 3339 or naive (taken as UTC)
    pub fn at(&self) -> Option<DateTime<Utc>> {
        let raw = self.timestamp.as_deref()?;
        if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
            return Some(at.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }
}

impl ApiClient {
    pub async fn list_conversations(&self) -> Result<Vec<Conversation>, ApiError> {
        let body = self.get_json(CONVERSATIONS_PATH).await?;
        decode(unwrap_data(body))
    }

    pub async fn create_conversation(&self, title: &str) -> Result<Value, ApiError> {
        self.post_json(CONVERSATIONS_PATH, &json!({ "title": title }))
            .await
    }

    pub async fn conversation_messages(&self, id: &str) -> Result<Vec<HistoryMessage>, ApiError> {
        let path = format!(
            "{}/{}/messages",
            CONVERSATIONS_PATH,
            urlencoding::encode(id)
        );
        let body = self.get_json(&path).await?;
        decode(unwrap_data(body))
    }

    pub async fn activate_conversation(&self, id: &str) -> Result<Value, ApiError> {
        let path = format!("{}/{}/activate", CONVERSATIONS_PATH, urlencoding::encode(id));
        self.post_json(&path, &json!({})).await
    }

    pub async fn find_similar_products(&self, option: &ProductOption) -> Result<Value, ApiError> {
        let body = json!({
            "name": option.title,
            "image": option.image,
            "platform": option.platform,
        });
        self.post_json(FIND_SIMILAR_PATH, &body).await
    }
}

#[async_trait]
impl ConversationApi for ApiClient {
    async fn create_conversation(&self, title: &str) -> Result<Value, String> {
        ApiClient::create_conversation(self, title)
            .await
            .map_err(|e| e.to_string())
    }

    async fn activate_conversation(&self, id: &str) -> Result<(), String> {
        ApiClient::activate_conversation(self, id)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::tests::{client_for, spawn_backend};
    use axum::extract::Path;
    use axum::routing::{get, post};
    use axum::{Json, Router};

    #[tokio::test]
    async fn test_conversation_lifecycle_paths() {
        let router = Router::new()
            .route(
                CONVERSATIONS_PATH,
                post(|Json(body): Json<Value>| async move {
                    Json(json!({ "id": 12, "title": body["title"] }))
                })
                .get(|| async {
                    Json(json!([
                        { "id": 12, "title": "Shoes", "created_at": "t", "updated_at": "t" },
                        { "id": "c-2" }
                    ]))
                }),
            )
            .route(
                "/api/v1/chat/history/conversations/:id/activate",
                post(|Path(id): Path<String>| async move { Json(json!({ "activated": id })) }),
            );
        let origin = spawn_backend(router).await;
        let (client, _) = client_for(&origin);

        let created = client.create_conversation("Shoes").await.unwrap();
        assert_eq!(created["title"], "Shoes");

        let activated = client.activate_conversation("12").await.unwrap();
        assert_eq!(activated["activated"], "12");

        let list = client.list_conversations().await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, "12");
        assert_eq!(list[1].display_title(), "Untitled conversation");
    }

    #[tokio::test]
    async fn test_history_messages_accept_both_shapes() {
        let router = Router::new().route(
            "/api/v1/chat/history/conversations/:id/messages",
            get(|| async {
                Json(json!({ "data": [
                    { "content": "hi", "isUser": true, "timestamp": "2024-05-01T10:00:00Z" },
                    { "text": "hello", "role": "assistant", "created_at": "2024-05-01T10:00:05.123" }
                ]}))
            }),
        );
        let origin = spawn_backend(router).await;
        let (client, _) = client_for(&origin);

        let messages = client.conversation_messages("12").await.unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].from_user());
        assert!(messages[0].at().is_some());
        assert!(messages[1].at().is_some());
        assert_eq!(messages[1].content, "hello");
        assert!(!messages[1].from_user());
    }

    #[tokio::test]
    async fn test_find_similar_sends_name_image_platform() {
        let router = Router::new().route(
            FIND_SIMILAR_PATH,
            post(|Json(body): Json<Value>| async move { Json(body) }),
        );
        let origin = spawn_backend(router).await;
        let (client, _) = client_for(&origin);

        let option = ProductOption {
            title: "Shoe".to_string(),
            price: None,
            platform: "X".to_string(),
            url: "u".to_string(),
            image: "i".to_string(),
        };
        let echoed = client.find_similar_products(&option).await.unwrap();
        assert_eq!(echoed, json!({ "name": "Shoe", "image": "i", "platform": "X" }));
    }
}
