// REST client - every backend call goes through here
//
// Attaches the session's credential to each request and turns a 401 from
// any endpoint into a global session invalidation (credentials wiped, user
// sent back to login) before the error reaches the caller.

use super::error::{error_message, ApiError};
use crate::auth::AuthSession;
use crate::config::Transport;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    transport: Transport,
    session: Arc<AuthSession>,
}

impl ApiClient {
    pub fn new(transport: Transport, session: Arc<AuthSession>) -> Self {
        Self {
            http: reqwest::Client::new(),
            transport,
            session,
        }
    }

    pub fn session(&self) -> &Arc<AuthSession> {
        &self.session
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self
            .http
            .request(method, self.transport.http_url(path))
            .header(ACCEPT, "application/json");
        if let Some(token) = self.session.token() {
            builder = builder.header(AUTHORIZATION, token.authorization());
        }
        builder
    }

    /// Send and decode. Empty bodies decode to `Null`, non-JSON bodies to a
    /// JSON string holding the raw text.
    async fn execute(&self, builder: RequestBuilder, path: &str) -> Result<Value, ApiError> {
        let response = builder.send().await?;
        let status = response.status();
        tracing::debug!("{} -> {}", path, status);

        if status == StatusCode::UNAUTHORIZED {
            self.session.invalidate();
            return Err(ApiError::Unauthorized);
        }

        let body = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
    }

    pub async fn get_json(&self, path: &str) -> Result<Value, ApiError> {
        self.execute(self.request(Method::GET, path), path).await
    }

    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Value, ApiError> {
        self.execute(self.request(Method::POST, path).json(body), path)
            .await
    }

    /// `application/x-www-form-urlencoded` POST
    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Result<Value, ApiError> {
        self.execute(self.request(Method::POST, path).form(form), path)
            .await
    }
}

/// Decode a JSON value into a typed response
pub(crate) fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value.clone())
        .map_err(|e| ApiError::Decode(format!("{} in {}", e, value)))
}

/// Some endpoints wrap their payload one level down under `data`
pub(crate) fn unwrap_data(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::auth::session::tests::RecordingNavigator;
    use axum::http::{HeaderMap, StatusCode as HttpStatus};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::json;

    /// Serve `router` on an ephemeral port, returning its origin
    pub(crate) async fn spawn_backend(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    pub(crate) fn client_for(origin: &str) -> (ApiClient, Arc<RecordingNavigator>) {
        let nav = Arc::new(RecordingNavigator::default());
        let session = Arc::new(AuthSession::in_memory(nav.clone()));
        let transport = Transport::from_origin(origin).unwrap();
        (ApiClient::new(transport, session), nav)
    }

    async fn echo_auth(headers: HeaderMap) -> Json<Value> {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Json(json!({ "authorization": auth }))
    }

    #[tokio::test]
    async fn test_authorization_header_attached_when_signed_in() {
        let origin = spawn_backend(Router::new().route("/echo", get(echo_auth))).await;
        let (client, _) = client_for(&origin);

        let anonymous = client.get_json("/echo").await.unwrap();
        assert_eq!(anonymous["authorization"], Value::Null);

        client.session().set_auth("tok-1", Some("Bearer")).unwrap();
        let signed_in = client.get_json("/echo").await.unwrap();
        assert_eq!(signed_in["authorization"], "Bearer tok-1");
    }

    #[tokio::test]
    async fn test_unauthorized_clears_stores_and_navigates_once() {
        let router = Router::new()
            .route("/a", get(|| async { HttpStatus::UNAUTHORIZED }))
            .route("/b", post(|| async { HttpStatus::UNAUTHORIZED }));
        let origin = spawn_backend(router).await;
        let (client, nav) = client_for(&origin);
        client.session().set_auth("stale", None).unwrap();

        let first = client.get_json("/a").await;
        assert!(matches!(first, Err(ApiError::Unauthorized)));
        assert!(client.session().token().is_none());
        assert_eq!(nav.visits(), vec!["/login".to_string()]);

        let second = client.post_json("/b", &json!({})).await;
        assert!(matches!(second, Err(ApiError::Unauthorized)));
        assert_eq!(nav.visits().len(), 1);
    }

    #[tokio::test]
    async fn test_error_status_carries_backend_message() {
        let router = Router::new().route(
            "/fail",
            post(|| async {
                (
                    HttpStatus::BAD_REQUEST,
                    Json(json!({ "detail": "Email already registered" })),
                )
            }),
        );
        let origin = spawn_backend(router).await;
        let (client, nav) = client_for(&origin);

        match client.post_json("/fail", &json!({})).await {
            Err(ApiError::Status { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "Email already registered");
            }
            other => panic!("expected status error, got {:?}", other),
        }
        assert!(nav.visits().is_empty());
    }

    #[tokio::test]
    async fn test_non_json_body_becomes_string() {
        let router = Router::new().route("/plain", get(|| async { "hello" }));
        let origin = spawn_backend(router).await;
        let (client, _) = client_for(&origin);

        assert_eq!(client.get_json("/plain").await.unwrap(), json!("hello"));
    }

    #[test]
    fn test_unwrap_data() {
        assert_eq!(unwrap_data(json!({"data": {"id": 1}})), json!({"id": 1}));
        assert_eq!(unwrap_data(json!({"id": 1})), json!({"id": 1}));
        assert_eq!(unwrap_data(json!([1, 2])), json!([1, 2]));
    }
}
