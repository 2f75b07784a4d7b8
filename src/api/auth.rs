//! Authentication endpoints

use super::client::{decode, ApiClient};
use super::error::ApiError;
use crate::auth::validation::RegisterPayload;
use serde::Deserialize;
use serde_json::Value;

pub const REGISTER_PATH: &str = "/api/v1/auth/register";
pub const LOGIN_PATH: &str = "/api/v1/auth/login";
pub const PROFILE_PATH: &str = "/api/v1/auth/profile";

/// OAuth2 password-grant token response
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub user: Option<Value>,
}

impl ApiClient {
    pub async fn register(&self, payload: &RegisterPayload) -> Result<Value, ApiError> {
        self.post_json(REGISTER_PATH, payload).await
    }

    /// Form-encoded password grant; the email travels as `username`
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let body = self
            .post_form(
                LOGIN_PATH,
                &[
                    ("grant_type", "password"),
                    ("username", email),
                    ("password", password),
                ],
            )
            .await?;
        decode(body)
    }

    /// Log in and persist the credential in the session stores
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let response = self.login(email, password).await?;
        let Some(token) = response.access_token.as_deref().filter(|t| !t.is_empty()) else {
            return Err(ApiError::Decode(
                "login response did not include an access token".to_string(),
            ));
        };
        self.session()
            .set_auth(token, response.token_type.as_deref())?;
        tracing::info!("Signed in as {}", email);
        Ok(response)
    }

    /// Current user's profile.
    ///
    /// Some deployments double-encode the body as a JSON string; that case
    /// is unwrapped when the inner text parses.
    pub async fn profile(&self) -> Result<Value, ApiError> {
        match self.get_json(PROFILE_PATH).await? {
            Value::String(raw) => Ok(serde_json::from_str(&raw).unwrap_or(Value::String(raw))),
            other => Ok(other),
        }
    }
}
