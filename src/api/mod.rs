//! REST access to the authentication, chat-history and recommendation
//! services.

pub mod auth;
pub mod chat;
pub mod client;
pub mod error;

pub use chat::{Conversation, HistoryMessage};
pub use client::ApiClient;
pub use error::ApiError;
