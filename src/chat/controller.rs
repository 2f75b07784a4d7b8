// Chat controller - applies user intents and session events to ChatState
//
// Owned by the front-end loop, so intents are handled one at a time in the
// order the user issued them.

use super::bootstrap::{bootstrap, BOOTSTRAP_FAILED_MESSAGE};
use super::frame::{options_from, OutboundFrame, ERROR_PREFIX};
use super::session::{ConversationHandle, SessionEvent, SessionHandle};
use super::state::ChatState;
use crate::api::client::unwrap_data;
use crate::api::{ApiClient, ApiError};
use serde_json::Value;

pub struct ChatController {
    api: ApiClient,
    session: SessionHandle,
    state: ChatState,
    conversation: Option<ConversationHandle>,
}

impl ChatController {
    pub fn new(api: ApiClient, session: SessionHandle) -> Self {
        Self {
            api,
            session,
            state: ChatState::new(),
            conversation: None,
        }
    }

    pub fn state(&self) -> &ChatState {
        &self.state
    }

    pub fn conversation(&self) -> Option<&ConversationHandle> {
        self.conversation.as_ref()
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    /// User sent a chat message. Blank input is ignored; anything else is
    /// echoed and sent exactly as typed.
    pub async fn submit(&mut self, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        self.state.push_user(text);

        if self.conversation.is_none() {
            match bootstrap(&self.api, &self.session, text).await {
                Ok(handle) => self.conversation = Some(handle),
                Err(e) => {
                    tracing::error!("Conversation bootstrap failed: {}", e);
                    self.state.set_typing(false);
                    self.state.push_assistant(BOOTSTRAP_FAILED_MESSAGE);
                    return;
                }
            }
        }

        self.session.send(OutboundFrame::message(text));
    }

    /// User picked one of the offered products. Returns false for an
    /// index with no option behind it.
    pub fn select_product(&mut self, index: usize) -> bool {
        let Some(option) = self.state.option(index) else {
            return false;
        };
        tracing::info!("Selected product: {}", option.title);
        self.session.send(OutboundFrame::select(option));
        self.state.clear_options();
        self.state.set_typing(true);
        true
    }

    /// Ask the recommendation service for products like the given option
    pub async fn find_similar(&mut self, index: usize) -> bool {
        let Some(option) = self.state.option(index).cloned() else {
            return false;
        };

        self.state.set_typing(true);
        let result = self.api.find_similar_products(&option).await;
        self.state.set_typing(false);

        match result {
            Ok(body) => self.apply_similar(&option.title, unwrap_data(body)),
            Err(e) => {
                tracing::warn!("Similar-product search failed: {}", e);
                self.state
                    .push_assistant(&format!("{}{}", ERROR_PREFIX, e));
            }
        }
        true
    }

    fn apply_similar(&mut self, title: &str, body: Value) {
        let options = if body.is_array() {
            options_from(Some(&body))
        } else {
            ["options", "products", "similar_products"]
                .iter()
                .find_map(|key| options_from(body.get(*key)))
        }
        .unwrap_or_default();

        if !options.is_empty() {
            self.state.push_assistant(&format!(
                "Here are {} products similar to {}:",
                options.len(),
                title
            ));
            self.state.replace_options(options);
            return;
        }

        let text = match &body {
            Value::String(s) => s.clone(),
            other => other
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("No similar products found for {}.", title)),
        };
        self.state.push_assistant(&text);
    }

    /// Reopen a stored conversation: load its history, activate it and
    /// connect the socket.
    pub async fn resume(&mut self, id: &str) -> Result<(), ApiError> {
        let history = self.api.conversation_messages(id).await?;
        self.api.activate_conversation(id).await?;

        let mut state = ChatState::empty();
        for message in &history {
            match message.at() {
                Some(at) => state.push_history(&message.content, message.from_user(), at),
                None => {
                    state.push(&message.content, message.from_user());
                }
            }
        }
        if state.messages().is_empty() {
            state = ChatState::new();
        }
        self.state = state;

        let handle = ConversationHandle { id: id.to_string() };
        self.session.activate(handle.clone());
        self.conversation = Some(handle);
        self.session.open().await;
        tracing::info!("Resumed conversation {} ({} messages)", id, history.len());
        Ok(())
    }

    /// Drop the current conversation and start over
    pub fn new_chat(&mut self) {
        self.session.deactivate();
        self.conversation = None;
        self.state = ChatState::new();
    }

    pub fn handle_event(&mut self, event: SessionEvent) {
        self.state.apply_event(event);
    }
}
