// Chat UI state - what the chat window renders
//
// Messages are append-only for the lifetime of a session. Product options
// are a single replaceable set; the typing flag is cleared by every inbound
// frame, including ones that carry no text.

use super::frame::{InboundFrame, ProductOption};
use super::session::SessionEvent;
use chrono::{DateTime, Utc};

pub const GREETING: &str = "Hello! I'm your AI Assistant. How can I help you today?";

/// One transcript entry
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: i64,
    pub content: String,
    pub is_user: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ChatState {
    messages: Vec<Message>,
    typing: bool,
    product_options: Vec<ProductOption>,
    last_id: i64,
}

impl Default for ChatState {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatState {
    /// Fresh transcript seeded with the assistant greeting
    pub fn new() -> Self {
        let mut state = Self::empty();
        state.push(GREETING, false);
        state
    }

    /// Transcript with no greeting, used when resuming a conversation
    pub fn empty() -> Self {
        Self {
            messages: Vec::new(),
            typing: false,
            product_options: Vec::new(),
            last_id: 0,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_typing(&self) -> bool {
        self.typing
    }

    pub fn set_typing(&mut self, typing: bool) {
        self.typing = typing;
    }

    pub fn product_options(&self) -> &[ProductOption] {
        &self.product_options
    }

    pub fn option(&self, index: usize) -> Option<&ProductOption> {
        self.product_options.get(index)
    }

    pub fn replace_options(&mut self, options: Vec<ProductOption>) {
        self.product_options = options;
    }

    pub fn clear_options(&mut self) {
        self.product_options.clear();
    }

    /// Wall-clock millis, bumped when needed so ids strictly increase
    fn next_id(&mut self, now: DateTime<Utc>) -> i64 {
        let id = now.timestamp_millis().max(self.last_id + 1);
        self.last_id = id;
        id
    }

    fn push_at(&mut self, content: &str, is_user: bool, now: DateTime<Utc>) -> &Message {
        let id = self.next_id(now);
        self.messages.push(Message {
            id,
            content: content.to_string(),
            is_user,
            timestamp: now,
        });
        &self.messages[self.messages.len() - 1]
    }

    pub fn push(&mut self, content: &str, is_user: bool) -> &Message {
        self.push_at(content, is_user, Utc::now())
    }

    /// Local echo of a submitted message. A new message makes the current
    /// options stale.
    pub fn push_user(&mut self, content: &str) {
        self.push(content, true);
        self.product_options.clear();
        self.typing = true;
    }

    pub fn push_assistant(&mut self, content: &str) {
        self.push(content, false);
    }

    /// Append a history entry keeping its server timestamp
    pub fn push_history(&mut self, content: &str, is_user: bool, at: DateTime<Utc>) {
        self.push_at(content, is_user, at);
    }

    /// Fold a session event into the transcript
    pub fn apply_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Frame(frame) => self.apply_frame(frame),
            // A notice means the pending payload was dropped; no reply follows
            SessionEvent::Notice(text) => {
                self.typing = false;
                self.push_assistant(&text);
            }
        }
    }

    fn apply_frame(&mut self, frame: InboundFrame) {
        self.typing = false;
        if let Some(text) = frame.display_text() {
            self.push_assistant(&text);
        }
        match frame {
            InboundFrame::Message { products, .. } if !products.is_empty() => {
                self.product_options = products;
            }
            InboundFrame::ProductOptions { options } => {
                self.product_options = options;
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn option(title: &str) -> ProductOption {
        ProductOption {
            title: title.to_string(),
            price: None,
            platform: "X".to_string(),
            url: "u".to_string(),
            image: "i".to_string(),
        }
    }

    fn frame(text: &str) -> SessionEvent {
        SessionEvent::Frame(InboundFrame::decode(text))
    }

    #[test]
    fn test_new_state_is_greeted() {
        let state = ChatState::new();
        assert_eq!(state.messages().len(), 1);
        assert_eq!(state.messages()[0].content, GREETING);
        assert!(!state.messages()[0].is_user);
    }

    #[test]
    fn test_message_frame_appends_and_clears_typing() {
        let mut state = ChatState::empty();
        state.push_user("hello");
        assert!(state.is_typing());

        state.apply_event(frame(r#"{"type":"message","content":"hi"}"#));

        assert!(!state.is_typing());
        let last = state.messages().last().unwrap();
        assert_eq!(last.content, "hi");
        assert!(!last.is_user);
        assert_eq!(state.messages().len(), 2);
    }

    #[test]
    fn test_product_options_replace_set_and_clear_typing() {
        let mut state = ChatState::empty();
        state.replace_options(vec![option("Old")]);
        state.set_typing(true);

        state.apply_event(frame(
            r#"{"type":"product_options","options":[{"title":"A"},{"title":"B"}]}"#,
        ));

        assert!(!state.is_typing());
        assert!(state.messages().is_empty());
        let titles: Vec<_> = state.product_options().iter().map(|o| o.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B"]);
    }

    #[test]
    fn test_message_with_products_sets_options_only_when_present() {
        let mut state = ChatState::empty();
        state.replace_options(vec![option("Keep")]);

        state.apply_event(frame(r#"{"type":"message","content":"no products"}"#));
        assert_eq!(state.product_options()[0].title, "Keep");

        state.apply_event(frame(
            r#"{"type":"message","content":"found","products":[{"title":"New"}]}"#,
        ));
        assert_eq!(state.product_options().len(), 1);
        assert_eq!(state.product_options()[0].title, "New");
    }

    #[test]
    fn test_plain_text_frame_becomes_assistant_message() {
        let mut state = ChatState::empty();
        state.set_typing(true);
        state.apply_event(frame("plain text"));

        assert_eq!(state.messages().len(), 1);
        assert_eq!(state.messages()[0].content, "plain text");
        assert!(!state.is_typing());
    }

    #[test]
    fn test_notice_is_shown_as_assistant_line() {
        let mut state = ChatState::empty();
        state.push_user("anything in red?");
        assert!(state.is_typing());

        state.apply_event(SessionEvent::Notice("Reconnecting".to_string()));
        assert_eq!(state.messages()[1].content, "Reconnecting");
        assert!(!state.messages()[1].is_user);
        assert!(!state.is_typing());
    }

    #[test]
    fn test_option_with_null_image_survives_into_state() {
        let mut state = ChatState::empty();
        state.apply_event(frame(
            r#"{"type":"product_options","options":[
                {"title":"Shoe","price":null,"platform":"X","url":"u","image":null},
                {"title":"Boot","price":12,"platform":"Y","url":"u2","image":"i2"}
            ]}"#,
        ));

        let titles: Vec<_> = state.product_options().iter().map(|o| o.title.as_str()).collect();
        assert_eq!(titles, vec!["Shoe", "Boot"]);
    }

    #[test]
    fn test_user_message_clears_options() {
        let mut state = ChatState::empty();
        state.replace_options(vec![option("A")]);
        state.push_user("something else");
        assert!(state.product_options().is_empty());
    }

    #[test]
    fn test_ids_strictly_increase_within_same_millisecond() {
        let mut state = ChatState::empty();
        let at = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        state.push_history("a", true, at);
        state.push_history("b", false, at);
        state.push_history("c", true, at - chrono::Duration::seconds(5));

        let ids: Vec<_> = state.messages().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1_700_000_000_000, 1_700_000_000_001, 1_700_000_000_002]);
    }
}
