// Wire frames exchanged over the chat socket
//
// Inbound text is decoded exactly once, here, into a tagged variant. The
// server does not version its frames, so classification is by shape: a
// known `type` with the fields that type needs. Anything else still becomes
// a displayable frame; decoding never fails.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Prefix marking server-reported errors in the transcript
pub const ERROR_PREFIX: &str = "⚠️ Error: ";

/// Price as sent by the recommendation service: a number or preformatted text
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Price {
    Amount(f64),
    Text(String),
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Price::Amount(a) => write!(f, "{:.2}", a),
            Price::Text(t) => f.write_str(t),
        }
    }
}

/// A recommendation candidate offered mid-conversation
///
/// Fields that arrive as `null` or with an unexpected type read as empty,
/// so a sloppy field never costs the whole option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductOption {
    #[serde(default, alias = "name", deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(
        default,
        deserialize_with = "lenient_price",
        skip_serializing_if = "Option::is_none"
    )]
    pub price: Option<Price>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub platform: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub url: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub image: String,
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

fn lenient_price<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Price>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64().map(Price::Amount),
        Value::String(s) if !s.trim().is_empty() => Some(Price::Text(s)),
        _ => None,
    })
}

/// Decoded server frame
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// `{type:"message", content, products?}`
    Message {
        content: String,
        products: Vec<ProductOption>,
    },
    /// `{type:"product_options", options}`
    ProductOptions { options: Vec<ProductOption> },
    /// `{type:"error", message}`
    Error { message: String },
    /// Valid JSON of any other shape
    Unrecognized(Value),
    /// Text that is not JSON at all
    Raw(String),
}

impl InboundFrame {
    pub fn decode(text: &str) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(value) => Self::classify(value),
            Err(_) => InboundFrame::Raw(text.to_string()),
        }
    }

    fn classify(value: Value) -> Self {
        let kind = value.get("type").and_then(Value::as_str);
        match kind {
            Some("message") => {
                if let Some(content) = value.get("content").and_then(Value::as_str) {
                    return InboundFrame::Message {
                        content: content.to_string(),
                        products: options_from(value.get("products")).unwrap_or_default(),
                    };
                }
            }
            Some("product_options") => {
                if let Some(options) = options_from(value.get("options")) {
                    return InboundFrame::ProductOptions { options };
                }
            }
            Some("error") => {
                if let Some(message) = value.get("message").and_then(Value::as_str) {
                    return InboundFrame::Error {
                        message: message.to_string(),
                    };
                }
            }
            _ => {}
        }
        InboundFrame::Unrecognized(value)
    }

    /// Transcript text for frames that carry one
    pub fn display_text(&self) -> Option<String> {
        match self {
            InboundFrame::Message { content, .. } => Some(content.clone()),
            InboundFrame::ProductOptions { .. } => None,
            InboundFrame::Error { message } => Some(format!("{}{}", ERROR_PREFIX, message)),
            InboundFrame::Unrecognized(Value::String(s)) => Some(s.clone()),
            InboundFrame::Unrecognized(value) => Some(value.to_string()),
            InboundFrame::Raw(text) => Some(text.clone()),
        }
    }
}

/// Options array, skipping elements that are not option-shaped
pub(crate) fn options_from(value: Option<&Value>) -> Option<Vec<ProductOption>> {
    let items = value?.as_array()?;
    Some(
        items
            .iter()
            .filter(|item| item.is_object())
            .filter_map(|item| serde_json::from_value(item.clone()).ok())
            .collect(),
    )
}

/// The product fields the server expects back when one is picked
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectedProduct {
    pub name: String,
    pub platform: String,
    pub url: String,
    pub image: String,
}

impl From<&ProductOption> for SelectedProduct {
    fn from(option: &ProductOption) -> Self {
        Self {
            name: option.title.clone(),
            platform: option.platform.clone(),
            url: option.url.clone(),
            image: option.image.clone(),
        }
    }
}

/// Client frame
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundFrame {
    Message { text: String },
    SelectProduct { selected: SelectedProduct },
}

impl OutboundFrame {
    pub fn message(text: impl Into<String>) -> Self {
        OutboundFrame::Message { text: text.into() }
    }

    pub fn select(option: &ProductOption) -> Self {
        OutboundFrame::SelectProduct {
            selected: option.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_frame() {
        let frame = InboundFrame::decode(r#"{"type":"message","content":"hi"}"#);
        assert_eq!(
            frame,
            InboundFrame::Message {
                content: "hi".to_string(),
                products: vec![]
            }
        );
        assert_eq!(frame.display_text().as_deref(), Some("hi"));
    }

    #[test]
    fn test_message_frame_with_embedded_products() {
        let frame = InboundFrame::decode(
            r#"{"type":"message","content":"Found these","products":[
                {"title":"Shoe","price":49.5,"platform":"X","url":"u","image":"i"},
                {"title":"Boot","price":"PKR 9,000","platform":"Y","url":"u2","image":"i2"}
            ]}"#,
        );
        let InboundFrame::Message { products, .. } = frame else {
            panic!("expected message frame");
        };
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].price, Some(Price::Amount(49.5)));
        assert_eq!(products[1].price.as_ref().unwrap().to_string(), "PKR 9,000");
    }

    #[test]
    fn test_product_options_frame() {
        let frame = InboundFrame::decode(
            r#"{"type":"product_options","options":[{"title":"Shoe","platform":"X","url":"u","image":"i"}]}"#,
        );
        assert_eq!(
            frame,
            InboundFrame::ProductOptions {
                options: vec![ProductOption {
                    title: "Shoe".to_string(),
                    price: None,
                    platform: "X".to_string(),
                    url: "u".to_string(),
                    image: "i".to_string(),
                }]
            }
        );
        assert_eq!(frame.display_text(), None);
    }

    #[test]
    fn test_options_with_null_fields_are_kept() {
        let frame = InboundFrame::decode(
            r#"{"type":"product_options","options":[
                {"title":"Shoe","price":null,"platform":"X","url":"u","image":null},
                {"title":"Boot","price":{"amount":5},"platform":null,"url":7,"image":"i"}
            ]}"#,
        );
        let InboundFrame::ProductOptions { options } = frame else {
            panic!("expected product options frame");
        };
        let titles: Vec<&str> = options.iter().map(|o| o.title.as_str()).collect();
        assert_eq!(titles, ["Shoe", "Boot"]);
        assert_eq!(options[0].image, "");
        assert_eq!(options[0].price, None);
        assert_eq!(options[1].price, None);
        assert_eq!(options[1].platform, "");
        assert_eq!(options[1].url, "7");
    }

    #[test]
    fn test_error_frame_is_prefixed() {
        let frame = InboundFrame::decode(r#"{"type":"error","message":"LLM unavailable"}"#);
        assert_eq!(
            frame.display_text().as_deref(),
            Some("⚠️ Error: LLM unavailable")
        );
    }

    #[test]
    fn test_wrong_field_types_fall_back_to_unrecognized() {
        let frame = InboundFrame::decode(r#"{"type":"message","content":42}"#);
        assert_eq!(
            frame,
            InboundFrame::Unrecognized(json!({"type":"message","content":42}))
        );
        assert_eq!(
            frame.display_text().as_deref(),
            Some(r#"{"content":42,"type":"message"}"#)
        );

        let frame = InboundFrame::decode(r#"{"type":"product_options","options":"none"}"#);
        assert!(matches!(frame, InboundFrame::Unrecognized(_)));
    }

    #[test]
    fn test_non_json_is_kept_verbatim() {
        let frame = InboundFrame::decode("plain text");
        assert_eq!(frame, InboundFrame::Raw("plain text".to_string()));
        assert_eq!(frame.display_text().as_deref(), Some("plain text"));
    }

    #[test]
    fn test_bare_json_string_shows_its_content() {
        let frame = InboundFrame::decode(r#""just a string""#);
        assert_eq!(frame.display_text().as_deref(), Some("just a string"));
    }

    #[test]
    fn test_select_product_renames_title_to_name() {
        let option = ProductOption {
            title: "Shoe".to_string(),
            price: Some(Price::Amount(10.0)),
            platform: "X".to_string(),
            url: "u".to_string(),
            image: "i".to_string(),
        };
        let wire = serde_json::to_value(OutboundFrame::select(&option)).unwrap();
        assert_eq!(
            wire,
            json!({
                "type": "select_product",
                "selected": {"name": "Shoe", "platform": "X", "url": "u", "image": "i"}
            })
        );
    }

    #[test]
    fn test_message_wire_shape() {
        let wire = serde_json::to_value(OutboundFrame::message("hello")).unwrap();
        assert_eq!(wire, json!({"type": "message", "text": "hello"}));
    }
}
