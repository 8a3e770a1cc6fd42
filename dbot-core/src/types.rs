//! Core types: user, chat and inbound message.
//!
//! A [`Message`] keeps the untouched platform payload in `raw` so a conversation step can be
//! replayed verbatim later with [`Message::from_raw`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{HandlerError, Result};

fn default_language_code() -> String {
    "Eng".to_string()
}

/// Platform user identity, decoded from the `from` object of a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default = "default_language_code")]
    pub language_code: String,
}

impl PartialEq for User {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.is_bot == other.is_bot
    }
}

/// Chat (private, group or channel) identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type", default)]
    pub chat_type: String,
}

/// Shape of the platform message object; only the fields the framework reads.
#[derive(Deserialize)]
struct WireMessage {
    message_id: i64,
    date: i64,
    chat: Chat,
    #[serde(default)]
    from: Option<User>,
    #[serde(default)]
    text: Option<String>,
}

/// One inbound message. `content` is `None` for non-text messages.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: i64,
    pub chat: Chat,
    pub content: Option<String>,
    pub user: User,
    pub created_at: DateTime<Utc>,
    pub raw: Value,
}

impl Message {
    /// Decodes a message from its raw platform snapshot. The snapshot is kept as-is in `raw`.
    pub fn from_raw(raw: Value) -> Result<Self> {
        let wire: WireMessage = serde_json::from_value(raw.clone())?;
        let user = wire.from.ok_or(HandlerError::NoSender)?;
        let created_at =
            DateTime::<Utc>::from_timestamp(wire.date, 0).ok_or(HandlerError::InvalidDate(wire.date))?;

        Ok(Self {
            id: wire.message_id,
            chat: wire.chat,
            content: wire.text,
            user,
            created_at,
            raw,
        })
    }

    /// Text content, if any.
    pub fn text(&self) -> Option<&str> {
        self.content.as_deref()
    }

    pub fn chat_id(&self) -> i64 {
        self.chat.id
    }

    pub fn unix_time(&self) -> i64 {
        self.created_at.timestamp()
    }
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.content == other.content && self.chat.id == other.chat.id && self.user == other.user
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_message(text: Option<&str>) -> Value {
        let mut raw = json!({
            "message_id": 42,
            "date": 1706529600,
            "chat": {"id": 456, "type": "private"},
            "from": {"id": 123, "is_bot": false, "first_name": "Test", "username": "test_user"}
        });
        if let Some(text) = text {
            raw["text"] = json!(text);
        }
        raw
    }

    #[test]
    fn test_from_raw_decodes_fields_and_keeps_snapshot() {
        let raw = raw_message(Some("/start"));
        let message = Message::from_raw(raw.clone()).unwrap();

        assert_eq!(message.id, 42);
        assert_eq!(message.chat_id(), 456);
        assert_eq!(message.chat.chat_type, "private");
        assert_eq!(message.text(), Some("/start"));
        assert_eq!(message.user.id, 123);
        assert_eq!(message.user.username.as_deref(), Some("test_user"));
        assert_eq!(message.unix_time(), 1706529600);
        assert_eq!(message.raw, raw);
    }

    #[test]
    fn test_language_code_defaults_when_absent() {
        let message = Message::from_raw(raw_message(None)).unwrap();
        assert_eq!(message.user.language_code, "Eng");
        assert!(message.content.is_none());
    }

    #[test]
    fn test_from_raw_without_sender_fails() {
        let raw = json!({"message_id": 1, "date": 0, "chat": {"id": 1, "type": "channel"}});
        assert!(Message::from_raw(raw).is_err());
    }

    #[test]
    fn test_user_equality_uses_id_and_is_bot() {
        let a: User = serde_json::from_value(json!({"id": 1, "first_name": "A"})).unwrap();
        let b: User = serde_json::from_value(json!({"id": 1, "first_name": "B"})).unwrap();
        let bot: User = serde_json::from_value(json!({"id": 1, "is_bot": true})).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, bot);
    }

    #[test]
    fn test_message_equality_ignores_message_id() {
        let first = Message::from_raw(raw_message(Some("hi"))).unwrap();
        let mut raw = raw_message(Some("hi"));
        raw["message_id"] = json!(43);
        let second = Message::from_raw(raw).unwrap();
        assert_eq!(first, second);
    }
}
