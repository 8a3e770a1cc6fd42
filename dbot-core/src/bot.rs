//! Bot abstraction for sending messages.
//!
//! [`Bot`] is transport-agnostic; dbot-telegram's `TelegramApi` implements it over the Bot HTTP API.
//! Handlers hold an `Arc<dyn Bot>` so tests can substitute a recording implementation.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::types::Message;

/// Text formatting mode for outgoing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Html,
    Markdown,
    MarkdownV2,
}

impl ParseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseMode::Html => "HTML",
            ParseMode::Markdown => "Markdown",
            ParseMode::MarkdownV2 => "MarkdownV2",
        }
    }
}

/// Optional parameters of an outgoing message. Without a reply markup the transport removes any
/// reply keyboard left by a previous message.
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    pub parse_mode: Option<ParseMode>,
    pub reply_markup: Option<Value>,
}

impl SendOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse_mode(mut self, mode: ParseMode) -> Self {
        self.parse_mode = Some(mode);
        self
    }

    pub fn reply_markup(mut self, markup: impl Into<Value>) -> Self {
        self.reply_markup = Some(markup.into());
        self
    }
}

/// Result of a reply: the sent message and the message it replied to.
#[derive(Debug, Clone)]
pub struct Reply {
    pub message: Message,
    pub reply_to_message: Option<Message>,
}

/// Outbound side of the messaging platform.
#[async_trait]
pub trait Bot: Send + Sync {
    /// Sends a text message to the given chat.
    async fn send_message(&self, chat_id: i64, text: &str, options: SendOptions) -> Result<Message>;
    /// Sends a reply to the given message (same chat).
    async fn reply_to(&self, message: &Message, text: &str, options: SendOptions) -> Result<Reply>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_mode_names() {
        assert_eq!(ParseMode::Html.as_str(), "HTML");
        assert_eq!(ParseMode::MarkdownV2.as_str(), "MarkdownV2");
    }

    #[test]
    fn test_send_options_builder() {
        let options = SendOptions::new()
            .parse_mode(ParseMode::Markdown)
            .reply_markup(json!({"keyboard": [["A"]]}));
        assert_eq!(options.parse_mode, Some(ParseMode::Markdown));
        assert_eq!(options.reply_markup, Some(json!({"keyboard": [["A"]]})));
        assert!(SendOptions::default().reply_markup.is_none());
    }
}
