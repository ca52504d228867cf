pub mod telegram;

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{DeliveryError, MalformedPayload};

/// Chat identifier exactly as the platform sent it.
///
/// Telegram uses integers for chats and `@username` strings for channels;
/// the value is echoed back in the same JSON type it arrived in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatRef {
    Id(i64),
    Name(String),
}

impl ChatRef {
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(ChatRef::Id),
            Value::String(s) if !s.is_empty() => Some(ChatRef::Name(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for ChatRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatRef::Id(id) => write!(f, "{id}"),
            ChatRef::Name(name) => write!(f, "{name}"),
        }
    }
}

/// The parts of an inbound update the relay acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub chat: ChatRef,
    pub message_id: Option<i32>,
    /// `None` for non-text messages (stickers, photos, ...) and blank text.
    pub text: Option<String>,
}

impl IncomingMessage {
    /// Pick `message`, falling back to `edited_message`, out of a raw update.
    pub fn from_update(update: &Value) -> Result<Self, MalformedPayload> {
        let message = ["message", "edited_message"]
            .into_iter()
            .filter_map(|key| update.get(key))
            .find(|m| m.as_object().is_some_and(|o| !o.is_empty()))
            .ok_or(MalformedPayload::NoMessage)?;

        let chat = message
            .get("chat")
            .and_then(|c| c.get("id"))
            .and_then(ChatRef::from_json)
            .ok_or(MalformedPayload::NoChat)?;

        let message_id = message
            .get("message_id")
            .and_then(Value::as_i64)
            .and_then(|id| i32::try_from(id).ok());

        let text = message
            .get("text")
            .and_then(Value::as_str)
            // Whitespace-only text is treated as no text: nothing to translate.
            .filter(|t| !t.trim().is_empty())
            .map(str::to_string);

        Ok(Self {
            chat,
            message_id,
            text,
        })
    }
}

/// Outbound side: deliver text to a chat.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Returns the id of the delivered message.
    async fn send(
        &self,
        chat: &ChatRef,
        text: &str,
        reply_to: Option<i32>,
    ) -> Result<i32, DeliveryError>;
}
