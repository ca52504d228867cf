use anyhow::{Context, Result};
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{MessageId, Recipient, ReplyParameters};
use tracing::debug;

use crate::config::TelegramConfig;
use crate::error::DeliveryError;
use crate::platform::{ChatRef, MessageSender};

impl From<&ChatRef> for Recipient {
    fn from(chat: &ChatRef) -> Self {
        match chat {
            ChatRef::Id(id) => Recipient::Id(ChatId(*id)),
            ChatRef::Name(name) => Recipient::ChannelUsername(name.clone()),
        }
    }
}

/// sendMessage over the Telegram Bot API.
pub struct TelegramSender {
    bot: Bot,
}

impl TelegramSender {
    /// Create a sender bound to the configured token, timeout and API URL
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        let client = teloxide::net::default_reqwest_settings()
            .timeout(config.timeout())
            .build()
            .context("Failed to build Telegram HTTP client")?;

        let mut bot = Bot::with_client(config.bot_token.clone(), client);
        if let Some(api_url) = config.api_url.as_deref() {
            let url = reqwest::Url::parse(api_url)
                .with_context(|| format!("Invalid Telegram API URL: {api_url}"))?;
            bot = bot.set_api_url(url);
        }

        Ok(Self { bot })
    }
}

#[async_trait]
impl MessageSender for TelegramSender {
    async fn send(
        &self,
        chat: &ChatRef,
        text: &str,
        reply_to: Option<i32>,
    ) -> Result<i32, DeliveryError> {
        if text.trim().is_empty() {
            return Err(DeliveryError::EmptyText);
        }

        let mut request = self.bot.send_message(Recipient::from(chat), text);
        if let Some(id) = reply_to {
            request = request.reply_parameters(ReplyParameters::new(MessageId(id)));
        }

        let sent = request.await?;
        debug!("Delivered message {} to chat {}", sent.id.0, chat);
        Ok(sent.id.0)
    }
}
