//! Outbound messaging boundary.
//!
//! [`Gateway`] is transport-agnostic; [`TelegramGateway`] implements it via
//! teloxide. Every send returns the platform message id of the delivered
//! copy, which the store keeps as the delivery id for reply routing.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatId, KeyboardMarkup, LinkPreviewOptions, MessageId, ParseMode};

/// Errors surfaced by the messaging gateway.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("telegram request failed: {0}")]
    Telegram(#[from] teloxide::RequestError),
}

/// Outbound side of the relay.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Sends an HTML-styled notice.
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<i64, GatewayError>;

    /// Sends an HTML-styled notice with a reply keyboard attached.
    async fn send_menu(&self, chat_id: i64, text: &str, keyboard: KeyboardMarkup) -> Result<i64, GatewayError>;

    /// Sends relayed text. Content is protected so the receiver cannot
    /// forward it onwards with the sender attached.
    async fn relay_text(&self, chat_id: i64, text: &str) -> Result<i64, GatewayError>;

    /// Copies a media message into another chat under a new caption,
    /// protected like [`Gateway::relay_text`].
    async fn copy_media(&self, to_chat: i64, from_chat: i64, message_id: i64, caption: &str) -> Result<i64, GatewayError>;
}

/// Teloxide-based implementation of [`Gateway`].
pub struct TelegramGateway {
    bot: Bot,
}

impl TelegramGateway {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn no_preview() -> LinkPreviewOptions {
    LinkPreviewOptions {
        is_disabled: true,
        url: None,
        prefer_small_media: false,
        prefer_large_media: false,
        show_above_text: false,
    }
}

#[async_trait]
impl Gateway for TelegramGateway {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<i64, GatewayError> {
        let sent = self
            .bot
            .send_message(ChatId(chat_id), text)
            .parse_mode(ParseMode::Html)
            .link_preview_options(no_preview())
            .await?;
        Ok(sent.id.0 as i64)
    }

    async fn send_menu(&self, chat_id: i64, text: &str, keyboard: KeyboardMarkup) -> Result<i64, GatewayError> {
        let sent = self
            .bot
            .send_message(ChatId(chat_id), text)
            .parse_mode(ParseMode::Html)
            .link_preview_options(no_preview())
            .reply_markup(keyboard)
            .await?;
        Ok(sent.id.0 as i64)
    }

    async fn relay_text(&self, chat_id: i64, text: &str) -> Result<i64, GatewayError> {
        let sent = self
            .bot
            .send_message(ChatId(chat_id), text)
            .parse_mode(ParseMode::Html)
            .link_preview_options(no_preview())
            .protect_content(true)
            .await?;
        Ok(sent.id.0 as i64)
    }

    async fn copy_media(&self, to_chat: i64, from_chat: i64, message_id: i64, caption: &str) -> Result<i64, GatewayError> {
        let copied = self
            .bot
            .copy_message(ChatId(to_chat), ChatId(from_chat), MessageId(message_id as i32))
            .caption(caption)
            .parse_mode(ParseMode::Html)
            .protect_content(true)
            .await?;
        Ok(copied.0 as i64)
    }
}
