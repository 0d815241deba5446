//! Telegram adapter (teloxide).
//!
//! This crate implements the `smm-core` MessagingPort over the Telegram Bot API
//! and feeds inbound messages to the core `CommandRouter`.

use async_trait::async_trait;

use teloxide::{
    prelude::*,
    types::{InlineKeyboardButton, InlineKeyboardMarkup},
};

pub mod router;

use smm_core::{
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{InlineKeyboard, MessagingCapabilities},
    },
    Result,
};

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::Transport(format!("telegram error: {e}"))
    }

    fn markup(keyboard: InlineKeyboard) -> Result<InlineKeyboardMarkup> {
        let mut rows = Vec::with_capacity(keyboard.buttons.len());
        for b in keyboard.buttons {
            let url = b
                .url
                .parse()
                .map_err(|e| Error::Transport(format!("invalid button url {:?}: {e}", b.url)))?;
            rows.push(vec![InlineKeyboardButton::url(b.label, url)]);
        }
        Ok(InlineKeyboardMarkup::new(rows))
    }

    fn message_ref(chat_id: ChatId, msg: &Message) -> MessageRef {
        MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        }
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            supports_inline_keyboards: true,
            max_message_len: 4096,
        }
    }

    async fn send_reply(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
        let msg = self
            .bot
            .send_message(Self::tg_chat(chat_id), text.to_string())
            .await
            .map_err(Self::map_err)?;
        Ok(Self::message_ref(chat_id, &msg))
    }

    async fn send_broadcast(
        &self,
        channel: ChatId,
        text: &str,
        keyboard: Option<InlineKeyboard>,
    ) -> Result<MessageRef> {
        let mut req = self
            .bot
            .send_message(Self::tg_chat(channel), text.to_string());
        if let Some(keyboard) = keyboard {
            req = req.reply_markup(Self::markup(keyboard)?);
        }
        let msg = req.await.map_err(Self::map_err)?;
        Ok(Self::message_ref(channel, &msg))
    }
}
