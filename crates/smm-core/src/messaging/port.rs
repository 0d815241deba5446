use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef},
    messaging::types::{InlineKeyboard, MessagingCapabilities},
    Result,
};

/// Outbound messaging port.
///
/// Failures are reported as `Error::Transport` and are never retried here.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    /// Reply to the chat an inbound event came from.
    async fn send_reply(&self, chat_id: ChatId, text: &str) -> Result<MessageRef>;

    /// Publish to a broadcast destination (a channel), optionally with buttons.
    async fn send_broadcast(
        &self,
        channel: ChatId,
        text: &str,
        keyboard: Option<InlineKeyboard>,
    ) -> Result<MessageRef>;
}
