use crate::domain::{ChatId, UserId};

/// Cross-messenger inbound event model.
///
/// Telegram-specific fields stay in the Telegram adapter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InboundEvent {
    Command(Command),
    FreeText(TextMessage),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Command {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub username: Option<String>,
    pub name: String,
    pub args: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextMessage {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub username: Option<String>,
    pub text: String,
}

/// Who sent an inbound event and where replies go.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sender {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub username: Option<String>,
}

impl InboundEvent {
    /// Build an event from raw message text.
    ///
    /// Text starting with `/` is a command. Telegram may send `/cmd@botname args`;
    /// commands addressed to another bot yield `None`.
    pub fn from_text(sender: Sender, text: &str, bot_username: &str) -> Option<Self> {
        if !text.starts_with('/') {
            return Some(InboundEvent::FreeText(TextMessage {
                chat_id: sender.chat_id,
                user_id: sender.user_id,
                username: sender.username,
                text: text.to_string(),
            }));
        }

        let (name, addressee, args) = parse_command(text);
        if let Some(addressee) = addressee {
            if !addressee.eq_ignore_ascii_case(bot_username.trim_start_matches('@')) {
                return None;
            }
        }
        if name.is_empty() {
            return None;
        }

        Some(InboundEvent::Command(Command {
            chat_id: sender.chat_id,
            user_id: sender.user_id,
            username: sender.username,
            name,
            args,
        }))
    }

    pub fn chat_id(&self) -> ChatId {
        match self {
            InboundEvent::Command(c) => c.chat_id,
            InboundEvent::FreeText(t) => t.chat_id,
        }
    }

    /// One-line description for logs (never includes free text bodies).
    pub fn summary(&self) -> String {
        match self {
            InboundEvent::Command(c) => format!("command /{} in chat {}", c.name, c.chat_id.0),
            InboundEvent::FreeText(t) => format!(
                "text ({} chars) in chat {}",
                t.text.chars().count(),
                t.chat_id.0
            ),
        }
    }
}

fn parse_command(text: &str) -> (String, Option<String>, String) {
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let mut head = first.trim_start_matches('/').splitn(2, '@');
    let cmd = head.next().unwrap_or("").to_lowercase();
    let addressee = head.next().map(|s| s.to_string());

    (cmd, addressee, rest)
}

/// Inline keyboard attached to an outbound message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineKeyboard {
    pub buttons: Vec<InlineButton>,
}

/// A link-style button: opens `url` when pressed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineButton {
    pub label: String,
    pub url: String,
}

impl InlineKeyboard {
    pub fn single_link(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            buttons: vec![InlineButton {
                label: label.into(),
                url: url.into(),
            }],
        }
    }
}

/// Cut `text` to at most `max_len` characters, marking the cut with `…`.
pub fn clamp_message(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let keep = max_len.saturating_sub(1);
    let mut out: String = text.chars().take(keep).collect();
    out.push('…');
    out
}

/// Capabilities / feature flags of a messenger implementation.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    pub supports_inline_keyboards: bool,
    pub max_message_len: usize,
}
