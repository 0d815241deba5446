//! Command router: maps each inbound event to exactly one handler.
//!
//! Handler failures never escape `dispatch`; they are forwarded to the error
//! sink so the transport's dispatch loop keeps running.

use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    completion::CompletionProxy,
    domain::ChatId,
    error_sink::{ErrorOrigin, ErrorSink},
    messaging::{
        port::MessagingPort,
        types::{clamp_message, InboundEvent},
    },
    store::ContentStore,
    Result,
};

pub const GREETING_TEXT: &str = "Привіт! Я ваш SMM-бот.";
pub const HELP_TEXT: &str = "Команди: /start, /help, /settings, /reklama, /addpost.";
pub const SETTINGS_TEXT: &str = "Тут будуть налаштування.";
pub const REKLAMA_TEXT: &str = "Тут буде обробка рекламних запитів.";
pub const POST_ADDED_TEXT: &str = "✅ Пост додано в базу!";
pub const POST_FAILED_TEXT: &str = "❌ Не вдалося зберегти пост. Спробуйте пізніше.";

/// Payload stored by `/addpost`. The command does not take user content yet.
pub const PLACEHOLDER_POST_CONTENT: &str = "Приклад навчального поста";
pub const PLACEHOLDER_POST_LANGUAGE: &str = "ru";

/// The handler selected for an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    Start,
    Help,
    Settings,
    Reklama,
    AddPost,
    AiReply,
}

impl Route {
    /// Pure dispatch by event shape. Unknown commands have no route.
    pub fn for_event(event: &InboundEvent) -> Option<Self> {
        match event {
            InboundEvent::Command(cmd) => match cmd.name.as_str() {
                "start" => Some(Route::Start),
                "help" => Some(Route::Help),
                "settings" => Some(Route::Settings),
                "reklama" => Some(Route::Reklama),
                "addpost" => Some(Route::AddPost),
                _ => None,
            },
            InboundEvent::FreeText(_) => Some(Route::AiReply),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Route::Start => "start",
            Route::Help => "help",
            Route::Settings => "settings",
            Route::Reklama => "reklama",
            Route::AddPost => "addpost",
            Route::AiReply => "ai-reply",
        }
    }
}

pub struct CommandRouter {
    store: Arc<dyn ContentStore>,
    completion: Arc<CompletionProxy>,
    messenger: Arc<dyn MessagingPort>,
    sink: Arc<dyn ErrorSink>,
}

impl CommandRouter {
    pub fn new(
        store: Arc<dyn ContentStore>,
        completion: Arc<CompletionProxy>,
        messenger: Arc<dyn MessagingPort>,
        sink: Arc<dyn ErrorSink>,
    ) -> Self {
        Self {
            store,
            completion,
            messenger,
            sink,
        }
    }

    /// Handle one event. Returns the route taken (if any); never fails.
    pub async fn dispatch(&self, event: InboundEvent) -> Option<Route> {
        let Some(route) = Route::for_event(&event) else {
            debug!(event = %event.summary(), "no handler for event");
            return None;
        };

        if let Err(e) = self.run(route, &event).await {
            let context = format!("{}: {}", route.name(), event.summary());
            self.sink.report(&ErrorOrigin::new("router", context), &e);
        }

        Some(route)
    }

    async fn run(&self, route: Route, event: &InboundEvent) -> Result<()> {
        let chat_id = event.chat_id();
        match route {
            Route::Start => self.reply(chat_id, GREETING_TEXT).await,
            Route::Help => self.reply(chat_id, HELP_TEXT).await,
            Route::Settings => self.reply(chat_id, SETTINGS_TEXT).await,
            Route::Reklama => self.reply(chat_id, REKLAMA_TEXT).await,
            Route::AddPost => self.add_post(chat_id).await,
            Route::AiReply => {
                let InboundEvent::FreeText(msg) = event else {
                    return Ok(());
                };
                self.ai_reply(chat_id, &msg.text).await
            }
        }
    }

    async fn add_post(&self, chat_id: ChatId) -> Result<()> {
        match self
            .store
            .submit(PLACEHOLDER_POST_LANGUAGE, PLACEHOLDER_POST_CONTENT)
            .await
        {
            Ok(post) => {
                info!(post_id = post.id, language = %post.language, "post added");
                self.reply(chat_id, POST_ADDED_TEXT).await
            }
            Err(e) => {
                // Tell the user, then surface the storage error to the sink.
                if let Err(send_err) = self.reply(chat_id, POST_FAILED_TEXT).await {
                    let context = format!("addpost notice to chat {}", chat_id.0);
                    self.sink
                        .report(&ErrorOrigin::new("router", context), &send_err);
                }
                Err(e)
            }
        }
    }

    async fn ai_reply(&self, chat_id: ChatId, text: &str) -> Result<()> {
        let answer = self
            .completion
            .complete(&format!("chat {}", chat_id.0), text)
            .await;
        self.reply(chat_id, &answer).await
    }

    async fn reply(&self, chat_id: ChatId, text: &str) -> Result<()> {
        let max_len = self.messenger.capabilities().max_message_len;
        self.messenger
            .send_reply(chat_id, &clamp_message(text, max_len))
            .await?;
        Ok(())
    }
}
