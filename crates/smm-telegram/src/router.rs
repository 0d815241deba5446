use std::sync::Arc;

use anyhow::Context;
use teloxide::{dispatching::Dispatcher, dptree, prelude::*};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use smm_core::{
    completion::{CompletionBackend, CompletionProxy},
    config::Config,
    dispatch::CommandRouter,
    domain::{ChatId, UserId},
    error_sink::{ErrorSink, TracingErrorSink},
    messaging::{
        port::MessagingPort,
        types::{InboundEvent, Sender},
    },
    scheduler::{DailySchedule, PublicationConfig, PublicationScheduler, SystemClock},
    store::ContentStore,
};

use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub router: Arc<CommandRouter>,
    pub bot_username: String,
}

pub async fn run_polling(
    cfg: Arc<Config>,
    store: Arc<dyn ContentStore>,
    backend: Arc<dyn CompletionBackend>,
) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_token.clone());

    let me = bot
        .get_me()
        .await
        .context("failed to reach Telegram (check TELEGRAM_TOKEN)")?;
    info!("smm bot started: @{}", me.username());
    if !me.username().eq_ignore_ascii_case(&cfg.bot_username) {
        warn!(
            configured = %cfg.bot_username,
            actual = %me.username(),
            "BOT_USERNAME does not match the token's bot; commands addressed to @{} will be ignored",
            me.username()
        );
    }

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let sink: Arc<dyn ErrorSink> = Arc::new(TracingErrorSink);

    let completion = Arc::new(CompletionProxy::new(backend, sink.clone(), cfg.ai_timeout));
    let router = Arc::new(CommandRouter::new(
        store.clone(),
        completion,
        messenger.clone(),
        sink.clone(),
    ));

    let scheduler = Arc::new(PublicationScheduler::new(
        PublicationConfig {
            schedule: DailySchedule::new(cfg.publish_time),
            language: cfg.publish_language.clone(),
            channel: cfg.channel_id,
            bot_username: cfg.bot_username.clone(),
        },
        store,
        messenger,
        sink,
        Arc::new(SystemClock),
    ));
    debug!(phase = ?scheduler.phase().await, "scheduler armed");

    let cancel = CancellationToken::new();
    let scheduler_task = {
        let scheduler = scheduler.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { scheduler.run(cancel).await })
    };

    let state = Arc::new(AppState {
        router,
        bot_username: cfg.bot_username.clone(),
    });

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .default_handler(|_| async {})
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("dispatcher stopped; shutting down scheduler");
    cancel.cancel();
    if let Err(e) = scheduler_task.await {
        warn!("scheduler task ended abnormally: {e}");
    }

    Ok(())
}

/// Text messages only; other updates (stickers, photos, edits) are dropped.
pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let Some(user) = msg.from() else {
        return Ok(());
    };

    let sender = Sender {
        chat_id: ChatId(msg.chat.id.0),
        user_id: UserId(user.id.0 as i64),
        username: user.username.clone(),
    };

    match InboundEvent::from_text(sender, text, &state.bot_username) {
        Some(event) => {
            debug!(event = %event.summary(), "inbound");
            state.router.dispatch(event).await;
        }
        None => debug!(chat_id = msg.chat.id.0, "ignored message"),
    }

    Ok(())
}
