//! Daily publication scheduler.
//!
//! - One trigger per process: a fixed time of day in the local time zone
//! - `Armed` waits for the next fire time, `Firing` runs one publication cycle
//! - Fires at most once per calendar day; missed fires are not backfilled
//! - Wall-clock time comes from a [`Clock`] so tests can drive virtual time

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    domain::ChatId,
    error_sink::{ErrorOrigin, ErrorSink},
    messaging::{
        port::MessagingPort,
        types::{clamp_message, InlineKeyboard},
    },
    store::ContentStore,
};

pub const NOTHING_TO_PUBLISH_TEXT: &str = "❌ Немає постів для відправки.";
pub const CHAT_BUTTON_LABEL: &str = "💬 Почати чат із ботом";

/// A fire later than this past its scheduled instant is skipped, not run late.
pub const MISFIRE_GRACE_SECS: i64 = 5 * 60;

/// Upper bound on a single sleep, so wall-clock jumps are noticed.
const MAX_SLEEP_SLICE: Duration = Duration::from_secs(60);

/// Source of wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// A fixed time of day, repeated every calendar day.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DailySchedule {
    at: NaiveTime,
}

impl DailySchedule {
    pub fn new(at: NaiveTime) -> Self {
        Self { at }
    }

    pub fn at(&self) -> NaiveTime {
        self.at
    }

    /// First fire instant strictly after `now`.
    ///
    /// Local times skipped by a DST change move to the next day; ambiguous
    /// local times resolve to the earliest instant.
    pub fn next_after(&self, now: DateTime<Local>) -> DateTime<Local> {
        now.date_naive()
            .iter_days()
            .take(4)
            .filter_map(|day| local_instant(day, self.at))
            .find(|t| *t > now)
            .unwrap_or_else(|| now + chrono::Duration::days(1))
    }
}

fn local_instant(day: NaiveDate, at: NaiveTime) -> Option<DateTime<Local>> {
    Local.from_local_datetime(&day.and_time(at)).earliest()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Armed { next_fire: DateTime<Local> },
    Firing { day: NaiveDate },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PublishOutcome {
    Published { post_id: i64 },
    NothingToPublish,
    Failed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not due yet.
    Idle,
    Fired(PublishOutcome),
    /// Due, but too late (or already fired today); re-armed without publishing.
    Skipped { missed: DateTime<Local> },
}

#[derive(Clone, Debug)]
pub struct PublicationConfig {
    pub schedule: DailySchedule,
    pub language: String,
    pub channel: ChatId,
    pub bot_username: String,
}

struct SchedulerState {
    phase: Phase,
    last_fired: Option<NaiveDate>,
}

pub struct PublicationScheduler {
    cfg: PublicationConfig,
    store: Arc<dyn ContentStore>,
    messenger: Arc<dyn MessagingPort>,
    sink: Arc<dyn ErrorSink>,
    clock: Arc<dyn Clock>,
    state: tokio::sync::Mutex<SchedulerState>,
}

impl PublicationScheduler {
    /// Create the scheduler, armed for the first fire time after `clock.now()`.
    pub fn new(
        cfg: PublicationConfig,
        store: Arc<dyn ContentStore>,
        messenger: Arc<dyn MessagingPort>,
        sink: Arc<dyn ErrorSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let next_fire = cfg.schedule.next_after(clock.now());
        Self {
            cfg,
            store,
            messenger,
            sink,
            clock,
            state: tokio::sync::Mutex::new(SchedulerState {
                phase: Phase::Armed { next_fire },
                last_fired: None,
            }),
        }
    }

    pub async fn phase(&self) -> Phase {
        self.state.lock().await.phase
    }

    /// Run until `cancel` fires. Errors in a cycle never stop the loop.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            at = %self.cfg.schedule.at(),
            language = %self.cfg.language,
            channel = self.cfg.channel.0,
            "publication scheduler started"
        );

        loop {
            if cancel.is_cancelled() {
                break;
            }

            match self.tick().await {
                TickOutcome::Idle => {}
                TickOutcome::Fired(outcome) => info!(?outcome, "daily publication finished"),
                TickOutcome::Skipped { missed } => {
                    warn!(%missed, "daily publication skipped")
                }
            }

            let wait = self.time_until_due().await.min(MAX_SLEEP_SLICE);
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = sleep(wait) => {}
            }
        }

        info!("publication scheduler stopped");
    }

    /// Evaluate the trigger against the current wall-clock time, firing at most once.
    pub async fn tick(&self) -> TickOutcome {
        let now = self.clock.now();

        let day = {
            let mut st = self.state.lock().await;
            let Phase::Armed { next_fire } = st.phase else {
                return TickOutcome::Idle;
            };
            if now < next_fire {
                return TickOutcome::Idle;
            }

            // A late fire still belongs to the day it was scheduled for.
            let day = next_fire.date_naive();
            let late = now - next_fire > chrono::Duration::seconds(MISFIRE_GRACE_SECS);
            if late || st.last_fired == Some(day) {
                let rearm = self.cfg.schedule.next_after(now);
                st.phase = Phase::Armed { next_fire: rearm };
                info!(%rearm, "publication re-armed");
                return TickOutcome::Skipped { missed: next_fire };
            }

            st.phase = Phase::Firing { day };
            day
        };

        let outcome = self.publish_latest().await;

        let mut st = self.state.lock().await;
        st.last_fired = Some(day);
        let next_fire = self.cfg.schedule.next_after(self.clock.now());
        st.phase = Phase::Armed { next_fire };
        info!(%next_fire, "publication re-armed");

        TickOutcome::Fired(outcome)
    }

    /// One publication cycle: newest post for the configured language, or a notice.
    pub async fn publish_latest(&self) -> PublishOutcome {
        let origin = || {
            ErrorOrigin::new(
                "scheduler",
                format!(
                    "daily publication ({}) to channel {}",
                    self.cfg.language, self.cfg.channel.0
                ),
            )
        };

        let latest = match self.store.latest(&self.cfg.language).await {
            Ok(v) => v,
            Err(e) => {
                self.sink.report(&origin(), &e);
                return PublishOutcome::Failed;
            }
        };

        let (text, keyboard, outcome) = match latest {
            Some(post) => (
                post.content,
                Some(self.chat_button()),
                PublishOutcome::Published { post_id: post.id },
            ),
            None => (
                NOTHING_TO_PUBLISH_TEXT.to_string(),
                None,
                PublishOutcome::NothingToPublish,
            ),
        };

        let caps = self.messenger.capabilities();
        let keyboard = keyboard.filter(|_| caps.supports_inline_keyboards);
        let text = clamp_message(&text, caps.max_message_len);

        match self
            .messenger
            .send_broadcast(self.cfg.channel, &text, keyboard)
            .await
        {
            Ok(_) => outcome,
            Err(e) => {
                self.sink.report(&origin(), &e);
                PublishOutcome::Failed
            }
        }
    }

    fn chat_button(&self) -> InlineKeyboard {
        let handle = self.cfg.bot_username.trim_start_matches('@');
        InlineKeyboard::single_link(CHAT_BUTTON_LABEL, format!("https://t.me/{handle}"))
    }

    async fn time_until_due(&self) -> Duration {
        let Phase::Armed { next_fire } = self.state.lock().await.phase else {
            return Duration::ZERO;
        };
        (next_fire - self.clock.now())
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}

// === Tests ===
