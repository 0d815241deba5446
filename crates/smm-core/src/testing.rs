//! Fake port implementations shared by the unit tests.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};

use crate::{
    completion::CompletionBackend,
    domain::{ChatId, MessageId, MessageRef, Post},
    error_sink::{ErrorOrigin, ErrorSink},
    messaging::{
        port::MessagingPort,
        types::{InlineKeyboard, MessagingCapabilities},
    },
    scheduler::Clock,
    store::ContentStore,
    Error, Result,
};

// ============== Completion ==============

enum BackendMode {
    Reply(String),
    Fail(String),
    Hang,
}

pub struct FakeBackend {
    mode: BackendMode,
    prompts: Mutex<Vec<String>>,
}

impl FakeBackend {
    fn with_mode(mode: BackendMode) -> Self {
        Self {
            mode,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(text: &str) -> Self {
        Self::with_mode(BackendMode::Reply(text.to_string()))
    }

    pub fn failing(msg: &str) -> Self {
        Self::with_mode(BackendMode::Fail(msg.to_string()))
    }

    pub fn hanging() -> Self {
        Self::with_mode(BackendMode::Hang)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionBackend for FakeBackend {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.mode {
            BackendMode::Reply(text) => Ok(text.clone()),
            BackendMode::Fail(msg) => Err(Error::Completion(msg.clone())),
            BackendMode::Hang => std::future::pending::<Result<String>>().await,
        }
    }
}

// ============== Store ==============

#[derive(Default)]
pub struct FakeStore {
    fail: bool,
    posts: Mutex<Vec<Post>>,
    submits: Mutex<usize>,
}

impl FakeStore {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Insert directly, bypassing the submit counter.
    pub fn seed(&self, language: &str, content: &str) -> Post {
        let mut posts = self.posts.lock().unwrap();
        let id = posts.len() as i64 + 1;
        let post = Post {
            id,
            created_at: Utc::now() + chrono::Duration::milliseconds(id),
            language: language.to_string(),
            content: content.to_string(),
        };
        posts.push(post.clone());
        post
    }

    pub fn posts(&self) -> Vec<Post> {
        self.posts.lock().unwrap().clone()
    }

    pub fn submit_calls(&self) -> usize {
        *self.submits.lock().unwrap()
    }
}

#[async_trait]
impl ContentStore for FakeStore {
    async fn submit(&self, language: &str, content: &str) -> Result<Post> {
        *self.submits.lock().unwrap() += 1;
        if self.fail {
            return Err(Error::Storage("disk I/O error".to_string()));
        }
        Ok(self.seed(language, content))
    }

    async fn latest(&self, language: &str) -> Result<Option<Post>> {
        if self.fail {
            return Err(Error::Storage("disk I/O error".to_string()));
        }
        Ok(self
            .posts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.language == language)
            .max_by_key(|p| (p.created_at, p.id))
            .cloned())
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.posts.lock().unwrap().len() as u64)
    }
}

// ============== Messaging ==============

#[derive(Default)]
pub struct FakeMessenger {
    fail: bool,
    next_id: Mutex<i32>,
    replies: Mutex<Vec<(ChatId, String)>>,
    broadcasts: Mutex<Vec<(ChatId, String, Option<InlineKeyboard>)>>,
}

impl FakeMessenger {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn alloc(&self, chat_id: ChatId) -> MessageRef {
        let mut guard = self.next_id.lock().unwrap();
        *guard += 1;
        MessageRef {
            chat_id,
            message_id: MessageId(*guard),
        }
    }

    pub fn replies(&self) -> Vec<(ChatId, String)> {
        self.replies.lock().unwrap().clone()
    }

    pub fn broadcasts(&self) -> Vec<(ChatId, String, Option<InlineKeyboard>)> {
        self.broadcasts.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessagingPort for FakeMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            supports_inline_keyboards: true,
            max_message_len: 4096,
        }
    }

    async fn send_reply(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
        if self.fail {
            return Err(Error::Transport("network unreachable".to_string()));
        }
        self.replies.lock().unwrap().push((chat_id, text.to_string()));
        Ok(self.alloc(chat_id))
    }

    async fn send_broadcast(
        &self,
        channel: ChatId,
        text: &str,
        keyboard: Option<InlineKeyboard>,
    ) -> Result<MessageRef> {
        if self.fail {
            return Err(Error::Transport("network unreachable".to_string()));
        }
        self.broadcasts
            .lock()
            .unwrap()
            .push((channel, text.to_string(), keyboard));
        Ok(self.alloc(channel))
    }
}

// ============== Error sink ==============

/// Records `(origin, error kind, error message)` per report.
#[derive(Default)]
pub struct RecordingSink {
    reports: Mutex<Vec<(ErrorOrigin, &'static str, String)>>,
}

impl RecordingSink {
    pub fn reports(&self) -> Vec<(ErrorOrigin, &'static str, String)> {
        self.reports.lock().unwrap().clone()
    }
}

impl ErrorSink for RecordingSink {
    fn report(&self, origin: &ErrorOrigin, error: &Error) {
        self.reports
            .lock()
            .unwrap()
            .push((origin.clone(), error.kind(), error.to_string()));
    }
}

// ============== Clock ==============

pub struct ManualClock {
    now: Mutex<DateTime<Local>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Local>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Local>) {
        *self.now.lock().unwrap() = now;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        *self.now.lock().unwrap()
    }
}
