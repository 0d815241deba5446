//! Completion proxy: bridges free text to a remote AI completion backend.
//!
//! The backend reports every failure as an `Error`; the proxy bounds the call
//! with a timeout and turns any failure into a fixed user-facing fallback.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;

use crate::{
    error_sink::{ErrorOrigin, ErrorSink},
    Error, Result,
};

/// Reply used whenever the AI backend cannot produce an answer.
pub const AI_FALLBACK_TEXT: &str = "⚠️ Помилка підключення до AI. Спробуйте ще раз.";

/// Single-turn completion backend (OpenRouter, OpenAI, ...).
///
/// Implementations must return `Err(Error::Completion)` for transport errors,
/// non-success statuses, and malformed or empty bodies.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

pub struct CompletionProxy {
    backend: Arc<dyn CompletionBackend>,
    sink: Arc<dyn ErrorSink>,
    timeout: Duration,
}

impl CompletionProxy {
    pub fn new(
        backend: Arc<dyn CompletionBackend>,
        sink: Arc<dyn ErrorSink>,
        timeout: Duration,
    ) -> Self {
        Self {
            backend,
            sink,
            timeout,
        }
    }

    /// Complete `prompt`, never failing: errors and timeouts are reported to
    /// the sink once and replaced with [`AI_FALLBACK_TEXT`].
    pub async fn complete(&self, context: &str, prompt: &str) -> String {
        let res = match tokio::time::timeout(self.timeout, self.backend.complete(prompt)).await {
            Ok(res) => res,
            Err(_) => Err(Error::Completion(format!(
                "timed out after {}ms",
                self.timeout.as_millis()
            ))),
        };

        match res {
            Ok(text) => text,
            Err(e) => {
                self.sink
                    .report(&ErrorOrigin::new("completion", context), &e);
                AI_FALLBACK_TEXT.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeBackend, RecordingSink};

    fn proxy(backend: Arc<FakeBackend>, sink: Arc<RecordingSink>) -> CompletionProxy {
        CompletionProxy::new(backend, sink, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn returns_backend_text_verbatim() {
        let backend = Arc::new(FakeBackend::replying("  Hello from AI\n"));
        let sink = Arc::new(RecordingSink::default());
        let out = proxy(backend.clone(), sink.clone()).complete("t", "hi").await;

        assert_eq!(out, "  Hello from AI\n");
        assert_eq!(backend.prompts(), vec!["hi".to_string()]);
        assert!(sink.reports().is_empty());
    }

    #[tokio::test]
    async fn backend_error_becomes_fallback_and_one_report() {
        let backend = Arc::new(FakeBackend::failing("openrouter returned 500"));
        let sink = Arc::new(RecordingSink::default());
        let out = proxy(backend, sink.clone()).complete("chat 7", "hi").await;

        assert_eq!(out, AI_FALLBACK_TEXT);
        let reports = sink.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].0.component, "completion");
        assert_eq!(reports[0].0.context, "chat 7");
        assert_eq!(reports[0].1, "completion");
    }

    #[tokio::test(start_paused = true)]
    async fn slow_backend_times_out_into_fallback() {
        let backend = Arc::new(FakeBackend::hanging());
        let sink = Arc::new(RecordingSink::default());
        let proxy = CompletionProxy::new(backend, sink.clone(), Duration::from_secs(3));

        let out = proxy.complete("chat 1", "hi").await;

        assert_eq!(out, AI_FALLBACK_TEXT);
        assert_eq!(sink.reports().len(), 1);
        assert!(sink.reports()[0].2.contains("timed out"));
    }
}
