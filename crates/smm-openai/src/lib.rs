//! OpenAI-compatible chat completions adapter (OpenRouter by default).
//!
//! Single-turn requests only: every call carries exactly one user message.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use smm_core::{completion::CompletionBackend, errors::Error, Result};

#[derive(Clone, Debug)]
pub struct ChatCompletionsClient {
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Deserialize, Debug)]
struct ResponseMessage {
    content: Option<String>,
}

impl ChatCompletionsClient {
    /// The request timeout is enforced by `CompletionProxy`, not here.
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        temperature: f32,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::Completion(format!("http client build failed: {e}")))?;
        Ok(Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
            temperature,
            http,
        })
    }
}

#[async_trait]
impl CompletionBackend for ChatCompletionsClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Completion(format!("request error: {e}")))?;

        let status = resp.status();
        debug!(%status, model = %self.model, "chat completion response");
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Completion(format!(
                "chat completion failed: {status} {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let text = resp
            .text()
            .await
            .map_err(|e| Error::Completion(format!("failed to read body: {e}")))?;
        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| Error::Completion(format!("malformed response: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(Error::Completion(
                "response contained no message content".to_string(),
            ));
        }

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use serde_json::json;
    use smm_core::{
        completion::{CompletionProxy, AI_FALLBACK_TEXT},
        error_sink::TracingErrorSink,
    };
    use wiremock::{
        matchers::{body_json, header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;

    const PATH: &str = "/api/v1/chat/completions";

    fn client(server: &MockServer) -> ChatCompletionsClient {
        ChatCompletionsClient::new(
            format!("{}{PATH}", server.uri()),
            "sk-test",
            "openrouter/gpt-4o",
            0.7,
        )
        .unwrap()
    }

    async fn serve(server: &MockServer, response: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path(PATH))
            .respond_with(response)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn sends_single_user_message_and_returns_nested_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(PATH))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_json(json!({
                "model": "openrouter/gpt-4o",
                "messages": [{"role": "user", "content": "Привіт"}],
                "temperature": 0.7,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "gen-1",
                "choices": [{"message": {"role": "assistant", "content": "Hello!"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        assert_eq!(client(&server).complete("Привіт").await.unwrap(), "Hello!");
    }

    #[tokio::test]
    async fn error_status_is_a_completion_error() {
        let server = MockServer::start().await;
        serve(
            &server,
            ResponseTemplate::new(429).set_body_string("rate limited"),
        )
        .await;

        let err = client(&server).complete("hi").await.unwrap_err();
        assert!(matches!(err, Error::Completion(ref m) if m.contains("429")), "{err}");
    }

    #[tokio::test]
    async fn malformed_or_empty_bodies_are_completion_errors() {
        for body in [
            ResponseTemplate::new(200).set_body_string("<html>oops</html>"),
            ResponseTemplate::new(200).set_body_json(json!({})),
            ResponseTemplate::new(200).set_body_json(json!({"choices": []})),
            ResponseTemplate::new(200).set_body_json(json!({"choices": [{"message": {}}]})),
            ResponseTemplate::new(200)
                .set_body_json(json!({"choices": [{"message": {"content": "  "}}]})),
        ] {
            let server = MockServer::start().await;
            serve(&server, body).await;
            let err = client(&server).complete("hi").await.unwrap_err();
            assert!(matches!(err, Error::Completion(_)), "{err}");
        }
    }

    #[tokio::test]
    async fn proxy_over_http_falls_back_on_failure_and_timeout() {
        let server = MockServer::start().await;
        serve(&server, ResponseTemplate::new(500)).await;
        let proxy = CompletionProxy::new(
            Arc::new(client(&server)),
            Arc::new(TracingErrorSink),
            Duration::from_secs(5),
        );
        assert_eq!(proxy.complete("test", "hi").await, AI_FALLBACK_TEXT);

        let slow = MockServer::start().await;
        serve(
            &slow,
            ResponseTemplate::new(200)
                .set_body_json(json!({"choices": [{"message": {"content": "late"}}]}))
                .set_delay(Duration::from_secs(2)),
        )
        .await;
        let proxy = CompletionProxy::new(
            Arc::new(client(&slow)),
            Arc::new(TracingErrorSink),
            Duration::from_millis(200),
        );
        assert_eq!(proxy.complete("test", "hi").await, AI_FALLBACK_TEXT);
    }

    #[tokio::test]
    async fn proxy_over_http_passes_content_through() {
        let server = MockServer::start().await;
        serve(
            &server,
            ResponseTemplate::new(200)
                .set_body_json(json!({"choices": [{"message": {"content": "Готово"}}]})),
        )
        .await;
        let proxy = CompletionProxy::new(
            Arc::new(client(&server)),
            Arc::new(TracingErrorSink),
            Duration::from_secs(5),
        );
        assert_eq!(proxy.complete("test", "hi").await, "Готово");
    }
}
