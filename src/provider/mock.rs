//! Mock provider for testing.
//!
//! Replies are scripted per prompt: a keyed script matches any prompt
//! containing its key and serves its replies in order, repeating the last
//! one once exhausted. Prompts with no matching key fall back to a FIFO
//! queue, then to the default response. Scripts can fail, stall forever or
//! panic, which is how the timeout and isolation paths get exercised.

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::{sleep, Duration};

use super::{PromptRequest, PromptResponse, Provider, TokenUsage};

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Successful reply with the given content.
    Success(String),
    /// Backend-declared failure (what an API error body becomes).
    Failure(String),
    /// Transport-level error returned as `Err`.
    TransportError(String),
    /// Successful reply that arrives after a delay.
    Slow { delay_ms: u64, content: String },
    /// Never resolves. Pairs with timeout tests.
    Hang,
    /// Panics inside the provider. Pairs with isolation tests.
    Panic,
}

#[derive(Debug)]
struct KeyedScript {
    key: String,
    replies: Vec<MockReply>,
    cursor: usize,
}

/// Mock provider with scripted responses and request recording.
#[derive(Debug)]
pub struct MockProvider {
    scripts: Mutex<Vec<KeyedScript>>,
    /// Queue of responses for unkeyed prompts (FIFO).
    queue: Mutex<Vec<String>>,
    /// Default response when nothing else matches.
    default_response: String,
    /// Every request made, for assertions.
    requests: Mutex<Vec<PromptRequest>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(vec![]),
            queue: Mutex::new(vec![]),
            default_response: "Mock response".to_string(),
            requests: Mutex::new(vec![]),
        }
    }

    /// Set the response served when no script or queued reply matches.
    pub fn with_default(mut self, response: impl Into<String>) -> Self {
        self.default_response = response.into();
        self
    }

    /// Serve `content` for every prompt containing `key`.
    pub fn with_response_for(self, key: impl Into<String>, content: impl Into<String>) -> Self {
        self.with_reply_sequence(key, vec![MockReply::Success(content.into())])
    }

    /// Serve a declared failure for every prompt containing `key`.
    pub fn with_failure_for(self, key: impl Into<String>, error: impl Into<String>) -> Self {
        self.with_reply_sequence(key, vec![MockReply::Failure(error.into())])
    }

    /// Script a reply sequence for prompts containing `key`. Replies are
    /// served in order; the last one repeats once the script is exhausted.
    pub fn with_reply_sequence(self, key: impl Into<String>, replies: Vec<MockReply>) -> Self {
        assert!(!replies.is_empty(), "reply sequence must not be empty");
        self.scripts.lock().push(KeyedScript {
            key: key.into(),
            replies,
            cursor: 0,
        });
        self
    }

    /// Add a response to the unkeyed FIFO queue.
    pub fn queue_response(&self, response: impl Into<String>) {
        self.queue.lock().push(response.into());
    }

    /// All requests made to this provider, in order.
    pub fn requests(&self) -> Vec<PromptRequest> {
        self.requests.lock().clone()
    }

    /// The last request made, if any.
    pub fn last_request(&self) -> Option<PromptRequest> {
        self.requests.lock().last().cloned()
    }

    fn reply_for(&self, prompt: &str) -> MockReply {
        let mut scripts = self.scripts.lock();
        if let Some(script) = scripts.iter_mut().find(|s| prompt.contains(&s.key)) {
            let index = script.cursor.min(script.replies.len() - 1);
            if script.cursor < script.replies.len() {
                script.cursor += 1;
            }
            return script.replies[index].clone();
        }
        drop(scripts);

        let mut queue = self.queue.lock();
        if !queue.is_empty() {
            return MockReply::Success(queue.remove(0));
        }

        MockReply::Success(self.default_response.clone())
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn execute(&self, request: PromptRequest) -> Result<PromptResponse> {
        self.requests.lock().push(request.clone());

        match self.reply_for(&request.prompt) {
            MockReply::Success(content) => {
                let usage = TokenUsage::estimate(request.prompt.len(), content.len());
                Ok(PromptResponse::success(content).with_usage(usage))
            }
            MockReply::Failure(error) => Ok(PromptResponse::failure(error)),
            MockReply::TransportError(error) => Err(anyhow::anyhow!(error)),
            MockReply::Slow { delay_ms, content } => {
                sleep(Duration::from_millis(delay_ms)).await;
                let usage = TokenUsage::estimate(request.prompt.len(), content.len());
                Ok(PromptResponse::success(content).with_usage(usage))
            }
            MockReply::Hang => std::future::pending().await,
            MockReply::Panic => panic!("mock provider panic requested"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_default_response() {
        let provider = MockProvider::new();
        let response = provider
            .execute(PromptRequest::new("Hello", "test-model"))
            .await
            .unwrap();

        assert!(response.success);
        assert_eq!(response.content, "Mock response");
    }

    #[tokio::test]
    async fn test_mock_queued_responses_then_default() {
        let provider = MockProvider::new();
        provider.queue_response("First response");
        provider.queue_response("Second response");

        let r1 = provider
            .execute(PromptRequest::new("a", "m"))
            .await
            .unwrap();
        let r2 = provider
            .execute(PromptRequest::new("b", "m"))
            .await
            .unwrap();
        let r3 = provider
            .execute(PromptRequest::new("c", "m"))
            .await
            .unwrap();

        assert_eq!(r1.content, "First response");
        assert_eq!(r2.content, "Second response");
        assert_eq!(r3.content, "Mock response");
    }

    #[tokio::test]
    async fn test_keyed_script_matches_by_substring() {
        let provider = MockProvider::new()
            .with_response_for("market", "market findings")
            .with_response_for("team", "team findings");

        let market = provider
            .execute(PromptRequest::new("Research the market for Acme", "m"))
            .await
            .unwrap();
        let team = provider
            .execute(PromptRequest::new("Investigate the team behind Acme", "m"))
            .await
            .unwrap();

        assert_eq!(market.content, "market findings");
        assert_eq!(team.content, "team findings");
    }

    #[tokio::test]
    async fn test_reply_sequence_advances_then_sticks_on_last() {
        let provider = MockProvider::new().with_reply_sequence(
            "news",
            vec![
                MockReply::Failure("first attempt fails".into()),
                MockReply::Success("second attempt works".into()),
            ],
        );

        let r1 = provider
            .execute(PromptRequest::new("Collect news", "m"))
            .await
            .unwrap();
        let r2 = provider
            .execute(PromptRequest::new("Collect news", "m"))
            .await
            .unwrap();
        let r3 = provider
            .execute(PromptRequest::new("Collect news", "m"))
            .await
            .unwrap();

        assert!(!r1.success);
        assert_eq!(r1.content, "first attempt fails");
        assert!(r2.success);
        assert_eq!(r2.content, "second attempt works");
        assert!(r3.success, "last reply repeats after the script ends");
    }

    #[tokio::test]
    async fn test_transport_error_is_err() {
        let provider = MockProvider::new()
            .with_reply_sequence("x", vec![MockReply::TransportError("wire cut".into())]);

        let err = provider
            .execute(PromptRequest::new("x marks the spot", "m"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "wire cut");
    }

    #[tokio::test]
    async fn test_mock_records_requests() {
        let provider = MockProvider::new();
        provider
            .execute(
                PromptRequest::new("First prompt", "model-1")
                    .with_tools(vec!["web_search".to_string()]),
            )
            .await
            .unwrap();
        provider
            .execute(PromptRequest::new("Second prompt", "model-2"))
            .await
            .unwrap();

        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].prompt, "First prompt");
        assert_eq!(requests[0].allowed_tools, vec!["web_search"]);
        assert_eq!(requests[1].model, "model-2");
        assert_eq!(provider.last_request().unwrap().prompt, "Second prompt");
    }

    #[tokio::test]
    async fn test_slow_reply_arrives_after_delay() {
        let provider = MockProvider::new().with_reply_sequence(
            "slow",
            vec![MockReply::Slow {
                delay_ms: 50,
                content: "eventually".into(),
            }],
        );

        let started = std::time::Instant::now();
        let response = provider
            .execute(PromptRequest::new("slow down", "m"))
            .await
            .unwrap();
        assert!(started.elapsed() >= Duration::from_millis(50));
        assert_eq!(response.content, "eventually");
    }
}
