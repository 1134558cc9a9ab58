//! Ollama provider for local LLM execution.
//!
//! Talks to a local Ollama server over its chat API. When the model asks
//! for tool calls they are executed and fed back as `tool` messages, up to
//! a bounded number of round-trips; after that the model's latest content
//! is returned as-is.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{PromptRequest, PromptResponse, Provider, TokenUsage};
use crate::tools;

/// Default Ollama API endpoint.
const DEFAULT_HOST: &str = "http://localhost:11434";

/// Most tool round-trips allowed before the model must answer.
const MAX_TOOL_TURNS: usize = 4;

/// Ollama provider for local LLM execution.
#[derive(Debug)]
pub struct OllamaProvider {
    client: Client,
    host: String,
}

impl OllamaProvider {
    /// Reads `OLLAMA_HOST` when set, otherwise targets the local default.
    pub fn new() -> Self {
        let host = std::env::var("OLLAMA_HOST")
            .ok()
            .filter(|h| !h.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        Self {
            client: Client::new(),
            host,
        }
    }

    /// Set a custom host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }
}

impl Default for OllamaProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn execute(&self, request: PromptRequest) -> Result<PromptResponse> {
        let mut messages = Vec::new();
        if let Some(system) = &request.system_prompt {
            messages.push(ChatMessage::text("system", system));
        }
        messages.push(ChatMessage::text("user", &request.prompt));

        let tool_defs = tools::definitions(&request.allowed_tools);
        let tool_payload = if tool_defs.is_empty() {
            None
        } else {
            Some(tool_defs)
        };

        let url = format!("{}/api/chat", self.host);
        let prompt_len = request.prompt.len();
        let mut prompt_tokens = 0u32;
        let mut completion_tokens = 0u32;
        let mut turns = 0usize;

        loop {
            let body = ChatRequest {
                model: &request.model,
                messages: &messages,
                stream: false,
                tools: tool_payload.as_deref(),
                options: ChatOptions {
                    temperature: request.temperature.unwrap_or(0.0),
                    num_predict: request.max_tokens,
                },
            };

            let response = self
                .client
                .post(&url)
                .json(&body)
                .send()
                .await
                .context("Failed to send request to Ollama API")?;

            let status = response.status();
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                return Ok(PromptResponse::failure(format!(
                    "Ollama API error ({}): {}",
                    status.as_u16(),
                    text
                )));
            }

            let chat: ChatResponse = response
                .json()
                .await
                .context("Failed to parse Ollama API response")?;

            prompt_tokens += chat.prompt_eval_count.unwrap_or(0);
            completion_tokens += chat.eval_count.unwrap_or(0);

            let tool_calls = chat.message.tool_calls.clone().unwrap_or_default();
            if tool_calls.is_empty() || turns >= MAX_TOOL_TURNS {
                let content = chat.message.content;
                let usage = if prompt_tokens == 0 && completion_tokens == 0 {
                    TokenUsage::estimate(prompt_len, content.len())
                } else {
                    TokenUsage::new(prompt_tokens, completion_tokens)
                };
                return Ok(PromptResponse::success(content).with_usage(usage));
            }

            debug!(calls = tool_calls.len(), turn = turns, "executing tool calls");
            messages.push(chat.message);
            for call in &tool_calls {
                let reply = tools::dispatch(&call.function.name, &call.function.arguments).await;
                messages.push(ChatMessage::text("tool", reply));
            }
            turns += 1;
        }
    }

    fn supports_tools(&self) -> bool {
        true
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [Value]>,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Serialize, Deserialize, Clone)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ToolCall>>,
}

impl ChatMessage {
    fn text(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
            tool_calls: None,
        }
    }
}

#[derive(Serialize, Deserialize, Clone)]
struct ToolCall {
    function: ToolFunction,
}

#[derive(Serialize, Deserialize, Clone)]
struct ToolFunction {
    name: String,
    arguments: Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatMessage,
    prompt_eval_count: Option<u32>,
    eval_count: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_ollama_provider_name() {
        let provider = OllamaProvider::new();
        assert_eq!(provider.name(), "ollama");
        assert!(provider.supports_tools());
    }

    #[test]
    fn test_ollama_with_host() {
        let provider = OllamaProvider::new().with_host("http://192.168.1.100:11434");
        assert_eq!(provider.host, "http://192.168.1.100:11434");
    }

    #[tokio::test]
    async fn test_execute_returns_reply_and_counts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": {"role": "assistant", "content": "{\"founded\": \"2019\"}"},
                "prompt_eval_count": 20,
                "eval_count": 8
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = OllamaProvider::new().with_host(server.uri());
        let response = provider
            .execute(PromptRequest::new("Profile Acme", "llama3.2"))
            .await
            .unwrap();

        assert!(response.success);
        assert_eq!(response.content, "{\"founded\": \"2019\"}");
        assert_eq!(response.usage.prompt_tokens, 20);
        assert_eq!(response.usage.completion_tokens, 8);
    }

    #[tokio::test]
    async fn test_http_error_is_a_declared_failure_not_err() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
            .mount(&server)
            .await;

        let provider = OllamaProvider::new().with_host(server.uri());
        let response = provider
            .execute(PromptRequest::new("Profile Acme", "llama3.2"))
            .await
            .unwrap();

        assert!(!response.success);
        assert!(response.content.contains("Ollama API error (500)"));
        assert!(response.content.contains("model not loaded"));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_a_transport_err() {
        // Port 9 is discard; nothing listens there.
        let provider = OllamaProvider::new().with_host("http://127.0.0.1:9");
        let result = provider
            .execute(PromptRequest::new("Profile Acme", "llama3.2"))
            .await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("Failed to send request to Ollama API"));
    }

    #[tokio::test]
    async fn test_tool_calls_are_executed_and_fed_back() {
        let server = MockServer::start().await;

        // First turn: the model asks for a tool nothing can dispatch, so the
        // loop feeds back an error string without touching the network.
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": {
                    "role": "assistant",
                    "content": "",
                    "tool_calls": [
                        {"function": {"name": "telepathy", "arguments": {"query": "Acme"}}}
                    ]
                }
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        // Second turn matches only if the tool reply made it into the
        // conversation, and answers with final content.
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_string_contains("Error: unknown tool: telepathy"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": {"role": "assistant", "content": "{\"done\": true}"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = OllamaProvider::new().with_host(server.uri());
        let request = PromptRequest::new("Research Acme", "llama3.2")
            .with_tools(vec!["web_search".to_string()]);
        let response = provider.execute(request).await.unwrap();

        assert!(response.success);
        assert_eq!(response.content, "{\"done\": true}");
    }

    #[tokio::test]
    async fn test_request_carries_model_and_zero_temperature() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_string_contains("\"model\":\"llama3.2\""))
            .and(body_string_contains("\"temperature\":0.0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": {"role": "assistant", "content": "ok"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = OllamaProvider::new().with_host(server.uri());
        let response = provider
            .execute(PromptRequest::new("Hello", "llama3.2"))
            .await
            .unwrap();
        assert!(response.success);
    }
}
