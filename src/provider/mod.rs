//! Model backends that execute agent prompts.
//!
//! Two implementations ship with the binary: [`OllamaProvider`] talks to a
//! local Ollama server (chat API plus the web tool loop) and
//! [`MockProvider`] replays scripted replies in tests, including declared
//! failures, slow responses and hangs.
//!
//! The trait draws one line the rest of the pipeline leans on: `Err` from
//! [`Provider::execute`] means the transport broke (unreachable host,
//! malformed response body). When the backend itself reports a problem the
//! call still returns `Ok`, with `success == false` and the error text in
//! `content`, so the task layer settles it like any other outcome.
//!
//! Providers are picked by name at startup:
//!
//! ```rust
//! use dossier::provider::create_provider;
//!
//! assert!(create_provider("ollama").is_ok());
//! assert!(create_provider("mock").is_ok());
//! assert!(create_provider("invalid").is_err());
//! ```

mod mock;
mod ollama;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

pub use mock::{MockProvider, MockReply};
pub use ollama::OllamaProvider;

use crate::error::DossierError;

/// Average characters per token for prose mixed with JSON. Used when the
/// backend does not report real counts.
const CHARS_PER_TOKEN: f32 = 3.0;

/// Interface the engine uses to run one prompt against a backend.
#[async_trait]
pub trait Provider: Send + Sync + std::fmt::Debug {
    /// Provider name (e.g. "ollama", "mock").
    fn name(&self) -> &str;

    /// Execute a prompt and return the response.
    ///
    /// `Err` is reserved for transport problems; backend-reported errors
    /// come back as declared failures.
    async fn execute(&self, request: PromptRequest) -> Result<PromptResponse>;

    /// Whether this provider can run a tool loop.
    fn supports_tools(&self) -> bool {
        false
    }

    /// Whether the provider is expected to be reachable.
    fn is_available(&self) -> bool {
        true
    }
}

/// Request to execute a prompt.
#[derive(Debug, Clone)]
pub struct PromptRequest {
    /// The main prompt to execute.
    pub prompt: String,

    /// Optional system prompt to set context.
    pub system_prompt: Option<String>,

    /// Model to use (already resolved from any alias).
    pub model: String,

    /// Tool ids the agent may call.
    pub allowed_tools: Vec<String>,

    /// Maximum tokens to generate.
    pub max_tokens: Option<u32>,

    /// Sampling temperature. Providers treat unset as 0.0.
    pub temperature: Option<f32>,
}

impl PromptRequest {
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            system_prompt: None,
            allowed_tools: vec![],
            max_tokens: None,
            temperature: None,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_tools(mut self, tools: Vec<String>) -> Self {
        self.allowed_tools = tools;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Response from a prompt execution.
#[derive(Debug, Clone)]
pub struct PromptResponse {
    /// Generated content on success, the declared error text otherwise.
    pub content: String,

    /// Whether the backend reported success.
    pub success: bool,

    /// Token usage, measured or estimated.
    pub usage: TokenUsage,
}

impl PromptResponse {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            success: true,
            usage: TokenUsage::default(),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            content: error.into(),
            success: false,
            usage: TokenUsage::default(),
        }
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = usage;
        self
    }
}

/// Token usage statistics.
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn new(prompt: u32, completion: u32) -> Self {
        Self {
            prompt_tokens: prompt,
            completion_tokens: completion,
            total_tokens: prompt + completion,
        }
    }

    /// Estimate from character counts when the backend reports nothing.
    pub fn estimate(prompt_len: usize, response_len: usize) -> Self {
        let prompt_tokens = (prompt_len as f32 / CHARS_PER_TOKEN).ceil() as u32;
        let completion_tokens = (response_len as f32 / CHARS_PER_TOKEN).ceil() as u32;
        Self::new(prompt_tokens, completion_tokens)
    }
}

/// Create a provider instance by name (case-insensitive).
///
/// Knows `ollama` (needs a reachable server, `OLLAMA_HOST` or the localhost
/// default) and `mock` (no requirements). Anything else is
/// [`DossierError::UnknownProvider`].
pub fn create_provider(name: &str) -> Result<Arc<dyn Provider>, DossierError> {
    match name.to_lowercase().as_str() {
        "ollama" => Ok(Arc::new(OllamaProvider::new())),
        "mock" => Ok(Arc::new(MockProvider::new())),
        _ => Err(DossierError::UnknownProvider {
            name: name.to_string(),
            available: "ollama, mock".to_string(),
        }),
    }
}
