//! Provider trait and normalized request/response types.
//!
//! The [`Provider`] trait abstracts over LLM backends, translating between
//! normalized [`CompletionRequest`]/[`CompletionResponse`] types and
//! provider-specific HTTP APIs. Built-in implementations:
//! [`OpenAiProvider`], [`OllamaProvider`], and [`MockProvider`] for tests.
//!
//! ```text
//! Executor ──► CompletionRequest ──► Provider::complete() ──► CompletionResponse
//!                                            │
//!                                 ┌──────────┴──────────┐
//!                           OpenAiProvider        OllamaProvider
//!                        /v1/chat/completions        /api/chat
//! ```

pub mod mock;
pub mod ollama;
pub mod openai;

pub use mock::{MockProvider, ScriptedResponse};
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

use crate::error::Result;
use async_trait::async_trait;
use reqwest::Client;

/// A normalized completion request. Providers translate this into their
/// wire format; nothing provider-specific leaks above this boundary.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Model identifier (e.g. `"gpt-4o"`, `"llama3.2:3b"`).
    pub model: String,

    /// Full conversation: system instruction first, then the user turn(s).
    pub messages: Vec<ChatMessage>,

    /// Sampling temperature.
    pub temperature: f32,

    /// Completion token cap.
    pub max_tokens: u32,

    /// Ask the provider to constrain output to a JSON object where the
    /// API supports it. Stages that expect JSON always set this.
    pub json_mode: bool,
}

impl CompletionRequest {
    /// A single-turn request: system instruction plus one user prompt.
    pub fn chat(
        model: impl Into<String>,
        system: impl Into<String>,
        user: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            messages: vec![
                ChatMessage {
                    role: Role::System,
                    content: system.into(),
                },
                ChatMessage {
                    role: Role::User,
                    content: user.into(),
                },
            ],
            temperature: 0.7,
            max_tokens: 2048,
            json_mode: true,
        }
    }
}

/// A single message in a chat conversation.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// The role of a chat message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A normalized completion response.
#[derive(Debug)]
pub struct CompletionResponse {
    /// The generated text content.
    pub text: String,

    /// Provider-specific metadata (token counts, model info).
    /// Stored as raw JSON since each provider returns different fields.
    pub metadata: Option<serde_json::Value>,
}

/// Abstraction over LLM providers.
///
/// Implementors map their transport and API failures into
/// [`GenError`](crate::GenError) variants so the retry orchestrator can
/// branch on cause: 429 becomes `RateLimit` (with any `Retry-After` hint),
/// 5xx becomes `Network`, policy refusals become `ContentFilter`.
///
/// Object-safe; the engine holds an `Arc<dyn Provider>`.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Execute one completion call. No retry here: the orchestrator owns
    /// retry, backoff, and fallback policy.
    async fn complete(
        &self,
        client: &Client,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse>;

    /// Human-readable name for event reporting.
    fn name(&self) -> &'static str;
}

/// Parse a `Retry-After` header value as integer seconds.
pub(crate) fn parse_retry_after(value: &str) -> Option<std::time::Duration> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .map(std::time::Duration::from_secs)
}
