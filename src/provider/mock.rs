//! Mock provider for testing without a live LLM.
//!
//! [`MockProvider`] plays back a script of responses in order, including
//! scripted failures, so retry/fallback behavior can be tested
//! deterministically.
//!
//! # Example
//!
//! ```
//! use slidegen::provider::{MockProvider, ScriptedResponse};
//!
//! let mock = MockProvider::new(vec![
//!     ScriptedResponse::Text(r#"{"title":"Hi","layout":"title-only"}"#.into()),
//! ]);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::{CompletionRequest, CompletionResponse, Provider};
use crate::error::{GenError, Result};

/// One entry in a mock script.
#[derive(Debug, Clone)]
pub enum ScriptedResponse {
    /// Return this text with a successful status.
    Text(String),
    /// Fail with a timeout.
    Timeout,
    /// Fail with a rate limit, optionally carrying a retry hint.
    RateLimit(Option<Duration>),
    /// Fail with a content-policy refusal.
    ContentFilter,
    /// Fail with an HTTP-level error.
    Http(u16),
}

/// A test provider that plays back scripted responses in order.
///
/// Cycles back to the beginning when the script is exhausted. The call
/// counter lets tests assert exactly how many attempts were made.
#[derive(Debug)]
pub struct MockProvider {
    script: Vec<ScriptedResponse>,
    index: AtomicUsize,
}

impl MockProvider {
    /// Create a mock provider with the given script.
    pub fn new(script: Vec<ScriptedResponse>) -> Self {
        assert!(!script.is_empty(), "MockProvider requires at least one entry");
        Self {
            script,
            index: AtomicUsize::new(0),
        }
    }

    /// A mock that always returns the same text.
    pub fn fixed(response: impl Into<String>) -> Self {
        Self::new(vec![ScriptedResponse::Text(response.into())])
    }

    /// A mock that returns each text in order.
    pub fn texts(responses: Vec<String>) -> Self {
        Self::new(responses.into_iter().map(ScriptedResponse::Text).collect())
    }

    /// Number of calls made so far.
    pub fn calls(&self) -> usize {
        self.index.load(Ordering::Relaxed)
    }

    fn next_entry(&self) -> ScriptedResponse {
        let idx = self.index.fetch_add(1, Ordering::Relaxed) % self.script.len();
        self.script[idx].clone()
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(
        &self,
        _client: &Client,
        _request: &CompletionRequest,
    ) -> Result<CompletionResponse> {
        match self.next_entry() {
            ScriptedResponse::Text(text) => Ok(CompletionResponse {
                text,
                metadata: None,
            }),
            ScriptedResponse::Timeout => Err(GenError::Timeout),
            ScriptedResponse::RateLimit(retry_after) => Err(GenError::RateLimit { retry_after }),
            ScriptedResponse::ContentFilter => Err(GenError::ContentFilter {
                detail: "scripted refusal".into(),
            }),
            ScriptedResponse::Http(status) => Err(GenError::Network {
                status: Some(status),
                detail: "scripted failure".into(),
            }),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CompletionRequest {
        CompletionRequest::chat("test", "sys", "user")
    }

    #[tokio::test]
    async fn fixed_response_repeats() {
        let mock = MockProvider::fixed("hello");
        let client = Client::new();
        for _ in 0..3 {
            let resp = mock.complete(&client, &request()).await.unwrap();
            assert_eq!(resp.text, "hello");
        }
        assert_eq!(mock.calls(), 3);
    }

    #[tokio::test]
    async fn script_plays_in_order_then_cycles() {
        let mock = MockProvider::new(vec![
            ScriptedResponse::Http(503),
            ScriptedResponse::Text("ok".into()),
        ]);
        let client = Client::new();

        let err = mock.complete(&client, &request()).await.unwrap_err();
        assert!(matches!(err, GenError::Network { status: Some(503), .. }));

        let resp = mock.complete(&client, &request()).await.unwrap();
        assert_eq!(resp.text, "ok");

        // cycles back to the scripted failure
        assert!(mock.complete(&client, &request()).await.is_err());
    }

    #[tokio::test]
    async fn scripted_rate_limit_carries_hint() {
        let mock = MockProvider::new(vec![ScriptedResponse::RateLimit(Some(
            Duration::from_secs(7),
        ))]);
        let client = Client::new();
        let err = mock.complete(&client, &request()).await.unwrap_err();
        assert_eq!(err.retry_after(), Some(Duration::from_secs(7)));
    }
}
