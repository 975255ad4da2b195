//! Single-call execution: deadline enforcement, cancellation, payload parse.
//!
//! One provider call in, one parsed JSON candidate out. Retry and fallback
//! policy live in [`crate::orchestrator`]; this module only bounds a single
//! attempt.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::error::{GenError, Result};
use crate::provider::{CompletionRequest, CompletionResponse, Provider};
use crate::recovery::parse_json_lenient;

/// How often the in-flight cancellation watcher polls the flag.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Execute one provider call bounded by `call_timeout`.
///
/// If the caller's cancellation flag fires while the call is in flight, the
/// call is abandoned and surfaces as [`GenError::Timeout`]: from this
/// attempt's perspective an abandoned call and an expired one are the same
/// outcome, and the orchestrator's pre-attempt flag check stops the ladder
/// before another attempt starts.
pub(crate) async fn execute_call(
    provider: &Arc<dyn Provider>,
    client: &Client,
    request: &CompletionRequest,
    call_timeout: Duration,
    cancel: Option<&Arc<AtomicBool>>,
) -> Result<CompletionResponse> {
    let call = tokio::time::timeout(call_timeout, provider.complete(client, request));
    match cancel {
        Some(flag) => {
            tokio::select! {
                outcome = call => match outcome {
                    Ok(result) => result,
                    Err(_) => Err(GenError::Timeout),
                },
                _ = watch_flag(flag) => Err(GenError::Timeout),
            }
        }
        None => match call.await {
            Ok(result) => result,
            Err(_) => Err(GenError::Timeout),
        },
    }
}

async fn watch_flag(flag: &AtomicBool) {
    loop {
        if flag.load(Ordering::Relaxed) {
            return;
        }
        tokio::time::sleep(CANCEL_POLL_INTERVAL).await;
    }
}

/// Parse a model response into a JSON candidate.
///
/// Tries strict parsing first, then the lenient recovery path (code fences,
/// think tags, first balanced object). A response with no recoverable JSON
/// is a validation failure, not a transport one, so it escalates instead of
/// burning retries on an identical prompt.
pub(crate) fn parse_payload(text: &str) -> Result<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Ok(value);
    }
    parse_json_lenient(text).ok_or_else(|| GenError::Validation {
        errors: vec!["response contained no parseable JSON object".into()],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{MockProvider, ScriptedResponse};
    use async_trait::async_trait;

    /// A provider that never returns within test timescales.
    #[derive(Debug)]
    struct StallingProvider;

    #[async_trait]
    impl Provider for StallingProvider {
        async fn complete(
            &self,
            _client: &Client,
            _request: &CompletionRequest,
        ) -> Result<CompletionResponse> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            unreachable!()
        }

        fn name(&self) -> &'static str {
            "stalling"
        }
    }

    fn request() -> CompletionRequest {
        CompletionRequest::chat("test", "sys", "user")
    }

    #[tokio::test]
    async fn successful_call_passes_through() {
        let provider: Arc<dyn Provider> = Arc::new(MockProvider::fixed("{\"a\":1}"));
        let client = Client::new();
        let resp = execute_call(
            &provider,
            &client,
            &request(),
            Duration::from_secs(5),
            None,
        )
        .await
        .unwrap();
        assert_eq!(resp.text, "{\"a\":1}");
    }

    #[tokio::test]
    async fn deadline_expiry_is_timeout() {
        let provider: Arc<dyn Provider> = Arc::new(StallingProvider);
        let client = Client::new();
        let err = execute_call(
            &provider,
            &client,
            &request(),
            Duration::from_millis(20),
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, GenError::Timeout));
    }

    #[tokio::test]
    async fn mid_flight_cancellation_is_timeout() {
        let provider: Arc<dyn Provider> = Arc::new(StallingProvider);
        let client = Client::new();
        let flag = Arc::new(AtomicBool::new(false));

        let watcher_flag = flag.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            watcher_flag.store(true, Ordering::Relaxed);
        });

        let err = execute_call(
            &provider,
            &client,
            &request(),
            Duration::from_secs(3600),
            Some(&flag),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, GenError::Timeout));
    }

    #[tokio::test]
    async fn provider_error_passes_through() {
        let provider: Arc<dyn Provider> =
            Arc::new(MockProvider::new(vec![ScriptedResponse::Http(500)]));
        let client = Client::new();
        let err = execute_call(
            &provider,
            &client,
            &request(),
            Duration::from_secs(5),
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, GenError::Network { status: Some(500), .. }));
    }

    #[test]
    fn parse_payload_strict_then_lenient() {
        assert_eq!(parse_payload("{\"a\":1}").unwrap()["a"], 1);

        let wrapped = "Sure! ```json\n{\"title\":\"x\"}\n``` done";
        assert_eq!(parse_payload(wrapped).unwrap()["title"], "x");

        let err = parse_payload("no json here").unwrap_err();
        assert!(matches!(err, GenError::Validation { .. }));
    }
}
