//! Per-stage retry, backoff, and model-fallback policy.
//!
//! One [`StageRunner::run`] call owns the full attempt budget for a stage:
//! up to `max_retries` attempts against the primary model with exponential
//! backoff on transient failures, then a single attempt against the fallback
//! model. A content-filter refusal or hard HTTP rejection skips the remaining
//! primary attempts and goes straight to the fallback model. A validation
//! failure escalates immediately without any further attempt: the output was
//! shaped wrong even after recovery, and re-requesting the same payload
//! consumes budget without changing the fault.
//!
//! Offline degrade paths (template slides, sniffed image prompts) are the
//! engine's decision, not this module's: the runner reports terminal failure
//! via [`GenError::Generation`] and the engine picks the degrade route.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::config::EngineConfig;
use crate::error::{GenError, Result};
use crate::events::{emit, Event, EventHandler};
use crate::executor::{execute_call, parse_payload};
use crate::params::CallOverrides;
use crate::provider::{CompletionRequest, Provider};
use crate::recovery::{minimal_spec, sanitize_spec};
use crate::spec::SlideSpec;
use crate::stage::PipelineStage;
use crate::validate::{safe_validate_slide_spec, Validation};

/// Runs stages against a provider under the engine's policy.
pub(crate) struct StageRunner<'a> {
    pub config: &'a EngineConfig,
    pub provider: &'a Arc<dyn Provider>,
    pub client: &'a Client,
    pub events: &'a Option<Arc<dyn EventHandler>>,
}

impl StageRunner<'_> {
    /// Run one stage to completion under the retry/fallback policy.
    ///
    /// `interpret` turns a parsed JSON payload into the stage's typed result
    /// plus the names of any fields recovery had to drop; a [`GenError::Validation`]
    /// from it escalates immediately without burning retries.
    pub async fn run<T>(
        &self,
        stage: PipelineStage,
        cancel: Option<&Arc<AtomicBool>>,
        overrides: &CallOverrides,
        system: &str,
        user: &str,
        interpret: impl Fn(Value) -> Result<(T, Vec<String>)>,
    ) -> Result<T> {
        let mut attempts = 0u32;
        let mut last_err: Option<GenError> = None;

        for attempt in 1..=self.config.max_retries {
            if is_cancelled(cancel) {
                return Err(GenError::Cancelled);
            }
            attempts += 1;
            match self
                .attempt(stage, attempt, &self.config.primary_model, cancel, overrides, system, user, &interpret)
                .await
            {
                Ok(result) => return Ok(result),
                Err(GenError::Cancelled) => return Err(GenError::Cancelled),
                Err(err) => {
                    if matches!(err, GenError::Validation { .. }) {
                        return Err(GenError::Generation {
                            stage,
                            attempts,
                            source: Box::new(err),
                        });
                    }
                    if !err.is_transient() {
                        last_err = Some(err);
                        break;
                    }
                    if attempt < self.config.max_retries {
                        let delay = compute_backoff(self.config, attempt, &err);
                        emit(
                            self.events,
                            Event::Retry {
                                stage,
                                attempt,
                                delay_ms: delay.as_millis() as u64,
                                reason: err.to_string(),
                            },
                        );
                        tokio::time::sleep(delay).await;
                    }
                    last_err = Some(err);
                }
            }
        }

        if !self.config.fallback_model.is_empty()
            && self.config.fallback_model != self.config.primary_model
        {
            if is_cancelled(cancel) {
                return Err(GenError::Cancelled);
            }
            emit(
                self.events,
                Event::FallbackModel {
                    stage,
                    model: self.config.fallback_model.clone(),
                },
            );
            attempts += 1;
            match self
                .attempt(
                    stage,
                    attempts,
                    &self.config.fallback_model,
                    cancel,
                    overrides,
                    system,
                    user,
                    &interpret,
                )
                .await
            {
                Ok(result) => return Ok(result),
                Err(GenError::Cancelled) => return Err(GenError::Cancelled),
                Err(err) => last_err = Some(err),
            }
        }

        let source = last_err.unwrap_or_else(|| GenError::Network {
            status: None,
            detail: "no attempts were made".into(),
        });
        Err(GenError::Generation {
            stage,
            attempts,
            source: Box::new(source),
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn attempt<T>(
        &self,
        stage: PipelineStage,
        attempt: u32,
        model: &str,
        cancel: Option<&Arc<AtomicBool>>,
        overrides: &CallOverrides,
        system: &str,
        user: &str,
        interpret: &impl Fn(Value) -> Result<(T, Vec<String>)>,
    ) -> Result<T> {
        emit(
            self.events,
            Event::Attempt {
                stage,
                attempt,
                model: model.to_string(),
                provider: self.provider.name(),
            },
        );

        let mut request = CompletionRequest::chat(model, system, user);
        request.temperature = overrides.temperature.unwrap_or(self.config.temperature) as f32;
        request.max_tokens = overrides.max_tokens.unwrap_or(self.config.max_tokens);
        let timeout = overrides.timeout.unwrap_or(self.config.call_timeout);

        let response = execute_call(self.provider, self.client, &request, timeout, cancel).await?;
        let candidate = parse_payload(&response.text)?;
        let (result, dropped) = interpret(candidate)?;
        if !dropped.is_empty() {
            emit(
                self.events,
                Event::FieldsDropped {
                    stage,
                    fields: dropped,
                },
            );
        }
        Ok(result)
    }
}

/// Interpret a payload as a slide: sanitize, validate, and if strict
/// validation fails, fall back to the reduced spec with dropped fields
/// reported. Shared by every slide-producing stage.
pub(crate) fn interpret_slide(candidate: Value) -> Result<(SlideSpec, Vec<String>)> {
    let sanitized = sanitize_spec(candidate);
    match safe_validate_slide_spec(&sanitized) {
        Validation::Valid(spec) => Ok((spec, Vec::new())),
        Validation::Invalid { errors } => {
            let (reduced, dropped) = minimal_spec(&sanitized);
            match safe_validate_slide_spec(&reduced) {
                Validation::Valid(spec) if !dropped.is_empty() => Ok((spec, dropped)),
                _ => Err(GenError::Validation { errors }),
            }
        }
    }
}

fn is_cancelled(cancel: Option<&Arc<AtomicBool>>) -> bool {
    cancel.is_some_and(|flag| flag.load(std::sync::atomic::Ordering::Relaxed))
}

/// Backoff before retry `attempt` (1-indexed): exponential growth from the
/// base delay with up to 10% jitter, clamped to the configured cap. A
/// provider `Retry-After` hint wins when it asks for a longer wait.
pub(crate) fn compute_backoff(
    config: &EngineConfig,
    attempt: u32,
    error: &GenError,
) -> Duration {
    let shift = (attempt.saturating_sub(1)).min(16);
    let base = config.retry_delay.saturating_mul(1u32 << shift);

    let jitter_cap = (config.retry_delay.as_millis() as u64) / 10;
    let jitter = if jitter_cap > 0 {
        Duration::from_millis(fastrand::u64(0..=jitter_cap))
    } else {
        Duration::ZERO
    };

    let delay = std::cmp::min(base + jitter, config.max_backoff_delay);
    match error.retry_after() {
        Some(hint) if hint > delay => hint,
        _ => delay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::FnEventHandler;
    use crate::provider::{MockProvider, ScriptedResponse};
    use std::sync::atomic::Ordering;
    use std::sync::Mutex;

    fn fast_config() -> EngineConfig {
        EngineConfig::standard()
            .with_models("primary", "fallback")
            .with_retry_delay(Duration::from_millis(1))
            .with_max_backoff_delay(Duration::from_millis(5))
    }

    fn valid_slide_json() -> String {
        r#"{"title":"Q3","layout":"title-bullets","bullets":["a","b"]}"#.to_string()
    }

    async fn run_slide(
        config: &EngineConfig,
        mock: &Arc<MockProvider>,
        cancel: Option<&Arc<AtomicBool>>,
        events: &Option<Arc<dyn EventHandler>>,
    ) -> Result<SlideSpec> {
        let provider: Arc<dyn Provider> = mock.clone();
        let client = Client::new();
        let runner = StageRunner {
            config,
            provider: &provider,
            client: &client,
            events,
        };
        runner
            .run(
                PipelineStage::ContentGeneration,
                cancel,
                &CallOverrides::default(),
                "sys",
                "user",
                interpret_slide,
            )
            .await
    }

    #[tokio::test]
    async fn transient_failure_retried_then_succeeds() {
        let mock = Arc::new(MockProvider::new(vec![
            ScriptedResponse::Http(503),
            ScriptedResponse::Text(valid_slide_json()),
        ]));
        let spec = run_slide(&fast_config(), &mock, None, &None).await.unwrap();
        assert_eq!(spec.title, "Q3");
        assert_eq!(mock.calls(), 2);
    }

    #[tokio::test]
    async fn validation_failure_escalates_without_further_attempts() {
        // no JSON at all; with 3 primary retries allowed and a fallback model
        // configured, the single failed attempt must still be the only call
        let mock = Arc::new(MockProvider::fixed("I cannot produce structured output."));
        let config = fast_config().with_max_retries(3);
        let err = run_slide(&config, &mock, None, &None).await.unwrap_err();
        match err {
            GenError::Generation {
                attempts, source, ..
            } => {
                assert_eq!(attempts, 1);
                assert!(matches!(*source, GenError::Validation { .. }));
            }
            other => panic!("expected Generation, got {other:?}"),
        }
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn exhaustion_reports_total_attempts() {
        let mock = Arc::new(MockProvider::new(vec![ScriptedResponse::Http(500)]));
        let config = fast_config().with_max_retries(2);
        let err = run_slide(&config, &mock, None, &None).await.unwrap_err();
        match err {
            GenError::Generation {
                stage, attempts, ..
            } => {
                assert_eq!(stage, PipelineStage::ContentGeneration);
                // 2 primary + 1 fallback
                assert_eq!(attempts, 3);
            }
            other => panic!("expected Generation, got {other:?}"),
        }
        assert_eq!(mock.calls(), 3);
    }

    #[tokio::test]
    async fn pre_attempt_cancellation_short_circuits() {
        let mock = Arc::new(MockProvider::fixed(valid_slide_json()));
        let flag = Arc::new(AtomicBool::new(true));
        let err = run_slide(&fast_config(), &mock, Some(&flag), &None)
            .await
            .unwrap_err();
        assert!(matches!(err, GenError::Cancelled));
        assert_eq!(mock.calls(), 0);
        flag.store(true, Ordering::Relaxed);
    }

    #[tokio::test]
    async fn unsalvageable_field_dropped_and_reported() {
        // chart data length disagrees with categories, so strict validation
        // fails and the reduced spec drops the chart
        let broken = r#"{
            "title": "Trend",
            "layout": "chart",
            "chart": {
                "chartType": "bar",
                "categories": ["Q1", "Q2", "Q3"],
                "series": [{"name": "rev", "data": [1.0]}]
            },
            "notes": "kept"
        }"#;
        let mock = Arc::new(MockProvider::fixed(broken));

        let dropped: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = dropped.clone();
        let events: Option<Arc<dyn EventHandler>> =
            Some(Arc::new(FnEventHandler(move |event: Event| {
                if let Event::FieldsDropped { fields, .. } = event {
                    sink.lock().unwrap().extend(fields);
                }
            })));

        let spec = run_slide(&fast_config(), &mock, None, &events)
            .await
            .unwrap();
        assert_eq!(spec.notes.as_deref(), Some("kept"));
        assert!(spec.chart.is_none());
        assert_eq!(*dropped.lock().unwrap(), vec!["chart".to_string()]);
    }

    #[test]
    fn backoff_grows_and_respects_cap() {
        let config = EngineConfig::standard()
            .with_retry_delay(Duration::from_millis(500))
            .with_max_backoff_delay(Duration::from_secs(2));
        let err = GenError::Timeout;

        let first = compute_backoff(&config, 1, &err);
        assert!(first >= Duration::from_millis(500));
        assert!(first <= Duration::from_millis(550));

        let second = compute_backoff(&config, 2, &err);
        assert!(second >= Duration::from_millis(1000));

        // attempt 4 would be 4s; clamped to the 2s cap
        let fourth = compute_backoff(&config, 4, &err);
        assert_eq!(fourth, Duration::from_secs(2));
    }

    #[test]
    fn longer_retry_after_hint_wins() {
        let config = EngineConfig::standard()
            .with_retry_delay(Duration::from_millis(100))
            .with_max_backoff_delay(Duration::from_secs(1));
        let err = GenError::RateLimit {
            retry_after: Some(Duration::from_secs(30)),
        };
        assert_eq!(compute_backoff(&config, 1, &err), Duration::from_secs(30));

        let short_hint = GenError::RateLimit {
            retry_after: Some(Duration::from_millis(1)),
        };
        assert!(compute_backoff(&config, 1, &short_hint) >= Duration::from_millis(100));
    }
}
