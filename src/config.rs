//! Engine configuration — a single object injected at construction.
//!
//! Mirrors what the deployment environment knows: model identifiers,
//! retry/backoff policy, per-call timeout, token budget, sampling
//! temperature, and batch concurrency. Not reloaded mid-process.

use std::time::Duration;

use crate::error::{GenError, Result};

/// Configuration for the generation engine.
///
/// # Example
///
/// ```
/// use slidegen::config::EngineConfig;
///
/// let config = EngineConfig::standard()
///     .with_models("gpt-4o", "gpt-4o-mini")
///     .with_max_retries(3);
/// ```
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Primary model identifier.
    pub primary_model: String,

    /// Same-provider fallback model, tried once after the primary model's
    /// retries are exhausted.
    pub fallback_model: String,

    /// Maximum attempts against the primary model per stage.
    pub max_retries: u32,

    /// Base delay before the first retry. Grows as
    /// `base * 2^(attempt-1)` plus jitter.
    pub retry_delay: Duration,

    /// Cap applied to the computed backoff delay.
    pub max_backoff_delay: Duration,

    /// Deadline for a single model call.
    pub call_timeout: Duration,

    /// Token budget per model call.
    pub max_tokens: u32,

    /// Sampling temperature.
    pub temperature: f64,

    /// Bounded-concurrency limit for batch mode.
    pub batch_concurrency: usize,

    /// TTL for the content-analysis response cache.
    pub analysis_cache_ttl: Duration,
}

impl EngineConfig {
    /// Sensible defaults for hosted chat-completion APIs.
    pub fn standard() -> Self {
        Self {
            primary_model: "gpt-4o".into(),
            fallback_model: "gpt-4o-mini".into(),
            max_retries: 3,
            retry_delay: Duration::from_millis(500),
            max_backoff_delay: Duration::from_secs(10),
            call_timeout: Duration::from_secs(30),
            max_tokens: 2048,
            temperature: 0.7,
            batch_concurrency: 4,
            analysis_cache_ttl: Duration::from_secs(300),
        }
    }

    /// Tight limits for interactive use where a user is waiting.
    pub fn interactive() -> Self {
        Self {
            max_retries: 2,
            retry_delay: Duration::from_millis(250),
            max_backoff_delay: Duration::from_secs(4),
            call_timeout: Duration::from_secs(15),
            ..Self::standard()
        }
    }

    pub fn with_models(
        mut self,
        primary: impl Into<String>,
        fallback: impl Into<String>,
    ) -> Self {
        self.primary_model = primary.into();
        self.fallback_model = fallback.into();
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_max_backoff_delay(mut self, cap: Duration) -> Self {
        self.max_backoff_delay = cap;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_batch_concurrency(mut self, limit: usize) -> Self {
        self.batch_concurrency = limit;
        self
    }

    pub fn with_analysis_cache_ttl(mut self, ttl: Duration) -> Self {
        self.analysis_cache_ttl = ttl;
        self
    }

    /// Validate invariants the engine relies on.
    pub fn validate(&self) -> Result<()> {
        if self.primary_model.is_empty() {
            return Err(GenError::InvalidConfig(
                "primary_model must not be empty".into(),
            ));
        }
        if self.max_retries == 0 {
            return Err(GenError::InvalidConfig(
                "max_retries must be at least 1".into(),
            ));
        }
        if self.batch_concurrency == 0 {
            return Err(GenError::InvalidConfig(
                "batch_concurrency must be at least 1".into(),
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(GenError::InvalidConfig(format!(
                "temperature {} outside 0.0-2.0",
                self.temperature
            )));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_preset_is_valid() {
        assert!(EngineConfig::standard().validate().is_ok());
    }

    #[test]
    fn interactive_preset_tightens_limits() {
        let c = EngineConfig::interactive();
        assert_eq!(c.max_retries, 2);
        assert!(c.call_timeout < EngineConfig::standard().call_timeout);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn empty_primary_model_rejected() {
        let c = EngineConfig::standard().with_models("", "fallback");
        assert!(matches!(c.validate(), Err(GenError::InvalidConfig(_))));
    }

    #[test]
    fn zero_retries_rejected() {
        let c = EngineConfig::standard().with_max_retries(0);
        assert!(c.validate().is_err());
    }

    #[test]
    fn zero_concurrency_rejected() {
        let c = EngineConfig::standard().with_batch_concurrency(0);
        assert!(c.validate().is_err());
    }

    #[test]
    fn out_of_range_temperature_rejected() {
        let c = EngineConfig::standard().with_temperature(3.5);
        assert!(c.validate().is_err());
    }
}
