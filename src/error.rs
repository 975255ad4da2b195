use std::time::Duration;
use thiserror::Error;

use crate::stage::PipelineStage;

/// Errors produced by the generation engine and its components.
///
/// The taxonomy is closed so callers (and the retry orchestrator) can branch
/// on cause instead of matching error strings. Providers are responsible for
/// mapping their transport/API failures into these variants — see
/// [`Provider`](crate::provider::Provider).
#[derive(Error, Debug)]
pub enum GenError {
    /// Provider output did not match the SlideSpec shape even after recovery.
    /// Never retried within an attempt loop; escalated immediately.
    #[error("schema validation failed: {}", errors.join("; "))]
    Validation {
        /// One message per offending field.
        errors: Vec<String>,
    },

    /// A call exceeded its deadline (or was aborted mid-flight).
    #[error("model call timed out")]
    Timeout,

    /// Provider signaled quota or rate exhaustion.
    #[error("rate limited by provider")]
    RateLimit {
        /// Parsed `Retry-After` hint, if the provider sent one.
        retry_after: Option<Duration>,
    },

    /// Provider refused the request on content-policy grounds.
    #[error("provider content filter triggered: {detail}")]
    ContentFilter {
        /// Provider-supplied detail about what was filtered.
        detail: String,
    },

    /// Transport failure or non-rate-limit HTTP error from the provider.
    #[error("network failure{}: {detail}", status.map(|s| format!(" ({s})")).unwrap_or_default())]
    Network {
        /// HTTP status code, when one was received.
        status: Option<u16>,
        detail: String,
    },

    /// Terminal wrapper once all retries and fallbacks for a step are exhausted.
    #[error("generation failed at stage '{}' after {attempts} attempt(s): {source}", stage.name())]
    Generation {
        stage: PipelineStage,
        attempts: u32,
        #[source]
        source: Box<GenError>,
    },

    /// The caller's cancellation token fired before an attempt started.
    #[error("generation was cancelled")]
    Cancelled,

    /// Invalid configuration detected at construction time.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Low-level HTTP client failure (connection refused, DNS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// JSON handling failed at the serde level.
    #[error("JSON handling failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl GenError {
    /// Whether the retry orchestrator may retry this failure.
    ///
    /// Validation and content-filter failures are deterministic for a given
    /// prompt, so re-issuing the identical request is unproductive. Likewise
    /// a non-429 4xx: the request itself is malformed.
    pub fn is_transient(&self) -> bool {
        match self {
            GenError::Timeout | GenError::RateLimit { .. } | GenError::Request(_) => true,
            GenError::Network { status, .. } => {
                status.is_none_or(|s| s >= 500 || s == 408)
            }
            _ => false,
        }
    }

    /// The `Retry-After` hint, if this error carries one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            GenError::RateLimit { retry_after } => *retry_after,
            _ => None,
        }
    }
}

impl From<anyhow::Error> for GenError {
    fn from(err: anyhow::Error) -> Self {
        GenError::Network {
            status: None,
            detail: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classes() {
        assert!(GenError::Timeout.is_transient());
        assert!(GenError::RateLimit { retry_after: None }.is_transient());
        assert!(GenError::Network {
            status: Some(503),
            detail: "unavailable".into()
        }
        .is_transient());
    }

    #[test]
    fn non_transient_classes() {
        assert!(!GenError::Validation {
            errors: vec!["title: required".into()]
        }
        .is_transient());
        assert!(!GenError::ContentFilter {
            detail: "policy".into()
        }
        .is_transient());
        assert!(!GenError::Cancelled.is_transient());
        assert!(!GenError::InvalidConfig("bad".into()).is_transient());
        assert!(!GenError::Network {
            status: Some(400),
            detail: "bad request".into()
        }
        .is_transient());
    }

    #[test]
    fn retry_after_hint_surfaced() {
        let err = GenError::RateLimit {
            retry_after: Some(Duration::from_secs(30)),
        };
        assert_eq!(err.retry_after(), Some(Duration::from_secs(30)));
        assert_eq!(GenError::Timeout.retry_after(), None);
    }

    #[test]
    fn generation_error_carries_context() {
        let err = GenError::Generation {
            stage: PipelineStage::FinalRefinement,
            attempts: 4,
            source: Box::new(GenError::Timeout),
        };
        let msg = err.to_string();
        assert!(msg.contains("final-refinement"));
        assert!(msg.contains("4 attempt"));
    }
}
