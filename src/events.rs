//! Lifecycle events for observing the generation pipeline.
//!
//! The engine emits events as stages start, retry, degrade, and finish.
//! Callers implement [`EventHandler`] to route them into their logging or
//! metrics sink; the engine itself writes nothing anywhere. Entirely
//! optional — the pipeline works without a handler.

use std::sync::Arc;

use crate::stage::PipelineStage;

/// Events emitted during generation.
#[derive(Debug, Clone)]
pub enum Event {
    /// A pipeline stage has started for one slide.
    StageStart {
        stage: PipelineStage,
        /// Slide index within a batch; 0 for single-slide runs.
        slide: usize,
    },
    /// A model attempt is being made.
    Attempt {
        stage: PipelineStage,
        /// 1-indexed attempt number within the stage.
        attempt: u32,
        model: String,
        provider: &'static str,
    },
    /// A retry is scheduled after a transient failure.
    Retry {
        stage: PipelineStage,
        attempt: u32,
        delay_ms: u64,
        reason: String,
    },
    /// Primary-model attempts exhausted; trying the fallback model.
    FallbackModel {
        stage: PipelineStage,
        model: String,
    },
    /// All model attempts exhausted; the stage's offline degrade path ran.
    Degraded {
        stage: PipelineStage,
        reason: String,
    },
    /// Recovery dropped fields that could not be salvaged.
    FieldsDropped {
        stage: PipelineStage,
        fields: Vec<String>,
    },
    /// A pipeline stage finished.
    StageEnd {
        stage: PipelineStage,
        slide: usize,
        ok: bool,
    },
    /// The batched image-prompt call was rejected and per-slide calls ran.
    BatchImageFallback { reason: String },
    /// An analysis request was served from the TTL cache.
    CacheHit { key: u64 },
    /// An analysis request joined an identical in-flight request.
    CacheCoalesced { key: u64 },
}

/// Handler for engine lifecycle events.
pub trait EventHandler: Send + Sync {
    fn on_event(&self, event: Event);
}

/// Emit an event if a handler is present. No-op otherwise.
pub(crate) fn emit(handler: &Option<Arc<dyn EventHandler>>, event: Event) {
    if let Some(h) = handler {
        h.on_event(event);
    }
}

/// An [`EventHandler`] backed by a closure.
///
/// # Example
///
/// ```
/// use slidegen::events::{Event, FnEventHandler};
/// use std::sync::Arc;
///
/// let handler = Arc::new(FnEventHandler(|event: Event| {
///     if let Event::Retry { stage, delay_ms, .. } = event {
///         eprintln!("retrying {} after {}ms", stage, delay_ms);
///     }
/// }));
/// ```
pub struct FnEventHandler<F: Fn(Event) + Send + Sync>(pub F);

impl<F: Fn(Event) + Send + Sync> EventHandler for FnEventHandler<F> {
    fn on_event(&self, event: Event) {
        (self.0)(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn fn_handler_receives_events() {
        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let seen2 = seen.clone();
        let handler: Option<Arc<dyn EventHandler>> =
            Some(Arc::new(FnEventHandler(move |event: Event| {
                seen2.lock().unwrap().push(format!("{:?}", event));
            })));

        emit(
            &handler,
            Event::StageStart {
                stage: PipelineStage::ContentGeneration,
                slide: 0,
            },
        );
        emit(&handler, Event::CacheHit { key: 42 });

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].contains("ContentGeneration"));
    }

    #[test]
    fn emit_without_handler_is_noop() {
        emit(&None, Event::CacheHit { key: 1 });
    }
}
