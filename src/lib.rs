//! # slidegen
//!
//! Chained slide-spec generation: turn a free-text request into a validated
//! [`SlideSpec`] through a staged LLM pipeline.
//!
//! The pipeline is a fixed sequence — content generation, layout refinement,
//! optional image-prompt generation, final refinement — where each stage's
//! output is schema-validated (and repaired when close) before it feeds the
//! next. Around the chain sit the pieces production use needs: per-stage
//! retry with exponential backoff and a fallback model, offline degrade
//! paths, cooperative cancellation, a bounded-concurrency batch mode that
//! folds image prompts into one call, and a TTL cache with request
//! coalescing for prompt analysis.
//!
//! ## Core Concepts
//!
//! - **[`GenerationEngine`]** — the entry point: single-slide, batch, and
//!   analysis requests against one [`Provider`](provider::Provider).
//! - **[`SlideSpec`]** — the validated generation target: a title, a layout
//!   tag, and layout-dependent content fields.
//! - **[`safe_validate_slide_spec`]** — strict, pure validation of any
//!   candidate value; [`sanitize_spec`] repairs near misses first.
//! - **[`EventHandler`](events::EventHandler)** — optional observer for
//!   attempts, retries, degrades, and cache activity.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use slidegen::{EngineConfig, GenerationEngine, GenerationParams};
//! use slidegen::params::{Audience, ContentLength};
//! use slidegen::provider::OllamaProvider;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = GenerationEngine::new(
//!         EngineConfig::standard().with_models("llama3.2:3b", "llama3.2:1b"),
//!         Arc::new(OllamaProvider::local()),
//!     )?;
//!
//!     let spec = engine
//!         .generate_slide_spec(
//!             &GenerationParams::new("Q3 revenue grew 12%, driven by the EU launch")
//!                 .with_audience(Audience::Executive)
//!                 .with_content_length(ContentLength::Short)
//!                 .with_image(true),
//!         )
//!         .await?;
//!     println!("{}", serde_json::to_string_pretty(&spec)?);
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod budget;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod params;
pub mod provider;
pub mod recovery;
pub mod spec;
pub mod stage;
pub mod validate;

mod cache;
mod executor;
mod fallback;
mod orchestrator;
mod prompts;

pub use analysis::ContentAnalysis;
pub use budget::ContentBudget;
pub use config::EngineConfig;
pub use engine::GenerationEngine;
pub use error::{GenError, Result};
pub use events::{Event, EventHandler, FnEventHandler};
pub use params::{Audience, BrandHints, CallOverrides, ContentLength, GenerationParams, Tone};
pub use recovery::{extract_json_object, sanitize_spec};
pub use spec::{ChartKind, ChartSpec, SlideLayout, SlideSpec};
pub use stage::PipelineStage;
pub use validate::{safe_validate_slide_spec, Validation};
