//! The generation engine: public entry points for single-slide, batch, and
//! analysis requests.
//!
//! A [`GenerationEngine`] owns one HTTP client, one provider, and the
//! configured policy. Single-slide generation walks the stage sequence from
//! [`PipelineStage::sequence`]; batch generation runs per-slide chains under
//! a semaphore and folds every requested image prompt into one batched call.

use std::sync::Arc;

use futures::future::join_all;
use futures::FutureExt;
use reqwest::Client;
use serde_json::Value;
use tokio::sync::Semaphore;

use crate::analysis::{self, ContentAnalysis};
use crate::budget::apply_budget;
use crate::cache::{cache_key, CoalescingCache};
use crate::config::EngineConfig;
use crate::error::{GenError, Result};
use crate::events::{emit, Event, EventHandler};
use crate::fallback::{fallback_image_prompt, fallback_slide};
use crate::orchestrator::{interpret_slide, StageRunner};
use crate::params::{CallOverrides, ContentLength, GenerationParams};
use crate::prompts;
use crate::provider::Provider;
use crate::spec::{DesignHints, SlideSpec};
use crate::stage::PipelineStage;
use crate::validate::normalize_hex;

/// Chained slide-spec generation over one provider.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use slidegen::{EngineConfig, GenerationEngine, GenerationParams};
/// use slidegen::provider::OpenAiProvider;
///
/// # async fn run() -> slidegen::Result<()> {
/// let provider = Arc::new(OpenAiProvider::new("https://api.openai.com").with_api_key("sk-..."));
/// let engine = GenerationEngine::new(EngineConfig::standard(), provider)?;
/// let spec = engine
///     .generate_slide_spec(&GenerationParams::new("Q3 revenue recap").with_image(true))
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct GenerationEngine {
    config: EngineConfig,
    client: Client,
    provider: Arc<dyn Provider>,
    events: Option<Arc<dyn EventHandler>>,
    analysis_cache: CoalescingCache<ContentAnalysis>,
}

impl GenerationEngine {
    /// Build an engine. Fails when the configuration is invalid.
    pub fn new(config: EngineConfig, provider: Arc<dyn Provider>) -> Result<Self> {
        config.validate()?;
        let analysis_cache = CoalescingCache::new(config.analysis_cache_ttl);
        Ok(Self {
            config,
            client: Client::new(),
            provider,
            events: None,
            analysis_cache,
        })
    }

    /// Attach an observer for lifecycle events.
    pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.events = Some(handler);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn runner(&self) -> StageRunner<'_> {
        StageRunner {
            config: &self.config,
            provider: &self.provider,
            client: &self.client,
            events: &self.events,
        }
    }

    /// Generate one validated slide from a free-text request.
    pub async fn generate_slide_spec(&self, params: &GenerationParams) -> Result<SlideSpec> {
        let mut spec = self.run_base_stages(0, params).await?;
        if params.include_image {
            self.run_image_stage(0, params, &mut spec).await?;
        }
        spec = self.run_final_stage(0, params, spec).await?;
        self.finish(&mut spec, params);
        Ok(spec)
    }

    /// Generate a batch of slides with bounded concurrency.
    ///
    /// Results preserve request order and failures stay per-slide. Image
    /// prompts for the whole batch are produced by a single model call; if
    /// that call fails or returns the wrong number of prompts, each affected
    /// slide falls back to its own image-prompt stage.
    pub async fn generate_batch_slide_specs(
        &self,
        requests: &[GenerationParams],
    ) -> Vec<Result<SlideSpec>> {
        let semaphore = Arc::new(Semaphore::new(self.config.batch_concurrency));

        // phase 1: content + layout per slide
        let base_futures = requests.iter().enumerate().map(|(idx, params)| {
            let semaphore = semaphore.clone();
            async move {
                let _permit = acquire(&semaphore).await?;
                self.run_base_stages(idx, params).await
            }
        });
        let mut results: Vec<Result<SlideSpec>> = join_all(base_futures).await;

        // phase 2: one batched image-prompt call for every slide that wants one
        let image_slides: Vec<usize> = results
            .iter()
            .enumerate()
            .filter(|(idx, r)| r.is_ok() && requests[*idx].include_image)
            .map(|(idx, _)| idx)
            .collect();
        if !image_slides.is_empty() {
            self.run_batch_images(requests, &mut results, &image_slides, &semaphore)
                .await;
        }

        // phase 3: final refinement per slide
        let final_futures = results
            .into_iter()
            .enumerate()
            .map(|(idx, result)| {
                let semaphore = semaphore.clone();
                async move {
                    let spec = result?;
                    let _permit = acquire(&semaphore).await?;
                    let mut spec = self.run_final_stage(idx, &requests[idx], spec).await?;
                    self.finish(&mut spec, &requests[idx]);
                    Ok(spec)
                }
            });
        join_all(final_futures).await
    }

    /// Analyze a request without generating a slide. Cached with a TTL and
    /// coalesced across identical concurrent calls.
    pub async fn analyze_prompt(&self, prompt: &str) -> Result<ContentAnalysis> {
        let key = cache_key(&("analysis", prompt));
        let config = self.config.clone();
        let provider = self.provider.clone();
        let client = self.client.clone();
        let events = self.events.clone();
        let (system, user) = analysis::instruction(prompt);

        self.analysis_cache
            .get_or_compute(key, &self.events, move || {
                async move {
                    let runner = StageRunner {
                        config: &config,
                        provider: &provider,
                        client: &client,
                        events: &events,
                    };
                    runner
                        .run(
                            PipelineStage::ContentGeneration,
                            None,
                            &CallOverrides::default(),
                            &system,
                            &user,
                            analysis::interpret,
                        )
                        .await
                }
                .boxed()
            })
            .await
            .map_err(|shared| {
                // waiters of a coalesced call share one error; only the sole
                // owner can take it back intact
                Arc::try_unwrap(shared).unwrap_or_else(|arc| GenError::Network {
                    status: None,
                    detail: arc.to_string(),
                })
            })
    }

    /// Stages 1 and 2: draft the content, then refine the layout. Both
    /// degrade rather than fail: content falls back to a topic template,
    /// layout keeps the draft.
    async fn run_base_stages(&self, idx: usize, params: &GenerationParams) -> Result<SlideSpec> {
        if params.is_cancelled() {
            return Err(GenError::Cancelled);
        }
        let runner = self.runner();
        let cancel = params.cancellation.as_ref();

        // stage 1: content
        let stage = PipelineStage::ContentGeneration;
        emit(&self.events, Event::StageStart { stage, slide: idx });
        let (system, user) = prompts::content_generation(params);
        let mut spec = match runner
            .run(stage, cancel, &params.overrides, &system, &user, interpret_slide)
            .await
        {
            Ok(spec) => spec,
            Err(GenError::Cancelled) => return Err(GenError::Cancelled),
            Err(err) => {
                emit(
                    &self.events,
                    Event::Degraded {
                        stage,
                        reason: err.to_string(),
                    },
                );
                fallback_slide(params)
            }
        };
        emit(
            &self.events,
            Event::StageEnd {
                stage,
                slide: idx,
                ok: true,
            },
        );

        // stage 2: layout
        let stage = PipelineStage::LayoutRefinement;
        emit(&self.events, Event::StageStart { stage, slide: idx });
        let draft = serde_json::to_value(&spec)?;
        let (system, user) = prompts::layout_refinement(params, &draft);
        match runner
            .run(stage, cancel, &params.overrides, &system, &user, interpret_slide)
            .await
        {
            Ok(refined) => spec = refined,
            Err(GenError::Cancelled) => return Err(GenError::Cancelled),
            Err(err) => {
                // the draft layout is already valid; keep it
                emit(
                    &self.events,
                    Event::Degraded {
                        stage,
                        reason: err.to_string(),
                    },
                );
            }
        }
        emit(
            &self.events,
            Event::StageEnd {
                stage,
                slide: idx,
                ok: true,
            },
        );

        Ok(spec)
    }

    /// Stage 3 for one slide. Degrades to a sniffed image prompt.
    async fn run_image_stage(
        &self,
        idx: usize,
        params: &GenerationParams,
        spec: &mut SlideSpec,
    ) -> Result<()> {
        let stage = PipelineStage::ImagePromptGeneration;
        emit(&self.events, Event::StageStart { stage, slide: idx });
        let runner = self.runner();
        let value = serde_json::to_value(&*spec)?;
        let (system, user) = prompts::image_prompt(params, &value);
        match runner
            .run(
                stage,
                params.cancellation.as_ref(),
                &params.overrides,
                &system,
                &user,
                interpret_slide,
            )
            .await
        {
            Ok(refined) if refined.image_prompt.is_some() => *spec = refined,
            Ok(_) => {
                // the model returned a slide without the one field this
                // stage exists to add
                emit(
                    &self.events,
                    Event::Degraded {
                        stage,
                        reason: "response omitted imagePrompt".into(),
                    },
                );
                spec.image_prompt = Some(fallback_image_prompt(spec, params.brand.as_ref()));
            }
            Err(GenError::Cancelled) => return Err(GenError::Cancelled),
            Err(err) => {
                emit(
                    &self.events,
                    Event::Degraded {
                        stage,
                        reason: err.to_string(),
                    },
                );
                spec.image_prompt = Some(fallback_image_prompt(spec, params.brand.as_ref()));
            }
        }
        emit(
            &self.events,
            Event::StageEnd {
                stage,
                slide: idx,
                ok: true,
            },
        );
        Ok(())
    }

    /// Stage 4. No degrade path: a slide that cannot be polished within the
    /// attempt budget is a failed slide.
    async fn run_final_stage(
        &self,
        idx: usize,
        params: &GenerationParams,
        spec: SlideSpec,
    ) -> Result<SlideSpec> {
        let stage = PipelineStage::FinalRefinement;
        emit(&self.events, Event::StageStart { stage, slide: idx });
        let runner = self.runner();
        let value = serde_json::to_value(&spec)?;
        let (system, user) = prompts::final_refinement(params, &value);
        let outcome = runner
            .run(
                stage,
                params.cancellation.as_ref(),
                &params.overrides,
                &system,
                &user,
                interpret_slide,
            )
            .await;
        emit(
            &self.events,
            Event::StageEnd {
                stage,
                slide: idx,
                ok: outcome.is_ok(),
            },
        );
        outcome
    }

    /// Batched image prompts: one call for the whole batch, falling back to
    /// per-slide image stages when the batch response is unusable.
    async fn run_batch_images(
        &self,
        requests: &[GenerationParams],
        results: &mut [Result<SlideSpec>],
        image_slides: &[usize],
        semaphore: &Arc<Semaphore>,
    ) {
        // one spec per index, kept in lockstep so prompt i always lands on
        // indices[i]; a slide whose spec cannot be serialized fails alone
        let mut indices: Vec<usize> = Vec::with_capacity(image_slides.len());
        let mut specs: Vec<Value> = Vec::with_capacity(image_slides.len());
        for &idx in image_slides {
            let Ok(spec) = &results[idx] else { continue };
            match serde_json::to_value(spec) {
                Ok(value) => {
                    indices.push(idx);
                    specs.push(value);
                }
                Err(err) => results[idx] = Err(err.into()),
            }
        }
        let expected = specs.len();
        if expected == 0 {
            return;
        }
        let (system, user) = prompts::batch_image_prompts(&specs);

        let interpret = move |value: Value| -> Result<(Vec<String>, Vec<String>)> {
            let prompts = value
                .get("imagePrompts")
                .and_then(Value::as_array)
                .ok_or_else(|| GenError::Validation {
                    errors: vec!["imagePrompts: required array of strings".into()],
                })?;
            if prompts.len() != expected {
                return Err(GenError::Validation {
                    errors: vec![format!(
                        "imagePrompts: expected {} entries, got {}",
                        expected,
                        prompts.len()
                    )],
                });
            }
            let mut out = Vec::with_capacity(expected);
            for (i, p) in prompts.iter().enumerate() {
                match p.as_str() {
                    Some(s) => out.push(s.to_string()),
                    None => {
                        return Err(GenError::Validation {
                            errors: vec![format!("imagePrompts[{i}]: must be a string")],
                        })
                    }
                }
            }
            Ok((out, Vec::new()))
        };

        let batch_outcome = self
            .runner()
            .run(
                PipelineStage::ImagePromptGeneration,
                None,
                &CallOverrides::default(),
                &system,
                &user,
                interpret,
            )
            .await;

        match batch_outcome {
            Ok(prompts) => {
                for (&idx, prompt) in indices.iter().zip(prompts) {
                    if let Ok(spec) = &mut results[idx] {
                        spec.image_prompt = Some(prompt);
                    }
                }
            }
            Err(err) => {
                emit(
                    &self.events,
                    Event::BatchImageFallback {
                        reason: err.to_string(),
                    },
                );
                // per-slide fallback mutates `results`, so it runs
                // sequentially; the degrade path is already the slow road
                let _permit = acquire(semaphore).await;
                for &idx in &indices {
                    let params = &requests[idx];
                    let outcome = match &mut results[idx] {
                        Ok(spec) => self.run_image_stage(idx, params, spec).await,
                        Err(_) => continue,
                    };
                    if let Err(e) = outcome {
                        results[idx] = Err(e);
                    }
                }
            }
        }
    }

    /// Budget enforcement plus brand merge, after the last stage.
    fn finish(&self, spec: &mut SlideSpec, params: &GenerationParams) {
        apply_budget(
            spec,
            params.content_length.unwrap_or(ContentLength::Medium),
        );
        if let Some(brand) = &params.brand {
            merge_brand(spec, brand);
        }
    }
}

/// Fold brand hints into the design block without overriding what the model
/// chose. Invalid brand colors are ignored.
fn merge_brand(spec: &mut SlideSpec, brand: &crate::params::BrandHints) {
    let accent = brand.primary_color.as_deref().and_then(normalize_hex);
    let secondary = brand.secondary_color.as_deref().and_then(normalize_hex);
    if accent.is_none() && secondary.is_none() && brand.font.is_none() {
        return;
    }
    let design = spec.design.get_or_insert_with(|| DesignHints {
        accent_color: None,
        secondary_color: None,
        font: None,
    });
    if design.accent_color.is_none() {
        design.accent_color = accent;
    }
    if design.secondary_color.is_none() {
        design.secondary_color = secondary;
    }
    if design.font.is_none() {
        design.font = brand.font.clone();
    }
}

async fn acquire(semaphore: &Arc<Semaphore>) -> Result<tokio::sync::SemaphorePermit<'_>> {
    // the semaphore is never closed, but avoid panicking on the impossible
    semaphore
        .acquire()
        .await
        .map_err(|_| GenError::Cancelled)
}
