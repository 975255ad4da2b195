//! Generation request parameters — the caller's input contract.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Target audience for the slide content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    General,
    Executive,
    Technical,
    Academic,
    Sales,
}

impl Audience {
    /// Lowercase label as it appears in prompts and serialized params.
    pub fn label(self) -> &'static str {
        match self {
            Audience::General => "general",
            Audience::Executive => "executive",
            Audience::Technical => "technical",
            Audience::Academic => "academic",
            Audience::Sales => "sales",
        }
    }
}

/// Tone of voice for the slide content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Professional,
    Casual,
    Persuasive,
    Inspirational,
}

impl Tone {
    pub fn label(self) -> &'static str {
        match self {
            Tone::Professional => "professional",
            Tone::Casual => "casual",
            Tone::Persuasive => "persuasive",
            Tone::Inspirational => "inspirational",
        }
    }
}

/// Target content length, keyed to the budgeting presets in
/// [`crate::budget`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentLength {
    Short,
    Medium,
    Long,
}

impl ContentLength {
    pub fn label(self) -> &'static str {
        match self {
            ContentLength::Short => "short",
            ContentLength::Medium => "medium",
            ContentLength::Long => "long",
        }
    }
}

/// Brand hints forwarded into prompts and design metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandHints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
}

/// Per-call overrides, merged over the engine config defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CallOverrides {
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub timeout: Option<Duration>,
}

/// Input contract for one generation request. Owned by the caller and
/// read-only to the engine.
#[derive(Clone, Default)]
pub struct GenerationParams {
    /// Free-text prompt describing the slide.
    pub prompt: String,
    pub audience: Option<Audience>,
    pub tone: Option<Tone>,
    pub content_length: Option<ContentLength>,
    /// Whether an image prompt should be generated for the slide.
    pub include_image: bool,
    pub brand: Option<BrandHints>,
    /// BCP-47-ish language tag, e.g. `"en"`, `"ja"`.
    pub language: Option<String>,
    pub overrides: CallOverrides,
    /// Cooperative cancellation token; checked before every attempt and
    /// raced against in-flight calls.
    pub cancellation: Option<Arc<AtomicBool>>,
}

impl GenerationParams {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_audience(mut self, audience: Audience) -> Self {
        self.audience = Some(audience);
        self
    }

    pub fn with_tone(mut self, tone: Tone) -> Self {
        self.tone = Some(tone);
        self
    }

    pub fn with_content_length(mut self, length: ContentLength) -> Self {
        self.content_length = Some(length);
        self
    }

    pub fn with_image(mut self, include: bool) -> Self {
        self.include_image = include;
        self
    }

    pub fn with_brand(mut self, brand: BrandHints) -> Self {
        self.brand = Some(brand);
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_overrides(mut self, overrides: CallOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_cancellation(mut self, token: Arc<AtomicBool>) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Whether the caller has requested cancellation.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|c| c.load(Ordering::Relaxed))
    }
}

impl std::fmt::Debug for GenerationParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationParams")
            .field("prompt_len", &self.prompt.len())
            .field("audience", &self.audience)
            .field("tone", &self.tone)
            .field("content_length", &self.content_length)
            .field("include_image", &self.include_image)
            .field("language", &self.language)
            .field("has_cancellation", &self.cancellation.is_some())
            .finish()
    }
}
