//! Prompt construction for each pipeline stage.
//!
//! Pure functions: parameters in, `(system, user)` instruction pair out.
//! Keeping these free of I/O makes the exact text sent to a provider
//! testable without a live call.

use serde_json::Value;

use crate::params::GenerationParams;
use crate::spec::SlideLayout;

/// Schema description shared by every JSON-producing stage.
const SCHEMA_GUIDE: &str = r#"A slide is a JSON object with these fields:
- "title" (required): short string.
- "layout" (required): one of "title-bullets", "title-paragraph", "two-column", "chart", "timeline", "comparison-table", "quote", "process-steps", "image-focus", "title-only".
- "bullets": array of strings (required for "title-bullets").
- "paragraph": string (required for "title-paragraph" and "quote").
- "left" / "right": objects with optional "heading", "bullets", "paragraph" (both required for "two-column").
- "contentItems": array of {"type": string, "content": string}.
- "chart": {"chartType": "bar"|"line"|"pie"|"area", "categories": [string], "series": [{"name": string, "data": [number]}]} (required for "chart"; every series data array must match categories length; pie charts take exactly one series).
- "timeline": array of {"label": string, "detail": string} (required for "timeline").
- "comparisonTable": {"columns": [string], "rows": [[string]]} (required for "comparison-table"; every row must match columns width).
- "processSteps": array of {"title": string, "detail": string} (required for "process-steps").
- "imagePrompt": string (required for "image-focus").
- "notes": string of presenter notes.
- "sources": array of strings.
- "design": {"accentColor": hex, "secondaryColor": hex, "font": string}.
Do not emit any other fields. Respond with a single JSON object and nothing else."#;

/// Wrap text in a labeled section for structured prompts.
fn section(label: &str, content: &str) -> String {
    format!("## {}\n{}", label, content)
}

/// Create a numbered list from items (1-indexed).
fn numbered_list(items: &[String]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{}. {}", i + 1, item))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render the caller's constraints as a prompt section, or `None` when the
/// request carries no constraints at all.
fn constraints_section(params: &GenerationParams) -> Option<String> {
    let mut lines = Vec::new();
    if let Some(audience) = params.audience {
        lines.push(format!("Audience: {}", audience.label()));
    }
    if let Some(tone) = params.tone {
        lines.push(format!("Tone: {}", tone.label()));
    }
    if let Some(length) = params.content_length {
        lines.push(format!("Content length: {}", length.label()));
    }
    if let Some(language) = &params.language {
        lines.push(format!("Write all slide text in language: {}", language));
    }
    if let Some(brand) = &params.brand {
        if let Some(c) = &brand.primary_color {
            lines.push(format!("Brand primary color: {}", c));
        }
        if let Some(c) = &brand.secondary_color {
            lines.push(format!("Brand secondary color: {}", c));
        }
        if let Some(f) = &brand.font {
            lines.push(format!("Brand font: {}", f));
        }
    }
    if lines.is_empty() {
        None
    } else {
        Some(section("Constraints", &lines.join("\n")))
    }
}

/// Stage 1: draft slide content from the free-text request.
pub(crate) fn content_generation(params: &GenerationParams) -> (String, String) {
    let system = format!(
        "You are a presentation content writer. Turn the user's request into \
         one slide.\n\n{}",
        SCHEMA_GUIDE
    );
    let mut user = section("Request", &params.prompt);
    if let Some(constraints) = constraints_section(params) {
        user.push_str("\n\n");
        user.push_str(&constraints);
    }
    (system, user)
}

/// Stage 2: pick the best-fitting layout and restructure the draft.
pub(crate) fn layout_refinement(params: &GenerationParams, draft: &Value) -> (String, String) {
    let layouts: Vec<String> = SlideLayout::ALL
        .iter()
        .map(|tag| format!("\"{}\"", tag))
        .collect();
    let system = format!(
        "You are a presentation layout specialist. Given a draft slide, choose \
         the layout that fits its content best and restructure the content to \
         match. Available layouts:\n{}\n\n{}",
        numbered_list(&layouts),
        SCHEMA_GUIDE
    );
    let mut user = section("Draft slide", &draft.to_string());
    user.push_str("\n\n");
    user.push_str(&section("Original request", &params.prompt));
    if let Some(constraints) = constraints_section(params) {
        user.push_str("\n\n");
        user.push_str(&constraints);
    }
    user.push_str(
        "\n\nReturn the full slide JSON with the chosen layout and its required \
         content field populated.",
    );
    (system, user)
}

/// Stage 3: add an image prompt to the slide.
pub(crate) fn image_prompt(params: &GenerationParams, spec: &Value) -> (String, String) {
    let system = format!(
        "You are an art director writing prompts for an image generation model. \
         Given a slide, write one concrete visual description suitable for a \
         professional presentation. Avoid text and logos in the image.\n\n{}",
        SCHEMA_GUIDE
    );
    let mut user = section("Slide", &spec.to_string());
    if let Some(brand) = &params.brand {
        if let Some(c) = &brand.primary_color {
            user.push_str("\n\n");
            user.push_str(&section(
                "Palette",
                &format!("Favor imagery that harmonizes with {}", c),
            ));
        }
    }
    user.push_str(
        "\n\nReturn the full slide JSON unchanged except for a populated \
         \"imagePrompt\" field.",
    );
    (system, user)
}

/// Stage 4: final polish pass over the assembled slide.
pub(crate) fn final_refinement(params: &GenerationParams, spec: &Value) -> (String, String) {
    let system = format!(
        "You are a presentation editor. Polish the slide: tighten wording, \
         remove redundancy, keep terminology consistent, and preserve the \
         layout and structure.\n\n{}",
        SCHEMA_GUIDE
    );
    let mut user = section("Slide", &spec.to_string());
    if let Some(constraints) = constraints_section(params) {
        user.push_str("\n\n");
        user.push_str(&constraints);
    }
    user.push_str("\n\nReturn the full polished slide JSON.");
    (system, user)
}

/// Batch mode: one call producing an image prompt per slide.
///
/// The response contract is a JSON object with an `"imagePrompts"` array
/// whose length matches the input order exactly.
pub(crate) fn batch_image_prompts(specs: &[Value]) -> (String, String) {
    let system = format!(
        "You are an art director writing prompts for an image generation model. \
         For each slide below, write one concrete visual description suitable \
         for a professional presentation. Avoid text and logos.\n\n\
         Respond with a single JSON object: {{\"imagePrompts\": [string]}} with \
         exactly {} entries, one per slide, in the same order. No other fields.",
        specs.len()
    );
    let slides: Vec<String> = specs.iter().map(Value::to_string).collect();
    let user = section("Slides", &numbered_list(&slides));
    (system, user)
}
