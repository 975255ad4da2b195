//! Canned fallback content for degraded stages.
//!
//! When a stage exhausts its retries and its fallback model, the pipeline
//! degrades instead of failing outright (except the final refinement, which
//! simply keeps the unpolished slide). The canned content is keyed off
//! keywords in the request so the placeholder at least matches the topic,
//! and the speaker notes disclose that it is a template.

use crate::params::{BrandHints, GenerationParams};
use crate::spec::{SlideLayout, SlideSpec};

/// Disclosure line appended to the notes of every template slide.
const TEMPLATE_NOTE: &str =
    "This slide was generated from a built-in template after content generation failed; review before presenting.";

/// Rough topic classes recognized in a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Theme {
    Financial,
    Team,
    Data,
    Strategy,
    Problem,
    Generic,
}

fn classify(text: &str) -> Theme {
    let lower = text.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));

    if has(&["revenue", "growth", "sales", "profit", "quarter"]) {
        Theme::Financial
    } else if has(&["team", "people", "hiring", "culture", "org"]) {
        Theme::Team
    } else if has(&["data", "analytics", "metric", "measurement", "insight"]) {
        Theme::Data
    } else if has(&["strategy", "plan", "roadmap", "vision", "goal"]) {
        Theme::Strategy
    } else if has(&["problem", "challenge", "risk", "issue", "obstacle"]) {
        Theme::Problem
    } else {
        Theme::Generic
    }
}

/// Derive a slide title from the request text.
fn title_from_prompt(prompt: &str) -> String {
    let words: Vec<&str> = prompt.split_whitespace().take(8).collect();
    if words.is_empty() {
        "Overview".to_string()
    } else {
        words.join(" ")
    }
}

/// Build a complete template slide for a request whose content stage failed.
pub(crate) fn fallback_slide(params: &GenerationParams) -> SlideSpec {
    let theme = classify(&params.prompt);
    let title = title_from_prompt(&params.prompt);

    let mut spec = match theme {
        Theme::Financial => {
            let mut s = SlideSpec::new(title, SlideLayout::TitleBullets);
            s.bullets = Some(vec![
                "Key figure or trend for the period".into(),
                "What drove the change".into(),
                "Outlook for the next period".into(),
            ]);
            s
        }
        Theme::Team => {
            let mut s = SlideSpec::new(title, SlideLayout::TitleBullets);
            s.bullets = Some(vec![
                "Who is involved and their roles".into(),
                "Recent wins worth celebrating".into(),
                "Where help is needed".into(),
            ]);
            s
        }
        Theme::Data => {
            let mut s = SlideSpec::new(title, SlideLayout::TitleParagraph);
            s.paragraph = Some(
                "Summarize the most important finding from the data here, then \
                 explain what it means for the audience and what decision it \
                 should inform."
                    .into(),
            );
            s
        }
        Theme::Strategy => {
            let mut s = SlideSpec::new(title, SlideLayout::TitleBullets);
            s.bullets = Some(vec![
                "Where we are today".into(),
                "Where we want to be".into(),
                "The steps that get us there".into(),
            ]);
            s
        }
        Theme::Problem => {
            let mut s = SlideSpec::new(title, SlideLayout::TitleBullets);
            s.bullets = Some(vec![
                "The problem in one sentence".into(),
                "Why it matters now".into(),
                "Proposed next step".into(),
            ]);
            s
        }
        Theme::Generic => {
            let mut s = SlideSpec::new(title, SlideLayout::TitleBullets);
            s.bullets = Some(vec![
                "Main point".into(),
                "Supporting detail".into(),
                "Call to action".into(),
            ]);
            s
        }
    };

    spec.push_note(TEMPLATE_NOTE);
    spec
}

/// Build an image prompt from the slide's own text when the image stage
/// failed. Sniffs the body text for a visual theme and folds in the brand
/// accent color when one is available.
pub(crate) fn fallback_image_prompt(spec: &SlideSpec, brand: Option<&BrandHints>) -> String {
    let body = spec.body_text().to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| body.contains(w));

    let scene = if has(&["team", "people", "collaboration", "culture"]) {
        "a diverse professional team collaborating around a table in a bright modern office"
    } else if has(&["data", "metric", "analytics", "chart", "dashboard"]) {
        "abstract flowing data visualization with soft glowing nodes and connecting lines"
    } else if has(&["growth", "revenue", "increase", "scale"]) {
        "an upward sweeping arc of light over a minimalist city skyline at dawn"
    } else if has(&["technology", "software", "platform", "ai", "cloud"]) {
        "sleek abstract circuitry and light trails on a deep gradient background"
    } else if has(&["strategy", "roadmap", "plan", "vision"]) {
        "a winding illuminated path leading toward a horizon, seen from above"
    } else {
        "a clean abstract geometric composition with soft depth of field"
    };

    let palette = brand
        .and_then(|b| b.primary_color.as_deref())
        .map(|c| format!(", color palette anchored on {}", c))
        .unwrap_or_default();

    format!(
        "Professional presentation visual: {}{}. No text, no logos, photorealistic lighting.",
        scene, palette
    )
}
