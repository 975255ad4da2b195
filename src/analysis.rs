//! Prompt analysis: a lightweight structured read of a request before (or
//! instead of) full slide generation.
//!
//! Analysis answers are deterministic for a given prompt on short timescales
//! and are often requested repeatedly while a user iterates, so the engine
//! caches them behind [`crate::cache::CoalescingCache`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{GenError, Result};
use crate::spec::{ChartKind, SlideLayout};

/// Structured analysis of a free-text slide request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentAnalysis {
    /// One-line restatement of the topic.
    pub topic: String,

    /// The layout the content most naturally fits.
    pub suggested_layout: SlideLayout,

    /// The points a slide on this topic should cover.
    #[serde(default)]
    pub key_points: Vec<String>,

    /// Whether the request implies quantitative content.
    #[serde(default)]
    pub has_numeric_data: bool,

    /// Chart kind to suggest when `has_numeric_data` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_chart: Option<ChartKind>,
}

/// Build the analysis instruction pair.
pub(crate) fn instruction(prompt: &str) -> (String, String) {
    let layouts: Vec<String> = SlideLayout::ALL
        .iter()
        .map(|tag| format!("\"{}\"", tag))
        .collect();
    let system = format!(
        "You analyze requests for presentation slides. Respond with a single \
         JSON object and nothing else:\n\
         {{\"topic\": string, \"suggestedLayout\": one of [{}], \
         \"keyPoints\": [string], \"hasNumericData\": boolean, \
         \"suggestedChart\": \"bar\"|\"line\"|\"pie\"|\"area\" or null}}",
        layouts.join(", ")
    );
    let user = format!("## Request\n{}", prompt);
    (system, user)
}

/// Interpret an analysis payload. Tolerates a missing `suggestedChart` and
/// empty `keyPoints`; anything structurally wrong is a validation failure.
pub(crate) fn interpret(candidate: Value) -> Result<(ContentAnalysis, Vec<String>)> {
    serde_json::from_value::<ContentAnalysis>(candidate)
        .map(|analysis| (analysis, Vec::new()))
        .map_err(|e| GenError::Validation {
            errors: vec![format!("analysis: {e}")],
        })
}
