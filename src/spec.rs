//! The SlideSpec data model — the generation target.
//!
//! A [`SlideSpec`] is a title, one layout tag, and a set of optional,
//! layout-dependent content fields. Exactly the fields relevant to the
//! declared layout should be populated; the validator
//! ([`crate::validate::safe_validate_slide_spec`]) enforces field shapes and
//! rejects unknown keys, so `deny_unknown_fields` is mirrored here for
//! direct deserialization too.

use serde::{Deserialize, Serialize};

/// Closed enumeration of slide layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SlideLayout {
    TitleBullets,
    TitleParagraph,
    TwoColumn,
    Chart,
    Timeline,
    ComparisonTable,
    Quote,
    ProcessSteps,
    ImageFocus,
    TitleOnly,
}

impl SlideLayout {
    /// All layout tags as they appear on the wire.
    pub const ALL: [&'static str; 10] = [
        "title-bullets",
        "title-paragraph",
        "two-column",
        "chart",
        "timeline",
        "comparison-table",
        "quote",
        "process-steps",
        "image-focus",
        "title-only",
    ];

    /// Wire tag for this layout.
    pub fn tag(&self) -> &'static str {
        match self {
            SlideLayout::TitleBullets => "title-bullets",
            SlideLayout::TitleParagraph => "title-paragraph",
            SlideLayout::TwoColumn => "two-column",
            SlideLayout::Chart => "chart",
            SlideLayout::Timeline => "timeline",
            SlideLayout::ComparisonTable => "comparison-table",
            SlideLayout::Quote => "quote",
            SlideLayout::ProcessSteps => "process-steps",
            SlideLayout::ImageFocus => "image-focus",
            SlideLayout::TitleOnly => "title-only",
        }
    }

    /// Parse a wire tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "title-bullets" => Some(SlideLayout::TitleBullets),
            "title-paragraph" => Some(SlideLayout::TitleParagraph),
            "two-column" => Some(SlideLayout::TwoColumn),
            "chart" => Some(SlideLayout::Chart),
            "timeline" => Some(SlideLayout::Timeline),
            "comparison-table" => Some(SlideLayout::ComparisonTable),
            "quote" => Some(SlideLayout::Quote),
            "process-steps" => Some(SlideLayout::ProcessSteps),
            "image-focus" => Some(SlideLayout::ImageFocus),
            "title-only" => Some(SlideLayout::TitleOnly),
            _ => None,
        }
    }
}

/// The validated, structured description of one slide.
///
/// Built up progressively across the pipeline stages; immutable once
/// returned to the caller. Optional fields skip serialization when absent so
/// a round-tripped spec re-validates cleanly under the no-unknown-keys rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SlideSpec {
    pub title: String,
    pub layout: SlideLayout,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bullets: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub paragraph: Option<String>,

    /// Left side of a two-column layout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left: Option<SideContent>,

    /// Right side of a two-column layout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub right: Option<SideContent>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_items: Option<Vec<ContentItem>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<ChartSpec>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeline: Option<Vec<TimelineEvent>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison_table: Option<ComparisonTable>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_steps: Option<Vec<ProcessStep>>,

    /// Text-to-image prompt for the slide visual.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_prompt: Option<String>,

    /// Speaker notes. Degraded/fallback output discloses its provenance here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    /// Source citations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub design: Option<DesignHints>,
}

impl SlideSpec {
    /// A minimal spec with just a title and layout.
    pub fn new(title: impl Into<String>, layout: SlideLayout) -> Self {
        Self {
            title: title.into(),
            layout,
            bullets: None,
            paragraph: None,
            left: None,
            right: None,
            content_items: None,
            chart: None,
            timeline: None,
            comparison_table: None,
            process_steps: None,
            image_prompt: None,
            notes: None,
            sources: None,
            design: None,
        }
    }

    /// Append a line to the speaker notes, creating them if absent.
    pub fn push_note(&mut self, line: &str) {
        match &mut self.notes {
            Some(notes) => {
                notes.push('\n');
                notes.push_str(line);
            }
            None => self.notes = Some(line.to_string()),
        }
    }

    /// All body text of the slide joined together, for theme sniffing.
    pub fn body_text(&self) -> String {
        let mut parts: Vec<String> = vec![self.title.clone()];
        if let Some(bullets) = &self.bullets {
            parts.extend(bullets.iter().cloned());
        }
        if let Some(p) = &self.paragraph {
            parts.push(p.clone());
        }
        for side in [&self.left, &self.right].into_iter().flatten() {
            if let Some(h) = &side.heading {
                parts.push(h.clone());
            }
            if let Some(b) = &side.bullets {
                parts.extend(b.iter().cloned());
            }
            if let Some(p) = &side.paragraph {
                parts.push(p.clone());
            }
        }
        parts.join(" ")
    }
}

/// One side of a two-column layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SideContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bullets: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paragraph: Option<String>,
}

/// A typed content item (`{type, content}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContentItem {
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
}

/// Chart kind. Pie charts must carry exactly one series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Line,
    Pie,
    Area,
}

/// A chart: categories on one axis, one or more data series.
///
/// Invariant: every `series[i].data.len()` equals `categories.len()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ChartSpec {
    pub chart_type: ChartKind,
    pub categories: Vec<String>,
    pub series: Vec<ChartSeries>,
}

/// One named data series of a chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChartSeries {
    pub name: String,
    pub data: Vec<f64>,
}

/// One entry on a timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimelineEvent {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// A comparison table. Invariant: every row is exactly `columns.len()` wide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComparisonTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// One step in a process flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProcessStep {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Optional design hints. Colors are normalized 6-digit hex (`#RRGGBB`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DesignHints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accent_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn layout_tag_round_trip() {
        for tag in SlideLayout::ALL {
            let layout = SlideLayout::from_tag(tag).expect(tag);
            assert_eq!(layout.tag(), tag);
        }
        assert!(SlideLayout::from_tag("freeform").is_none());
    }

    #[test]
    fn serializes_camel_case_and_skips_none() {
        let spec = SlideSpec::new("Q3 Results", SlideLayout::TitleBullets);
        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(value["title"], "Q3 Results");
        assert_eq!(value["layout"], "title-bullets");
        assert!(value.get("bullets").is_none());
        assert!(value.get("imagePrompt").is_none());
    }

    #[test]
    fn deserializes_rejects_unknown_keys() {
        let value = json!({
            "title": "t",
            "layout": "title-only",
            "surprise": true,
        });
        assert!(serde_json::from_value::<SlideSpec>(value).is_err());
    }

    #[test]
    fn content_item_uses_type_on_wire() {
        let item = ContentItem {
            kind: "stat".into(),
            content: "42%".into(),
        };
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["type"], "stat");
    }

    #[test]
    fn push_note_appends() {
        let mut spec = SlideSpec::new("t", SlideLayout::TitleOnly);
        spec.push_note("first");
        spec.push_note("second");
        assert_eq!(spec.notes.as_deref(), Some("first\nsecond"));
    }

    #[test]
    fn body_text_includes_sides() {
        let mut spec = SlideSpec::new("Team", SlideLayout::TwoColumn);
        spec.left = Some(SideContent {
            heading: Some("Before".into()),
            bullets: Some(vec!["slow".into()]),
            paragraph: None,
        });
        spec.right = Some(SideContent {
            heading: Some("After".into()),
            bullets: None,
            paragraph: Some("fast".into()),
        });
        let text = spec.body_text();
        assert!(text.contains("Before"));
        assert!(text.contains("slow"));
        assert!(text.contains("fast"));
    }
}
