//! Strict schema validation for candidate SlideSpec values.
//!
//! The validator is a pure function: no I/O, no mutation of the input. It is
//! deliberately strict — unknown keys anywhere are errors, not warnings — so
//! malformed provider output routes through [`crate::recovery`] instead of
//! silently passing through.

use serde_json::Value;

use crate::spec::{SlideLayout, SlideSpec};

/// Outcome of validating a candidate value.
#[derive(Debug, Clone)]
pub enum Validation {
    /// The candidate is a well-formed SlideSpec (colors normalized).
    Valid(SlideSpec),
    /// One message per offending field.
    Invalid { errors: Vec<String> },
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid(_))
    }

    pub fn into_result(self) -> Result<SlideSpec, Vec<String>> {
        match self {
            Validation::Valid(spec) => Ok(spec),
            Validation::Invalid { errors } => Err(errors),
        }
    }

    pub fn errors(&self) -> &[String] {
        match self {
            Validation::Valid(_) => &[],
            Validation::Invalid { errors } => errors,
        }
    }
}

/// Top-level keys a SlideSpec may carry, in wire casing.
pub(crate) const ALLOWED_KEYS: [&str; 15] = [
    "title",
    "layout",
    "bullets",
    "paragraph",
    "left",
    "right",
    "contentItems",
    "chart",
    "timeline",
    "comparisonTable",
    "processSteps",
    "imagePrompt",
    "notes",
    "sources",
    "design",
];

/// The content field a layout cannot do without, if any.
pub(crate) fn required_field(layout: SlideLayout) -> Option<&'static str> {
    match layout {
        SlideLayout::TitleBullets => Some("bullets"),
        SlideLayout::TitleParagraph | SlideLayout::Quote => Some("paragraph"),
        SlideLayout::TwoColumn => Some("left"),
        SlideLayout::Chart => Some("chart"),
        SlideLayout::Timeline => Some("timeline"),
        SlideLayout::ComparisonTable => Some("comparisonTable"),
        SlideLayout::ProcessSteps => Some("processSteps"),
        SlideLayout::ImageFocus => Some("imagePrompt"),
        SlideLayout::TitleOnly => None,
    }
}

/// Validate an arbitrary value against the SlideSpec shape.
///
/// Returns [`Validation::Valid`] with the typed spec (hex colors normalized
/// to 6 digits) or [`Validation::Invalid`] with one error per offending
/// field. Exposed standalone so API/rendering layers can re-validate specs
/// supplied directly by clients.
pub fn safe_validate_slide_spec(candidate: &Value) -> Validation {
    let errors = collect_errors(candidate);
    if !errors.is_empty() {
        return Validation::Invalid { errors };
    }

    match serde_json::from_value::<SlideSpec>(candidate.clone()) {
        Ok(mut spec) => {
            if let Some(design) = &mut spec.design {
                if let Some(c) = &design.accent_color {
                    design.accent_color = normalize_hex(c);
                }
                if let Some(c) = &design.secondary_color {
                    design.secondary_color = normalize_hex(c);
                }
            }
            Validation::Valid(spec)
        }
        Err(e) => Validation::Invalid {
            errors: vec![format!("deserialization: {e}")],
        },
    }
}

fn collect_errors(candidate: &Value) -> Vec<String> {
    let mut errors = Vec::new();

    let Some(map) = candidate.as_object() else {
        return vec!["root: expected a JSON object".into()];
    };

    for key in map.keys() {
        if !ALLOWED_KEYS.contains(&key.as_str()) {
            errors.push(format!("{key}: unexpected key"));
        }
    }

    match map.get("title") {
        Some(Value::String(t)) if !t.trim().is_empty() => {}
        Some(Value::String(_)) => errors.push("title: must be a non-empty string".into()),
        Some(_) => errors.push("title: must be a string".into()),
        None => errors.push("title: required non-empty string".into()),
    }

    let layout = match map.get("layout") {
        Some(Value::String(tag)) => match SlideLayout::from_tag(tag) {
            Some(layout) => Some(layout),
            None => {
                errors.push(format!(
                    "layout: '{tag}' is not one of {:?}",
                    SlideLayout::ALL
                ));
                None
            }
        },
        Some(_) => {
            errors.push("layout: must be a string".into());
            None
        }
        None => {
            errors.push("layout: required".into());
            None
        }
    };

    if let Some(layout) = layout {
        if let Some(field) = required_field(layout) {
            if !map.contains_key(field) {
                errors.push(format!("{field}: required for layout '{}'", layout.tag()));
            }
            // two-column needs both sides
            if layout == SlideLayout::TwoColumn && !map.contains_key("right") {
                errors.push("right: required for layout 'two-column'".into());
            }
        }
    }

    for (key, value) in map {
        errors.extend(field_errors(key, value));
    }

    errors
}

/// Shape errors for one optional field, independent of layout. Empty for
/// `title`/`layout` (handled above) and well-formed fields.
pub(crate) fn field_errors(key: &str, value: &Value) -> Vec<String> {
    let mut errors = Vec::new();
    match key {
        "bullets" => check_string_array(key, value, &mut errors),
        "paragraph" | "imagePrompt" | "notes" => {
            if !value.is_string() {
                errors.push(format!("{key}: must be a string"));
            }
        }
        "left" | "right" => check_side(key, value, &mut errors),
        "contentItems" => check_content_items(value, &mut errors),
        "chart" => check_chart(value, &mut errors),
        "timeline" => check_timeline(value, &mut errors),
        "comparisonTable" => check_comparison_table(value, &mut errors),
        "processSteps" => check_process_steps(value, &mut errors),
        "sources" => check_string_array(key, value, &mut errors),
        "design" => check_design(value, &mut errors),
        _ => {}
    }
    errors
}

fn check_string_array(key: &str, value: &Value, errors: &mut Vec<String>) {
    match value.as_array() {
        Some(items) => {
            for (i, item) in items.iter().enumerate() {
                if !item.is_string() {
                    errors.push(format!("{key}[{i}]: must be a string"));
                }
            }
        }
        None => errors.push(format!("{key}: must be an array of strings")),
    }
}

fn check_side(key: &str, value: &Value, errors: &mut Vec<String>) {
    let Some(map) = value.as_object() else {
        errors.push(format!("{key}: must be an object"));
        return;
    };
    for (k, v) in map {
        match k.as_str() {
            "heading" | "paragraph" => {
                if !v.is_string() {
                    errors.push(format!("{key}.{k}: must be a string"));
                }
            }
            "bullets" => check_string_array(&format!("{key}.bullets"), v, errors),
            other => errors.push(format!("{key}.{other}: unexpected key")),
        }
    }
}

fn check_content_items(value: &Value, errors: &mut Vec<String>) {
    let Some(items) = value.as_array() else {
        errors.push("contentItems: must be an array".into());
        return;
    };
    for (i, item) in items.iter().enumerate() {
        let Some(map) = item.as_object() else {
            errors.push(format!("contentItems[{i}]: must be an object"));
            continue;
        };
        if !map.get("type").is_some_and(Value::is_string) {
            errors.push(format!("contentItems[{i}].type: required string"));
        }
        if !map.get("content").is_some_and(Value::is_string) {
            errors.push(format!("contentItems[{i}].content: required string"));
        }
        for k in map.keys() {
            if k != "type" && k != "content" {
                errors.push(format!("contentItems[{i}].{k}: unexpected key"));
            }
        }
    }
}

fn check_chart(value: &Value, errors: &mut Vec<String>) {
    let Some(map) = value.as_object() else {
        errors.push("chart: must be an object".into());
        return;
    };
    for k in map.keys() {
        if !["chartType", "categories", "series"].contains(&k.as_str()) {
            errors.push(format!("chart.{k}: unexpected key"));
        }
    }

    let chart_type = map.get("chartType").and_then(Value::as_str);
    match chart_type {
        Some("bar" | "line" | "pie" | "area") => {}
        Some(other) => errors.push(format!(
            "chart.chartType: '{other}' is not one of [\"bar\", \"line\", \"pie\", \"area\"]"
        )),
        None => errors.push("chart.chartType: required".into()),
    }

    let categories_len = match map.get("categories").and_then(Value::as_array) {
        Some(cats) => {
            for (i, c) in cats.iter().enumerate() {
                if !c.is_string() {
                    errors.push(format!("chart.categories[{i}]: must be a string"));
                }
            }
            Some(cats.len())
        }
        None => {
            errors.push("chart.categories: required array of strings".into());
            None
        }
    };

    let Some(series) = map.get("series").and_then(Value::as_array) else {
        errors.push("chart.series: required array".into());
        return;
    };
    if series.is_empty() {
        errors.push("chart.series: must not be empty".into());
    }
    if chart_type == Some("pie") && series.len() != 1 {
        errors.push(format!(
            "chart.series: pie charts require exactly 1 series, got {}",
            series.len()
        ));
    }
    for (i, s) in series.iter().enumerate() {
        let Some(smap) = s.as_object() else {
            errors.push(format!("chart.series[{i}]: must be an object"));
            continue;
        };
        if !smap.get("name").is_some_and(Value::is_string) {
            errors.push(format!("chart.series[{i}].name: required string"));
        }
        match smap.get("data").and_then(Value::as_array) {
            Some(data) => {
                for (j, d) in data.iter().enumerate() {
                    if !d.is_number() {
                        errors.push(format!("chart.series[{i}].data[{j}]: must be a number"));
                    }
                }
                if let Some(expected) = categories_len {
                    if data.len() != expected {
                        errors.push(format!(
                            "chart.series[{i}].data: length {} does not match {} categories",
                            data.len(),
                            expected
                        ));
                    }
                }
            }
            None => errors.push(format!("chart.series[{i}].data: required array of numbers")),
        }
        for k in smap.keys() {
            if k != "name" && k != "data" {
                errors.push(format!("chart.series[{i}].{k}: unexpected key"));
            }
        }
    }
}

fn check_timeline(value: &Value, errors: &mut Vec<String>) {
    let Some(items) = value.as_array() else {
        errors.push("timeline: must be an array".into());
        return;
    };
    for (i, item) in items.iter().enumerate() {
        let Some(map) = item.as_object() else {
            errors.push(format!("timeline[{i}]: must be an object"));
            continue;
        };
        if !map.get("label").is_some_and(Value::is_string) {
            errors.push(format!("timeline[{i}].label: required string"));
        }
        if let Some(d) = map.get("detail") {
            if !d.is_string() {
                errors.push(format!("timeline[{i}].detail: must be a string"));
            }
        }
        for k in map.keys() {
            if k != "label" && k != "detail" {
                errors.push(format!("timeline[{i}].{k}: unexpected key"));
            }
        }
    }
}

fn check_comparison_table(value: &Value, errors: &mut Vec<String>) {
    let Some(map) = value.as_object() else {
        errors.push("comparisonTable: must be an object".into());
        return;
    };
    for k in map.keys() {
        if k != "columns" && k != "rows" {
            errors.push(format!("comparisonTable.{k}: unexpected key"));
        }
    }
    let columns_len = match map.get("columns").and_then(Value::as_array) {
        Some(cols) => {
            for (i, c) in cols.iter().enumerate() {
                if !c.is_string() {
                    errors.push(format!("comparisonTable.columns[{i}]: must be a string"));
                }
            }
            Some(cols.len())
        }
        None => {
            errors.push("comparisonTable.columns: required array of strings".into());
            None
        }
    };
    match map.get("rows").and_then(Value::as_array) {
        Some(rows) => {
            for (i, row) in rows.iter().enumerate() {
                match row.as_array() {
                    Some(cells) => {
                        for (j, cell) in cells.iter().enumerate() {
                            if !cell.is_string() {
                                errors.push(format!(
                                    "comparisonTable.rows[{i}][{j}]: must be a string"
                                ));
                            }
                        }
                        if let Some(expected) = columns_len {
                            if cells.len() != expected {
                                errors.push(format!(
                                    "comparisonTable.rows[{i}]: width {} does not match {} columns",
                                    cells.len(),
                                    expected
                                ));
                            }
                        }
                    }
                    None => errors.push(format!("comparisonTable.rows[{i}]: must be an array")),
                }
            }
        }
        None => errors.push("comparisonTable.rows: required array".into()),
    }
}

fn check_process_steps(value: &Value, errors: &mut Vec<String>) {
    let Some(items) = value.as_array() else {
        errors.push("processSteps: must be an array".into());
        return;
    };
    for (i, item) in items.iter().enumerate() {
        let Some(map) = item.as_object() else {
            errors.push(format!("processSteps[{i}]: must be an object"));
            continue;
        };
        if !map.get("title").is_some_and(Value::is_string) {
            errors.push(format!("processSteps[{i}].title: required string"));
        }
        if let Some(d) = map.get("detail") {
            if !d.is_string() {
                errors.push(format!("processSteps[{i}].detail: must be a string"));
            }
        }
        for k in map.keys() {
            if k != "title" && k != "detail" {
                errors.push(format!("processSteps[{i}].{k}: unexpected key"));
            }
        }
    }
}

fn check_design(value: &Value, errors: &mut Vec<String>) {
    let Some(map) = value.as_object() else {
        errors.push("design: must be an object".into());
        return;
    };
    for (k, v) in map {
        match k.as_str() {
            "accentColor" | "secondaryColor" => match v.as_str() {
                Some(s) if normalize_hex(s).is_some() => {}
                _ => errors.push(format!("design.{k}: must be a 3- or 6-digit hex color")),
            },
            "font" => {
                if !v.is_string() {
                    errors.push("design.font: must be a string".into());
                }
            }
            other => errors.push(format!("design.{other}: unexpected key")),
        }
    }
}

/// Normalize a 3- or 6-digit hex color to lowercase `#rrggbb`.
/// Returns `None` when the input is not a valid hex color.
pub(crate) fn normalize_hex(color: &str) -> Option<String> {
    let digits = color.strip_prefix('#').unwrap_or(color);
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match digits.len() {
        3 => {
            let expanded: String = digits
                .chars()
                .flat_map(|c| [c, c])
                .collect::<String>()
                .to_lowercase();
            Some(format!("#{expanded}"))
        }
        6 => Some(format!("#{}", digits.to_lowercase())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_spec() -> Value {
        json!({
            "title": "Quarterly Revenue",
            "layout": "title-bullets",
            "bullets": ["Revenue up 12%", "Costs flat"],
            "notes": "Presenter context",
        })
    }

    #[test]
    fn accepts_valid_spec() {
        let result = safe_validate_slide_spec(&valid_spec());
        let spec = result.into_result().expect("valid");
        assert_eq!(spec.title, "Quarterly Revenue");
        assert_eq!(spec.bullets.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn missing_title_names_field() {
        let mut v = valid_spec();
        v.as_object_mut().unwrap().remove("title");
        let result = safe_validate_slide_spec(&v);
        assert!(result.errors().iter().any(|e| e.starts_with("title:")));
    }

    #[test]
    fn out_of_enum_layout_names_field() {
        let mut v = valid_spec();
        v["layout"] = json!("freeform");
        let result = safe_validate_slide_spec(&v);
        assert!(result.errors().iter().any(|e| e.starts_with("layout:")));
    }

    #[test]
    fn non_string_layout_named_as_wrong_type() {
        let mut v = valid_spec();
        v["layout"] = json!(3);
        let errors = match safe_validate_slide_spec(&v) {
            Validation::Invalid { errors } => errors,
            Validation::Valid(_) => panic!("expected invalid"),
        };
        assert!(errors.iter().any(|e| e == "layout: must be a string"));
        assert!(!errors.iter().any(|e| e == "layout: required"));
    }

    #[test]
    fn unknown_top_level_key_rejected() {
        let mut v = valid_spec();
        v["animations"] = json!(["fade"]);
        let result = safe_validate_slide_spec(&v);
        assert!(result
            .errors()
            .iter()
            .any(|e| e.contains("animations") && e.contains("unexpected")));
    }

    #[test]
    fn unknown_nested_key_rejected() {
        let v = json!({
            "title": "t",
            "layout": "two-column",
            "left": {"heading": "A", "emphasis": true},
            "right": {"heading": "B"},
        });
        let result = safe_validate_slide_spec(&v);
        assert!(result
            .errors()
            .iter()
            .any(|e| e.contains("left.emphasis")));
    }

    #[test]
    fn layout_requires_its_field() {
        let v = json!({"title": "t", "layout": "chart"});
        let result = safe_validate_slide_spec(&v);
        assert!(result
            .errors()
            .iter()
            .any(|e| e.contains("chart: required for layout")));
    }

    #[test]
    fn two_column_requires_both_sides() {
        let v = json!({
            "title": "t",
            "layout": "two-column",
            "left": {"heading": "A"},
        });
        let result = safe_validate_slide_spec(&v);
        assert!(result.errors().iter().any(|e| e.starts_with("right:")));
    }

    #[test]
    fn pie_chart_with_two_series_rejected() {
        let v = json!({
            "title": "Share",
            "layout": "chart",
            "chart": {
                "chartType": "pie",
                "categories": ["A", "B"],
                "series": [
                    {"name": "s1", "data": [1.0, 2.0]},
                    {"name": "s2", "data": [3.0, 4.0]},
                ],
            },
        });
        let result = safe_validate_slide_spec(&v);
        assert!(result
            .errors()
            .iter()
            .any(|e| e.contains("exactly 1 series")));
    }

    #[test]
    fn bar_chart_data_length_mismatch_rejected() {
        let v = json!({
            "title": "Trend",
            "layout": "chart",
            "chart": {
                "chartType": "bar",
                "categories": ["Q1", "Q2", "Q3"],
                "series": [{"name": "rev", "data": [1.0, 2.0]}],
            },
        });
        let result = safe_validate_slide_spec(&v);
        assert!(result
            .errors()
            .iter()
            .any(|e| e.contains("does not match 3 categories")));
    }

    #[test]
    fn table_row_width_mismatch_rejected() {
        let v = json!({
            "title": "Compare",
            "layout": "comparison-table",
            "comparisonTable": {
                "columns": ["Feature", "Us", "Them"],
                "rows": [["Price", "Low"]],
            },
        });
        let result = safe_validate_slide_spec(&v);
        assert!(result
            .errors()
            .iter()
            .any(|e| e.contains("does not match 3 columns")));
    }

    #[test]
    fn colors_normalized_to_six_digits() {
        let v = json!({
            "title": "t",
            "layout": "title-only",
            "design": {"accentColor": "#A1C"},
        });
        let spec = safe_validate_slide_spec(&v).into_result().unwrap();
        assert_eq!(
            spec.design.unwrap().accent_color.as_deref(),
            Some("#aa11cc")
        );
    }

    #[test]
    fn bad_color_rejected() {
        let v = json!({
            "title": "t",
            "layout": "title-only",
            "design": {"accentColor": "#12345"},
        });
        let result = safe_validate_slide_spec(&v);
        assert!(result.errors().iter().any(|e| e.contains("accentColor")));
    }

    #[test]
    fn non_object_root_rejected() {
        let result = safe_validate_slide_spec(&json!(["not", "an", "object"]));
        assert!(result.errors()[0].contains("expected a JSON object"));
    }

    #[test]
    fn normalize_hex_forms() {
        assert_eq!(normalize_hex("#abc").as_deref(), Some("#aabbcc"));
        assert_eq!(normalize_hex("A1B2C3").as_deref(), Some("#a1b2c3"));
        assert_eq!(normalize_hex("#12345"), None);
        assert_eq!(normalize_hex("xyzxyz"), None);
    }
}
