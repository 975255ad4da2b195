//! Best-effort repair of near-miss SlideSpec candidates.
//!
//! `sanitize_spec` never fails: it coerces common model mistakes (bullet
//! objects instead of strings, missing layout, stray keys) into the closest
//! well-formed shape and leaves anything it cannot fix for the validator to
//! report. `minimal_spec` is the last resort before a stage retry: keep only
//! the fields that individually validate and report what was dropped.

use serde_json::{json, Map, Value};

use crate::spec::SlideLayout;
use crate::validate::{self, normalize_hex, required_field, ALLOWED_KEYS};

/// Coerce a candidate value toward a well-formed SlideSpec.
///
/// Idempotent: sanitizing an already-clean spec returns it unchanged.
/// Non-object inputs pass through untouched; the validator rejects them
/// with a named error.
pub fn sanitize_spec(candidate: Value) -> Value {
    let map = match candidate {
        Value::Object(map) => map,
        other => return other,
    };

    let mut out = Map::new();
    for (key, value) in map {
        if !ALLOWED_KEYS.contains(&key.as_str()) {
            continue;
        }
        let cleaned = match key.as_str() {
            "bullets" | "sources" => clean_string_list(value),
            "paragraph" | "imagePrompt" | "notes" => coerce_text(&value).map(Value::String),
            "left" | "right" => clean_side(value),
            "contentItems" => clean_content_items(value),
            "design" => clean_design(value),
            _ => Some(value),
        };
        if let Some(v) = cleaned {
            out.insert(key, v);
        }
    }

    ensure_layout(&mut out);
    ensure_title(&mut out);

    Value::Object(out)
}

/// Reduce a sanitized candidate to the fields that individually validate.
///
/// Returns the reduced spec and the wire-cased names of dropped fields.
/// The layout is re-derived afterwards so it never names a field that was
/// just removed.
pub fn minimal_spec(candidate: &Value) -> (Value, Vec<String>) {
    let sanitized = sanitize_spec(candidate.clone());
    let Value::Object(map) = sanitized else {
        return (json!({}), Vec::new());
    };

    let mut out = Map::new();
    let mut dropped = Vec::new();
    for (key, value) in map {
        if key == "title" || key == "layout" {
            out.insert(key, value);
            continue;
        }
        if validate::field_errors(&key, &value).is_empty() {
            out.insert(key, value);
        } else {
            dropped.push(key);
        }
    }

    // a dropped field may have been the one the layout depends on
    let layout_ok = out
        .get("layout")
        .and_then(Value::as_str)
        .and_then(SlideLayout::from_tag)
        .and_then(required_field)
        .is_none_or(|field| out.contains_key(field));
    if !layout_ok {
        out.remove("layout");
        ensure_layout(&mut out);
    }

    (Value::Object(out), dropped)
}

fn ensure_layout(map: &mut Map<String, Value>) {
    let current = map
        .get("layout")
        .and_then(Value::as_str)
        .and_then(SlideLayout::from_tag);
    let consistent = current.is_some_and(|layout| {
        required_field(layout).is_none_or(|field| map.contains_key(field))
            && (layout != SlideLayout::TwoColumn || map.contains_key("right"))
    });
    if consistent {
        return;
    }

    let inferred = if map.contains_key("bullets") {
        SlideLayout::TitleBullets
    } else if map.contains_key("paragraph") {
        SlideLayout::TitleParagraph
    } else if map.contains_key("left") && map.contains_key("right") {
        SlideLayout::TwoColumn
    } else if map.contains_key("chart") {
        SlideLayout::Chart
    } else if map.contains_key("timeline") {
        SlideLayout::Timeline
    } else if map.contains_key("comparisonTable") {
        SlideLayout::ComparisonTable
    } else if map.contains_key("processSteps") {
        SlideLayout::ProcessSteps
    } else if map.contains_key("imagePrompt") {
        SlideLayout::ImageFocus
    } else {
        SlideLayout::TitleOnly
    };
    map.insert("layout".into(), json!(inferred.tag()));
}

fn ensure_title(map: &mut Map<String, Value>) {
    let present = map
        .get("title")
        .and_then(Value::as_str)
        .is_some_and(|t| !t.trim().is_empty());
    if present {
        return;
    }

    let inferred = map
        .get("bullets")
        .and_then(Value::as_array)
        .and_then(|b| b.first())
        .and_then(Value::as_str)
        .or_else(|| map.get("paragraph").and_then(Value::as_str))
        .map(|text| text.split_whitespace().take(8).collect::<Vec<_>>().join(" "))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "Untitled Slide".to_string());
    map.insert("title".into(), json!(inferred));
}

/// Pull a plain string out of a value: strings pass through, objects yield
/// their `text`/`content` property or their single string property, numbers
/// are formatted. Anything else is unrecoverable.
fn coerce_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => {
            if let Some(s) = map.get("text").and_then(Value::as_str) {
                return Some(s.to_string());
            }
            if let Some(s) = map.get("content").and_then(Value::as_str) {
                return Some(s.to_string());
            }
            let strings: Vec<&str> = map.values().filter_map(Value::as_str).collect();
            if strings.len() == 1 && map.len() == 1 {
                Some(strings[0].to_string())
            } else {
                None
            }
        }
        _ => None,
    }
}

fn clean_string_list(value: Value) -> Option<Value> {
    let items = match value {
        Value::Array(items) => items,
        // a lone string becomes a one-element list
        other => vec![other],
    };
    let cleaned: Vec<Value> = items
        .iter()
        .filter_map(coerce_text)
        .map(Value::String)
        .collect();
    if cleaned.is_empty() {
        None
    } else {
        Some(Value::Array(cleaned))
    }
}

fn clean_side(value: Value) -> Option<Value> {
    let map = match value {
        Value::Object(map) => map,
        // a bare string side becomes a paragraph side
        other => return coerce_text(&other).map(|text| json!({ "paragraph": text })),
    };
    let mut out = Map::new();
    for (key, v) in map {
        match key.as_str() {
            "heading" | "paragraph" => {
                if let Some(text) = coerce_text(&v) {
                    out.insert(key, Value::String(text));
                }
            }
            "bullets" => {
                if let Some(list) = clean_string_list(v) {
                    out.insert(key, list);
                }
            }
            _ => {}
        }
    }
    if out.is_empty() {
        None
    } else {
        Some(Value::Object(out))
    }
}

fn clean_content_items(value: Value) -> Option<Value> {
    let Value::Array(items) = value else {
        return None;
    };
    let cleaned: Vec<Value> = items
        .into_iter()
        .filter_map(|item| match &item {
            Value::String(s) => Some(json!({ "type": "text", "content": s })),
            Value::Object(map) => {
                let kind = map
                    .get("type")
                    .and_then(Value::as_str)
                    .unwrap_or("text")
                    .to_string();
                let content = map.get("content").and_then(coerce_text)?;
                Some(json!({ "type": kind, "content": content }))
            }
            _ => None,
        })
        .collect();
    if cleaned.is_empty() {
        None
    } else {
        Some(Value::Array(cleaned))
    }
}

fn clean_design(value: Value) -> Option<Value> {
    let Value::Object(map) = value else {
        return None;
    };
    let mut out = Map::new();
    for (key, v) in map {
        match key.as_str() {
            "accentColor" | "secondaryColor" => {
                if let Some(hex) = v.as_str().and_then(normalize_hex) {
                    out.insert(key, Value::String(hex));
                }
            }
            "font" => {
                if let Some(font) = coerce_text(&v) {
                    out.insert(key, Value::String(font));
                }
            }
            _ => {}
        }
    }
    if out.is_empty() {
        None
    } else {
        Some(Value::Object(out))
    }
}
