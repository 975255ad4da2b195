//! Defensive JSON extraction from raw provider text.
//!
//! Providers occasionally wrap their JSON in prose or markdown fences even
//! when a JSON response was requested. These functions recover the object
//! without another model call. Used only as a fallback after a direct
//! `serde_json` parse fails.

/// Find the first syntactically balanced `{...}` substring.
///
/// Tracks string literals and escape sequences so braces inside quoted
/// strings do not perturb the depth counter. Returns `None` when no
/// balanced object exists.
///
/// # Examples
///
/// ```
/// use slidegen::recovery::extract_json_object;
///
/// let text = r#"Sure! Here is the JSON: {"a":{"b":1}} Thanks."#;
/// assert_eq!(extract_json_object(text), Some(r#"{"a":{"b":1}}"#));
/// assert_eq!(extract_json_object("no braces here"), None);
/// ```
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in text[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        if in_string && ch == '\\' {
            escape_next = true;
            continue;
        }
        if ch == '"' {
            in_string = !in_string;
            continue;
        }
        if in_string {
            continue;
        }
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + i + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Extract the content of a fenced code block, preferring a `json` fence.
///
/// Returns `None` when no closed fence exists.
pub fn extract_code_fence(text: &str) -> Option<&str> {
    extract_fence_for(text, "json").or_else(|| extract_fence_for(text, ""))
}

fn extract_fence_for<'a>(text: &'a str, lang: &str) -> Option<&'a str> {
    let mut search_from = 0;
    while let Some(fence_start) = text[search_from..].find("```") {
        let after_backticks = search_from + fence_start + 3;
        let line_end = text[after_backticks..].find('\n')?;
        let lang_str = text[after_backticks..after_backticks + line_end].trim();
        let content_start = after_backticks + line_end + 1;

        if lang_str.eq_ignore_ascii_case(lang) {
            if let Some(close) = text[content_start..].find("```") {
                return Some(text[content_start..content_start + close].trim());
            }
        }
        search_from = content_start;
    }
    None
}

/// Strip `<think>...</think>` and `<thinking>...</thinking>` blocks.
///
/// Reasoning models interleave these with the actual answer even in JSON
/// mode. Handles unclosed blocks (strips to end of text) and multiple
/// sequential blocks.
pub fn strip_think_tags(text: &str) -> String {
    let mut result = strip_tag_variant(text, "<think>", "</think>");
    result = strip_tag_variant(&result, "<thinking>", "</thinking>");
    result
}

fn strip_tag_variant(text: &str, open: &str, close: &str) -> String {
    let mut result = text.to_string();
    while let Some(start) = result.find(open) {
        if let Some(end_offset) = result[start..].find(close) {
            let end = start + end_offset + close.len();
            result = format!("{}{}", &result[..start], &result[end..]);
        } else {
            result = result[..start].to_string();
            break;
        }
    }
    result
}

/// Parse raw provider text into a JSON value, trying direct parse, then
/// think-tag stripping, then code fences, then balanced-object extraction.
pub fn parse_json_lenient(raw: &str) -> Option<serde_json::Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(v) = serde_json::from_str(trimmed) {
        return Some(v);
    }

    let cleaned = strip_think_tags(trimmed);
    let cleaned = cleaned.trim();
    if let Ok(v) = serde_json::from_str(cleaned) {
        return Some(v);
    }
    if let Some(fenced) = extract_code_fence(cleaned) {
        if let Ok(v) = serde_json::from_str(fenced) {
            return Some(v);
        }
    }
    if let Some(obj) = extract_json_object(cleaned) {
        if let Ok(v) = serde_json::from_str(obj) {
            return Some(v);
        }
    }
    None
}
