//! Content budgeting: cap bullet counts and text lengths per the requested
//! content length, truncating on word boundaries.

use crate::params::ContentLength;
use crate::spec::{SideContent, SlideSpec};

/// Limits applied to a finished slide. Character limits count Unicode
/// scalar values, and the trailing ellipsis counts against the limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentBudget {
    pub max_bullets: usize,
    pub bullet_chars: usize,
    pub paragraph_chars: usize,
}

impl ContentBudget {
    pub fn for_length(length: ContentLength) -> Self {
        match length {
            ContentLength::Short => Self {
                max_bullets: 4,
                bullet_chars: 60,
                paragraph_chars: 280,
            },
            ContentLength::Medium => Self {
                max_bullets: 6,
                bullet_chars: 90,
                paragraph_chars: 500,
            },
            ContentLength::Long => Self {
                max_bullets: 8,
                bullet_chars: 120,
                paragraph_chars: 800,
            },
        }
    }
}

/// Enforce the budget for `length` on a validated slide, in place.
pub(crate) fn apply_budget(spec: &mut SlideSpec, length: ContentLength) {
    let budget = ContentBudget::for_length(length);

    if let Some(bullets) = &mut spec.bullets {
        clamp_bullets(bullets, &budget);
    }
    if let Some(paragraph) = &mut spec.paragraph {
        *paragraph = truncate_at_word(paragraph, budget.paragraph_chars);
    }
    if let Some(side) = &mut spec.left {
        clamp_side(side, &budget);
    }
    if let Some(side) = &mut spec.right {
        clamp_side(side, &budget);
    }
}

fn clamp_bullets(bullets: &mut Vec<String>, budget: &ContentBudget) {
    bullets.truncate(budget.max_bullets);
    for bullet in bullets.iter_mut() {
        *bullet = truncate_at_word(bullet, budget.bullet_chars);
    }
}

fn clamp_side(side: &mut SideContent, budget: &ContentBudget) {
    if let Some(bullets) = &mut side.bullets {
        clamp_bullets(bullets, budget);
    }
    if let Some(paragraph) = &mut side.paragraph {
        *paragraph = truncate_at_word(paragraph, budget.paragraph_chars);
    }
}

/// Truncate `text` to at most `limit` characters, cutting at the last word
/// boundary that fits and appending `…`. The ellipsis is counted inside the
/// limit. Text already within the limit is returned unchanged.
pub(crate) fn truncate_at_word(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    // leave one character of room for the ellipsis
    let keep = limit.saturating_sub(1);
    let byte_end = text
        .char_indices()
        .nth(keep)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let prefix = &text[..byte_end];

    let cut = match prefix.rfind(char::is_whitespace) {
        // never cut to an empty string
        Some(pos) if !prefix[..pos].trim_end().is_empty() => prefix[..pos].trim_end(),
        _ => prefix,
    };
    format!("{}…", cut)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::SlideLayout;

    #[test]
    fn short_text_unchanged() {
        assert_eq!(truncate_at_word("brief", 60), "brief");
        assert_eq!(truncate_at_word("", 10), "");
    }

    #[test]
    fn truncation_cuts_on_word_boundary_within_limit() {
        let out = truncate_at_word("revenue grew twelve percent year over year", 20);
        assert!(out.ends_with('…'));
        assert!(out.chars().count() <= 20);
        // no mid-word cut: everything before the ellipsis is whole words
        assert_eq!(out, "revenue grew…");
    }

    #[test]
    fn single_long_word_hard_cut() {
        let out = truncate_at_word("antidisestablishmentarianism", 10);
        assert_eq!(out.chars().count(), 10);
        assert!(out.ends_with('…'));
    }

    #[test]
    fn multibyte_text_truncates_on_char_boundary() {
        let out = truncate_at_word("日本語のテキストをここに書きます", 8);
        assert!(out.chars().count() <= 8);
        assert!(out.ends_with('…'));
    }

    #[test]
    fn budget_clamps_bullet_count_and_length() {
        let mut spec = SlideSpec::new("t", SlideLayout::TitleBullets);
        spec.bullets = Some(
            (0..10)
                .map(|i| format!("bullet number {} with some extended explanatory text attached to it", i))
                .collect(),
        );
        apply_budget(&mut spec, ContentLength::Short);

        let bullets = spec.bullets.unwrap();
        assert_eq!(bullets.len(), 4);
        for b in &bullets {
            assert!(b.chars().count() <= 60);
        }
    }

    #[test]
    fn presets_grow_with_length() {
        let short = ContentBudget::for_length(ContentLength::Short);
        let medium = ContentBudget::for_length(ContentLength::Medium);
        let long = ContentBudget::for_length(ContentLength::Long);
        assert!(short.max_bullets < medium.max_bullets);
        assert!(medium.paragraph_chars < long.paragraph_chars);
    }
}
