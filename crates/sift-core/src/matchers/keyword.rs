//! Exact keyword and merchant-pattern matching
//!
//! The cheapest and most precise method: a keyword or literal pattern scores
//! 1.0 when its normalized form appears in the normalized input. `re:`
//! patterns are matched against both the raw and the normalized input.

use crate::error::{Error, Result};
use crate::index::IndexedCategory;
use crate::models::{MatchCandidate, MatchMethod, MatchType};
use crate::normalize::NormalizedText;

use super::{run_per_category, MatchContext};

/// Keyword/pattern candidates for one category
///
/// Fails when the category carries a regex pattern that did not compile,
/// so none of its keyword-method candidates are trusted.
pub fn match_category(
    input: &NormalizedText,
    category: &IndexedCategory,
    _ctx: &MatchContext<'_>,
) -> Result<Vec<MatchCandidate>> {
    if !category.pattern_errors.is_empty() {
        return Err(Error::Pattern(format!(
            "category '{}' has invalid patterns: {}",
            category.name,
            category.pattern_errors.join("; ")
        )));
    }

    let mut candidates = Vec::new();
    let folded_input = input.folded_raw();

    for term in &category.terms {
        // Normalizing non-ASCII terms is lossy, so those match on folded raw text
        let hit = match term.folded.as_deref() {
            Some(folded) => folded_input.contains(folded),
            None => contains_phrase(&input.lower, &term.normalized.lower),
        };

        if hit {
            candidates.push(MatchCandidate {
                category_id: category.id,
                matched_text: term.text.clone(),
                match_type: term.match_type,
                method: MatchMethod::Keyword,
                score: 1.0,
            });
        }
    }

    for pattern in &category.regexes {
        if pattern.regex.is_match(&input.raw) || pattern.regex.is_match(&input.lower) {
            candidates.push(MatchCandidate {
                category_id: category.id,
                matched_text: pattern.text.clone(),
                match_type: MatchType::MerchantPattern,
                method: MatchMethod::Keyword,
                score: 1.0,
            });
        }
    }

    Ok(candidates)
}

/// Keyword/pattern candidates across all categories
pub fn match_keywords(input: &NormalizedText, ctx: &MatchContext<'_>) -> Vec<MatchCandidate> {
    run_per_category(MatchMethod::Keyword, input, ctx, match_category)
}

/// Substring test on normalized text
fn contains_phrase(haystack: &str, needle: &str) -> bool {
    !needle.is_empty() && haystack.contains(needle)
}
