//! Whole-string edit distance, for misspellings and abbreviations

use crate::error::Result;
use crate::index::IndexedCategory;
use crate::models::{MatchCandidate, MatchMethod};
use crate::normalize::NormalizedText;

use super::{run_per_category, MatchContext};

/// Default minimum similarity for a Levenshtein candidate
pub const DEFAULT_LEVENSHTEIN_FLOOR: f64 = 0.5;

/// `1 - distance / max(len)` over characters, 1.0 for two empty strings
pub fn levenshtein_score(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    let distance = strsim::levenshtein(a, b);
    (1.0 - distance as f64 / max_len as f64).clamp(0.0, 1.0)
}

pub fn match_category(
    input: &NormalizedText,
    category: &IndexedCategory,
    ctx: &MatchContext<'_>,
) -> Result<Vec<MatchCandidate>> {
    if input.is_blank() {
        return Ok(Vec::new());
    }

    Ok(category
        .terms
        .iter()
        .filter(|term| !term.normalized.is_blank())
        .filter_map(|term| {
            let score = levenshtein_score(&input.lower, &term.normalized.lower);
            (score > ctx.levenshtein_floor).then(|| MatchCandidate {
                category_id: category.id,
                matched_text: term.text.clone(),
                match_type: term.match_type,
                method: MatchMethod::Levenshtein,
                score,
            })
        })
        .collect())
}

/// Levenshtein candidates across all categories
pub fn match_levenshtein(input: &NormalizedText, ctx: &MatchContext<'_>) -> Vec<MatchCandidate> {
    run_per_category(MatchMethod::Levenshtein, input, ctx, match_category)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::tests::category;
    use crate::index::CategoryIndex;
    use crate::normalize::{normalize, Normalizer};

    #[test]
    fn test_identity() {
        assert_eq!(levenshtein_score("", ""), 1.0);
        for s in ["a", "netflix", "whole foods market"] {
            assert_eq!(levenshtein_score(s, s), 1.0);
        }
    }

    #[test]
    fn test_score_decreases_with_distance() {
        let one = levenshtein_score("netflix", "netflx");
        let two = levenshtein_score("netflix", "netfx");
        let all = levenshtein_score("netflix", "");
        assert!(1.0 > one && one > two && two > all);
        assert_eq!(all, 0.0);
        assert!((one - (1.0 - 1.0 / 7.0)).abs() < 1e-12);
    }

    #[test]
    fn test_lengths_counted_in_characters() {
        // One substitution over four characters, regardless of UTF-8 width
        assert!((levenshtein_score("café", "cafe") - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_match_levenshtein_catches_misspelling() {
        let index = CategoryIndex::build(
            &[category(1, "Streaming", &["netflix"], &[])],
            &Normalizer::default(),
        );
        let ctx = MatchContext::new(&index);

        let candidates = match_levenshtein(&normalize("NETFLX"), &ctx);
        assert_eq!(candidates.len(), 1);
        assert!(candidates[0].score > 0.8);
    }

    #[test]
    fn test_floor_filters_noise() {
        let index = CategoryIndex::build(
            &[category(1, "Shopping", &["amazon"], &[])],
            &Normalizer::default(),
        );
        let ctx = MatchContext::new(&index);
        assert!(match_levenshtein(&normalize("AMZN MKTP US*2A3B4"), &ctx).is_empty());

        // A floor of zero lets the weak similarity through
        let permissive = MatchContext::new(&index).with_levenshtein_floor(0.0);
        assert_eq!(match_levenshtein(&normalize("AMZN MKTP US*2A3B4"), &permissive).len(), 1);
    }

    #[test]
    fn test_blank_input_yields_nothing() {
        let index = CategoryIndex::build(
            &[category(1, "Streaming", &["netflix"], &[])],
            &Normalizer::default(),
        );
        let ctx = MatchContext::new(&index).with_levenshtein_floor(0.0);
        assert!(match_levenshtein(&normalize("  "), &ctx).is_empty());
    }
}
