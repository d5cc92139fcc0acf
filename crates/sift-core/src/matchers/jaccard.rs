//! Token-set overlap

use std::collections::BTreeSet;

use crate::error::Result;
use crate::index::IndexedCategory;
use crate::models::{MatchCandidate, MatchMethod};
use crate::normalize::NormalizedText;

use super::{run_per_category, MatchContext};

/// `|A ∩ B| / |A ∪ B|`, 0 when both sets are empty
pub fn jaccard<T: Ord>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> f64 {
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}

pub fn match_category(
    input: &NormalizedText,
    category: &IndexedCategory,
    _ctx: &MatchContext<'_>,
) -> Result<Vec<MatchCandidate>> {
    Ok(category
        .terms
        .iter()
        .filter_map(|term| {
            let score = jaccard(&input.token_set, &term.normalized.token_set);
            (score > 0.0).then(|| MatchCandidate {
                category_id: category.id,
                matched_text: term.text.clone(),
                match_type: term.match_type,
                method: MatchMethod::Jaccard,
                score,
            })
        })
        .collect())
}

/// Jaccard candidates across all categories
pub fn match_jaccard(input: &NormalizedText, ctx: &MatchContext<'_>) -> Vec<MatchCandidate> {
    run_per_category(MatchMethod::Jaccard, input, ctx, match_category)
}
