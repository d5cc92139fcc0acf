//! Matching methods
//!
//! Each method is a plain function with the same per-category signature,
//! selected through [`matcher_for`]. A matcher error drops that category's
//! candidates for that method only.

use std::borrow::Cow;
use std::cell::OnceCell;

use tracing::warn;

use crate::error::Result;
use crate::index::{CategoryIndex, IndexedCategory};
use crate::models::{MatchCandidate, MatchMethod};
use crate::normalize::NormalizedText;

pub mod jaccard;
pub mod keyword;
pub mod levenshtein;
pub mod tfidf;

pub use jaccard::{jaccard, match_jaccard};
pub use keyword::match_keywords;
pub use levenshtein::{levenshtein_score, match_levenshtein, DEFAULT_LEVENSHTEIN_FLOOR};
pub use tfidf::{match_cosine_tfidf, SparseVector, TfidfCorpus};

/// Per-input state shared by every matcher during one categorization
pub struct MatchContext<'a> {
    pub index: &'a CategoryIndex,
    /// Levenshtein candidates must score strictly above this
    pub levenshtein_floor: f64,
    tfidf_input: OnceCell<(NormalizedText, SparseVector)>,
}

impl<'a> MatchContext<'a> {
    pub fn new(index: &'a CategoryIndex) -> Self {
        Self {
            index,
            levenshtein_floor: DEFAULT_LEVENSHTEIN_FLOOR,
            tfidf_input: OnceCell::new(),
        }
    }

    pub fn with_levenshtein_floor(mut self, floor: f64) -> Self {
        self.levenshtein_floor = floor;
        self
    }

    /// Input TF-IDF vector. Only the first input seen is cached; any other
    /// input is vectorized again on each call.
    pub(crate) fn tfidf_input(&self, input: &NormalizedText) -> Cow<'_, SparseVector> {
        let (cached_for, vector) = self
            .tfidf_input
            .get_or_init(|| (input.clone(), self.index.tfidf().vectorize(input)));
        if cached_for == input {
            Cow::Borrowed(vector)
        } else {
            Cow::Owned(self.index.tfidf().vectorize(input))
        }
    }
}

/// Scores one input against one category
pub type MatcherFn =
    fn(&NormalizedText, &IndexedCategory, &MatchContext<'_>) -> Result<Vec<MatchCandidate>>;

/// The matcher implementing `method`
pub fn matcher_for(method: MatchMethod) -> MatcherFn {
    match method {
        MatchMethod::Keyword => keyword::match_category,
        MatchMethod::Jaccard => jaccard::match_category,
        MatchMethod::Levenshtein => levenshtein::match_category,
        MatchMethod::CosineTfidf => tfidf::match_category,
    }
}

/// Run one method over every category in the index
pub fn run_method(
    method: MatchMethod,
    input: &NormalizedText,
    ctx: &MatchContext<'_>,
) -> Vec<MatchCandidate> {
    run_per_category(method, input, ctx, matcher_for(method))
}

pub(crate) fn run_per_category(
    method: MatchMethod,
    input: &NormalizedText,
    ctx: &MatchContext<'_>,
    matcher: MatcherFn,
) -> Vec<MatchCandidate> {
    let mut candidates = Vec::new();

    for category in ctx.index.categories() {
        match matcher(input, category, ctx) {
            Ok(found) => candidates.extend(found),
            Err(e) => {
                warn!(
                    method = %method,
                    category_id = category.id,
                    "Skipping category '{}': {}",
                    category.name,
                    e
                );
            }
        }
    }

    candidates
}
