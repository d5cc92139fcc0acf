//! TF-IDF cosine similarity matcher
//!
//! Every literal keyword and merchant pattern of every participating category
//! is one document. IDF is smoothed (`ln((N + 1) / (df + 1)) + 1`) so terms
//! that never occur in the corpus still carry weight in the input vector.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::index::IndexedCategory;
use crate::models::{MatchCandidate, MatchMethod};
use crate::normalize::NormalizedText;

use super::{run_per_category, MatchContext};

/// Sparse TF-IDF vector with a precomputed L2 norm
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    weights: BTreeMap<String, f64>,
    norm: f64,
}

impl SparseVector {
    fn from_weights(weights: BTreeMap<String, f64>) -> Self {
        let norm = weights.values().map(|w| w * w).sum::<f64>().sqrt();
        Self { weights, norm }
    }

    pub fn is_zero(&self) -> bool {
        self.norm == 0.0
    }

    pub fn weight(&self, term: &str) -> f64 {
        self.weights.get(term).copied().unwrap_or(0.0)
    }

    /// Cosine similarity, 0 when either vector is zero
    pub fn cosine(&self, other: &SparseVector) -> f64 {
        if self.is_zero() || other.is_zero() {
            return 0.0;
        }

        // Iterate the smaller map; BTreeMap order keeps the sum deterministic
        let (small, large) = if self.weights.len() <= other.weights.len() {
            (self, other)
        } else {
            (other, self)
        };
        let dot: f64 = small
            .weights
            .iter()
            .filter_map(|(term, w)| large.weights.get(term).map(|v| w * v))
            .sum();

        (dot / (self.norm * other.norm)).clamp(0.0, 1.0)
    }
}

/// IDF table and document vectors for a category corpus
#[derive(Debug, Clone, Default)]
pub struct TfidfCorpus {
    document_count: usize,
    document_frequency: BTreeMap<String, usize>,
    documents: Vec<SparseVector>,
}

impl TfidfCorpus {
    pub fn build(documents: &[NormalizedText]) -> Self {
        let mut document_frequency: BTreeMap<String, usize> = BTreeMap::new();
        for doc in documents {
            for term in &doc.token_set {
                *document_frequency.entry(term.clone()).or_insert(0) += 1;
            }
        }

        let mut corpus = Self {
            document_count: documents.len(),
            document_frequency,
            documents: Vec::with_capacity(documents.len()),
        };
        corpus.documents = documents.iter().map(|d| corpus.vectorize(d)).collect();
        corpus
    }

    pub fn idf(&self, term: &str) -> f64 {
        let df = self.document_frequency.get(term).copied().unwrap_or(0);
        ((self.document_count as f64 + 1.0) / (df as f64 + 1.0)).ln() + 1.0
    }

    /// TF-IDF vector for text, using raw term counts
    pub fn vectorize(&self, text: &NormalizedText) -> SparseVector {
        let weights = text
            .term_counts()
            .into_iter()
            .map(|(term, count)| (term.to_string(), count as f64 * self.idf(term)))
            .collect();
        SparseVector::from_weights(weights)
    }

    pub fn document(&self, index: usize) -> Option<&SparseVector> {
        self.documents.get(index)
    }

    pub fn len(&self) -> usize {
        self.document_count
    }

    pub fn is_empty(&self) -> bool {
        self.document_count == 0
    }
}

/// TF-IDF cosine candidates for one category
pub fn match_category(
    input: &NormalizedText,
    category: &IndexedCategory,
    ctx: &MatchContext<'_>,
) -> Result<Vec<MatchCandidate>> {
    let vector = ctx.tfidf_input(input);
    if vector.is_zero() {
        return Ok(Vec::new());
    }

    Ok(category
        .terms
        .iter()
        .filter_map(|term| {
            let doc = ctx.index.tfidf().document(term.document?)?;
            let score = vector.cosine(doc);
            (score > 0.0).then(|| MatchCandidate {
                category_id: category.id,
                matched_text: term.text.clone(),
                match_type: term.match_type,
                method: MatchMethod::CosineTfidf,
                score,
            })
        })
        .collect())
}

/// TF-IDF cosine candidates across all categories
pub fn match_cosine_tfidf(input: &NormalizedText, ctx: &MatchContext<'_>) -> Vec<MatchCandidate> {
    run_per_category(MatchMethod::CosineTfidf, input, ctx, match_category)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::tests::category;
    use crate::index::CategoryIndex;
    use crate::normalize::{normalize, Normalizer};

    #[test]
    fn test_idf_prefers_rare_terms() {
        let docs = vec![
            normalize("coffee shop"),
            normalize("coffee beans"),
            normalize("pet shop"),
        ];
        let corpus = TfidfCorpus::build(&docs);

        assert!(corpus.idf("beans") > corpus.idf("coffee"));
        // Unseen terms get the highest weight
        assert!(corpus.idf("unicorn") > corpus.idf("beans"));
        assert_eq!(corpus.len(), 3);
    }

    #[test]
    fn test_vectorize_uses_counts() {
        let corpus = TfidfCorpus::build(&[normalize("uber")]);
        let once = corpus.vectorize(&normalize("uber"));
        let twice = corpus.vectorize(&normalize("uber uber"));
        assert!((twice.weight("uber") - 2.0 * once.weight("uber")).abs() < 1e-12);
    }

    #[test]
    fn test_cosine_identity_and_zero() {
        let corpus = TfidfCorpus::build(&[normalize("whole foods"), normalize("shell gas")]);
        let v = corpus.vectorize(&normalize("whole foods"));
        assert!((v.cosine(&v) - 1.0).abs() < 1e-9);

        let zero = corpus.vectorize(&normalize(""));
        assert!(zero.is_zero());
        assert_eq!(v.cosine(&zero), 0.0);
        assert_eq!(zero.cosine(&v), 0.0);

        let disjoint = corpus.vectorize(&normalize("shell gas"));
        assert_eq!(v.cosine(&disjoint), 0.0);
    }

    #[test]
    fn test_cosine_bounded() {
        let corpus = TfidfCorpus::build(&[normalize("uber eats"), normalize("uber trip")]);
        let a = corpus.vectorize(&normalize("uber eats delivery"));
        let b = corpus.document(0).unwrap();
        let score = a.cosine(b);
        assert!(score > 0.0 && score < 1.0);
    }

    #[test]
    fn test_match_cosine_tfidf_scores_categories() {
        let categories = vec![
            category(1, "Coffee", &["coffee shop"], &["blue bottle"]),
            category(2, "Pets", &["pet supplies"], &[]),
        ];
        let index = CategoryIndex::build(&categories, &Normalizer::default());

        let ctx = MatchContext::new(&index);
        let candidates = match_cosine_tfidf(&normalize("BLUE BOTTLE COFFEE"), &ctx);
        assert!(!candidates.is_empty());
        assert!(candidates.iter().all(|c| c.category_id == 1));
        assert!(candidates
            .iter()
            .all(|c| c.method == MatchMethod::CosineTfidf && c.score > 0.0 && c.score <= 1.0));

        let best = candidates
            .iter()
            .max_by(|a, b| a.score.total_cmp(&b.score))
            .unwrap();
        assert_eq!(best.matched_text, "blue bottle");
    }

    #[test]
    fn test_reused_context_scores_each_input() {
        let index = CategoryIndex::build(
            &[
                category(1, "Coffee", &["coffee"], &[]),
                category(2, "Pets", &["pet"], &[]),
            ],
            &Normalizer::default(),
        );
        let ctx = MatchContext::new(&index);

        let coffee = match_cosine_tfidf(&normalize("coffee"), &ctx);
        assert_eq!(coffee.len(), 1);
        assert_eq!(coffee[0].category_id, 1);

        let pet = match_cosine_tfidf(&normalize("pet"), &ctx);
        assert_eq!(pet.len(), 1);
        assert_eq!(pet[0].category_id, 2);
        assert_eq!(pet[0].matched_text, "pet");
        assert!((pet[0].score - 1.0).abs() < 1e-9);

        // Going back to the first input still hits the cached vector
        assert_eq!(match_cosine_tfidf(&normalize("coffee"), &ctx), coffee);
    }

    #[test]
    fn test_no_candidates_for_unseen_input() {
        let index = CategoryIndex::build(
            &[category(1, "Coffee", &["coffee"], &[])],
            &Normalizer::default(),
        );
        let ctx = MatchContext::new(&index);
        assert!(match_cosine_tfidf(&normalize("zzz qqq"), &ctx).is_empty());
    }
}
