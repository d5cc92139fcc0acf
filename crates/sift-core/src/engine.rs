//! Categorization engine
//!
//! Runs the enabled matchers over a prepared [`CategoryIndex`], picks a single
//! winning candidate and applies the confidence threshold. The engine holds
//! only configuration; every call is a pure function of its arguments.

use std::cmp::Ordering;

use tracing::debug;

use crate::config::EngineConfig;
use crate::index::CategoryIndex;
use crate::matchers::{run_method, MatchContext};
use crate::models::{
    CategorizationTest, Category, CategoryMatchResult, MatchCandidate, MatchMethod,
    MethodBreakdown,
};
use crate::normalize::{NormalizedText, Normalizer};
use crate::settings::CategorizationSettings;

/// Multi-method transaction categorizer
#[derive(Debug, Clone)]
pub struct CategorizationEngine {
    config: EngineConfig,
    normalizer: Normalizer,
}

impl Default for CategorizationEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl CategorizationEngine {
    pub fn new(config: EngineConfig) -> Self {
        let normalizer = Normalizer::new(&config.normalizer);
        Self { config, normalizer }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Build an index with this engine's normalizer
    pub fn index(&self, categories: &[Category]) -> CategoryIndex {
        CategoryIndex::build(categories, &self.normalizer)
    }

    /// Categorize one transaction
    ///
    /// The merchant name is used when it has any matchable text, otherwise the
    /// description. Returns `None` when nothing reaches the threshold.
    pub fn categorize(
        &self,
        description: &str,
        merchant_name: Option<&str>,
        settings: &CategorizationSettings,
        index: &CategoryIndex,
    ) -> Option<CategoryMatchResult> {
        let input = self.input_text(description, merchant_name);
        let (candidates, _) = self.collect(&input, settings, index, false);
        self.decide(&input, &candidates, settings, index)
    }

    /// Categorize against a raw category list, building the index on the spot
    pub fn categorize_with_categories(
        &self,
        description: &str,
        merchant_name: Option<&str>,
        settings: &CategorizationSettings,
        categories: &[Category],
    ) -> Option<CategoryMatchResult> {
        let index = self.index(categories);
        self.categorize(description, merchant_name, settings, &index)
    }

    /// Single-string diagnostic with an optional per-method breakdown
    pub fn test_categorization(
        &self,
        text: &str,
        merchant_name: Option<&str>,
        include_stats: bool,
        settings: &CategorizationSettings,
        index: &CategoryIndex,
    ) -> CategorizationTest {
        let input = self.input_text(text, merchant_name);
        let (candidates, stats) = self.collect(&input, settings, index, include_stats);
        let result = self.decide(&input, &candidates, settings, index);

        CategorizationTest { result, stats }
    }

    fn input_text(&self, description: &str, merchant_name: Option<&str>) -> NormalizedText {
        if let Some(merchant) = merchant_name {
            let normalized = self.normalizer.normalize(merchant);
            if !normalized.is_blank() {
                return normalized;
            }
        }
        self.normalizer.normalize(description)
    }

    /// Run enabled methods in priority order
    fn collect(
        &self,
        input: &NormalizedText,
        settings: &CategorizationSettings,
        index: &CategoryIndex,
        with_stats: bool,
    ) -> (Vec<MatchCandidate>, Option<Vec<MethodBreakdown>>) {
        let mut candidates = Vec::new();
        let mut stats = with_stats.then(Vec::new);

        if input.is_blank() || index.is_empty() {
            let breakdown = stats.map(|_| {
                enabled_methods(settings)
                    .map(|method| MethodBreakdown {
                        method,
                        candidates: 0,
                        best: None,
                    })
                    .collect()
            });
            return (candidates, breakdown);
        }

        let ctx = MatchContext::new(index).with_levenshtein_floor(self.config.levenshtein_floor);

        for method in enabled_methods(settings) {
            let found = run_method(method, input, &ctx);

            if let Some(stats) = stats.as_mut() {
                stats.push(MethodBreakdown {
                    method,
                    candidates: found.len(),
                    best: select_best(&found, index).cloned(),
                });
            }

            let perfect_keyword =
                method == MatchMethod::Keyword && found.iter().any(|c| c.score >= 1.0);
            candidates.extend(found);

            // Nothing can outrank a perfect keyword hit
            if perfect_keyword && self.config.short_circuit_on_keyword && !with_stats {
                debug!("Keyword hit for '{}', skipping similarity methods", input.raw);
                break;
            }
        }

        (candidates, stats)
    }

    fn decide(
        &self,
        input: &NormalizedText,
        candidates: &[MatchCandidate],
        settings: &CategorizationSettings,
        index: &CategoryIndex,
    ) -> Option<CategoryMatchResult> {
        let winner = select_best(candidates, index)?;
        let threshold = settings.effective_threshold(self.config.defaults.confidence_threshold);

        if winner.score < threshold {
            debug!(
                "Best match for '{}' scored {:.3} ({}), below threshold {:.3}",
                input.raw, winner.score, winner.method, threshold
            );
            return None;
        }

        let category = index.get(winner.category_id)?;
        debug!(
            "Categorized '{}' as '{}' via {} ({:.3})",
            input.raw, category.name, winner.method, winner.score
        );

        Some(CategoryMatchResult {
            category_id: winner.category_id,
            category_name: category.name.clone(),
            match_type: winner.match_type,
            matched_text: winner.matched_text.clone(),
            confidence: winner.score,
            similarity_type: winner.method,
        })
    }
}

fn enabled_methods(settings: &CategorizationSettings) -> impl Iterator<Item = MatchMethod> + '_ {
    MatchMethod::all()
        .iter()
        .copied()
        .filter(|m| settings.is_enabled(*m))
}

/// Pick the winning candidate
///
/// Highest score, then method priority, then user category over system
/// category, then lowest category id, then the earliest candidate.
pub fn select_best<'c>(
    candidates: &'c [MatchCandidate],
    index: &CategoryIndex,
) -> Option<&'c MatchCandidate> {
    // min_by keeps the first of equal elements
    candidates
        .iter()
        .min_by(|a, b| compare_candidates(a, b, index))
}

/// `Less` means `a` ranks ahead of `b`
fn compare_candidates(a: &MatchCandidate, b: &MatchCandidate, index: &CategoryIndex) -> Ordering {
    let is_system = |c: &MatchCandidate| index.get(c.category_id).is_some_and(|cat| cat.is_system);

    b.score
        .total_cmp(&a.score)
        .then_with(|| b.method.priority().cmp(&a.method.priority()))
        .then_with(|| is_system(a).cmp(&is_system(b)))
        .then_with(|| a.category_id.cmp(&b.category_id))
}
