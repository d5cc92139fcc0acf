//! Bulk preview, analysis and apply
//!
//! Items are categorized independently on a bounded rayon pool and collected
//! by their original position, so batch output matches one-at-a-time
//! categorization exactly.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, info};

use crate::engine::CategorizationEngine;
use crate::error::{Error, Result};
use crate::index::CategoryIndex;
use crate::models::{
    AnalysisItem, CategorizationAnalysis, CategorizationDecision, CategorizationPreview,
    CategoryOverride, DecisionSource, MatchMethod, PreviewItem, PreviewTransaction,
};
use crate::settings::{validate_threshold, CategorizationSettings};

/// Batches up to this size run on the calling thread
const INLINE_BATCH_SIZE: usize = 32;

/// Runs the engine over many transactions
pub struct BatchCoordinator {
    engine: CategorizationEngine,
    pool: ThreadPool,
    workers: usize,
}

impl BatchCoordinator {
    pub fn new(engine: CategorizationEngine, workers: usize) -> Result<Self> {
        let workers = workers.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("sift-batch-{}", i))
            .build()
            .map_err(|e| Error::Batch(format!("Failed to start worker pool: {}", e)))?;

        Ok(Self {
            engine,
            pool,
            workers,
        })
    }

    /// Coordinator sized from the engine's `[batch]` config
    pub fn from_engine(engine: CategorizationEngine) -> Result<Self> {
        let workers = engine.config().batch.workers;
        Self::new(engine, workers)
    }

    pub fn engine(&self) -> &CategorizationEngine {
        &self.engine
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Suggest categories for a list of transactions before import
    ///
    /// A transaction that already has a category keeps it unless
    /// `overwrite_existing` is set and the engine found a match.
    pub fn preview(
        &self,
        transactions: &[PreviewTransaction],
        overwrite_existing: bool,
        settings: &CategorizationSettings,
        index: &CategoryIndex,
        cancel: Option<&AtomicBool>,
    ) -> Result<CategorizationPreview> {
        let items = self.run(transactions, cancel, |tx| {
            let result = self.engine.categorize(
                &tx.description,
                tx.merchant_name.as_deref(),
                settings,
                index,
            );
            let would_be_categorized = result.is_some()
                && (tx.category_id.is_none() || overwrite_existing);

            PreviewItem {
                description: tx.description.clone(),
                merchant_name: tx.merchant_name.clone(),
                amount: tx.amount,
                existing_category_id: tx.category_id,
                result,
                would_be_categorized,
            }
        })?;

        let total_transactions = items.len();
        let will_be_categorized = items.iter().filter(|i| i.would_be_categorized).count();
        let suggested = items.iter().filter(|i| i.result.is_some()).count();
        let already_categorized = items
            .iter()
            .filter(|i| i.existing_category_id.is_some())
            .count();

        info!(
            "Previewed {} transactions: {} to categorize, {} suggestions, {} already categorized",
            total_transactions, will_be_categorized, suggested, already_categorized
        );

        Ok(CategorizationPreview {
            total_transactions,
            will_be_categorized,
            suggested,
            already_categorized,
            success_rate: rate(suggested, total_transactions),
            overwrite_existing,
            items,
        })
    }

    /// Categorize bare descriptions and report success statistics
    pub fn analyze(
        &self,
        descriptions: &[String],
        settings: &CategorizationSettings,
        index: &CategoryIndex,
        cancel: Option<&AtomicBool>,
    ) -> Result<CategorizationAnalysis> {
        let results = self.run(descriptions, cancel, |description| {
            let result = self.engine.categorize(description, None, settings, index);
            AnalysisItem {
                description: description.clone(),
                would_be_categorized: result.is_some(),
                result,
            }
        })?;

        let mut method_stats: BTreeMap<_, usize> = MatchMethod::all()
            .iter()
            .filter(|m| settings.is_enabled(**m))
            .map(|m| (*m, 0))
            .collect();
        let mut confidence_sum = 0.0;
        let mut successful = 0;

        for result in results.iter().filter_map(|item| item.result.as_ref()) {
            successful += 1;
            confidence_sum += result.confidence;
            *method_stats.entry(result.similarity_type).or_insert(0) += 1;
        }

        let total_transactions = results.len();
        info!(
            "Analyzed {} descriptions: {} categorized",
            total_transactions, successful
        );

        Ok(CategorizationAnalysis {
            total_transactions,
            successful_categorizations: successful,
            success_rate: rate(successful, total_transactions),
            average_confidence: if successful == 0 {
                0.0
            } else {
                confidence_sum / successful as f64
            },
            method_stats,
            results,
        })
    }

    /// Turn a preview and human overrides into per-transaction decisions
    ///
    /// Overrides win, then kept existing categories, then suggestions. With
    /// `auto_apply_threshold`, weaker suggestions are left for review instead
    /// of being applied. Nothing is persisted.
    pub fn apply(
        preview: &CategorizationPreview,
        overrides: &[CategoryOverride],
        auto_apply_threshold: Option<f64>,
    ) -> Result<Vec<CategorizationDecision>> {
        if let Some(threshold) = auto_apply_threshold {
            validate_threshold(threshold)?;
        }

        let mut by_index: BTreeMap<usize, Option<i64>> = BTreeMap::new();
        for o in overrides {
            if o.index >= preview.items.len() {
                return Err(Error::InvalidData(format!(
                    "Override index {} is outside the preview ({} transactions)",
                    o.index,
                    preview.items.len()
                )));
            }
            // Later overrides for the same row replace earlier ones
            by_index.insert(o.index, o.category_id);
        }

        let decisions = preview
            .items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                decide(
                    index,
                    item,
                    by_index.get(&index).copied(),
                    preview.overwrite_existing,
                    auto_apply_threshold,
                )
            })
            .collect::<Vec<_>>();

        debug!(
            "Applied preview: {} decisions, {} need review",
            decisions.len(),
            decisions.iter().filter(|d| d.needs_review).count()
        );

        Ok(decisions)
    }

    /// Map `f` over `items` in order, stopping early once `cancel` is set
    fn run<T, R, F>(&self, items: &[T], cancel: Option<&AtomicBool>, f: F) -> Result<Vec<R>>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync,
    {
        let cancelled = || cancel.is_some_and(|flag| flag.load(Ordering::Relaxed));

        if cancelled() {
            return Err(Error::Cancelled);
        }

        if items.len() <= INLINE_BATCH_SIZE {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                if cancelled() {
                    return Err(Error::Cancelled);
                }
                out.push(f(item));
            }
            return Ok(out);
        }

        debug!("Categorizing {} items on {} workers", items.len(), self.workers);
        let results: Vec<Option<R>> = self.pool.install(|| {
            items
                .par_iter()
                .map(|item| if cancelled() { None } else { Some(f(item)) })
                .collect()
        });

        results
            .into_iter()
            .collect::<Option<Vec<R>>>()
            .ok_or(Error::Cancelled)
    }
}

fn decide(
    index: usize,
    item: &PreviewItem,
    override_category: Option<Option<i64>>,
    overwrite_existing: bool,
    auto_apply_threshold: Option<f64>,
) -> CategorizationDecision {
    let decision = |category_id, confidence_score, needs_review, source| CategorizationDecision {
        index,
        description: item.description.clone(),
        category_id,
        confidence_score,
        needs_review,
        source,
    };

    if let Some(category_id) = override_category {
        return decision(category_id, None, category_id.is_none(), DecisionSource::Override);
    }

    let suggestion = item
        .result
        .as_ref()
        .filter(|_| item.existing_category_id.is_none() || overwrite_existing);

    match (suggestion, item.existing_category_id) {
        (Some(result), existing) => {
            let confidence = Some(result.confidence);
            let below_auto = auto_apply_threshold.is_some_and(|t| result.confidence < t);
            match (below_auto, existing) {
                (false, _) => decision(
                    Some(result.category_id),
                    confidence,
                    false,
                    DecisionSource::Suggested,
                ),
                (true, Some(existing)) => {
                    decision(Some(existing), confidence, true, DecisionSource::Existing)
                }
                (true, None) => decision(None, confidence, true, DecisionSource::Unassigned),
            }
        }
        (None, Some(existing)) => decision(Some(existing), None, false, DecisionSource::Existing),
        (None, None) => decision(None, None, true, DecisionSource::Unassigned),
    }
}

fn rate(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}
