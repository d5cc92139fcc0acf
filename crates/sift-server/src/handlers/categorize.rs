//! Categorization handlers: single-string test, bulk preview/analyze, apply

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    Json,
};
use serde::Deserialize;
use tracing::debug;

use super::read_json;
use crate::{get_user_id, AppError, AppState, MAX_BATCH_BODY, MAX_JSON_BODY};
use sift_core::models::{
    CategorizationAnalysis, CategorizationDecision, CategorizationPreview, CategorizationTest,
    CategoryOverride, PreviewTransaction,
};
use sift_core::{parse_transactions_csv, BatchCoordinator, CategorizationSettings, CategoryIndex};

/// Request body for a single categorization test
#[derive(Debug, Deserialize)]
pub struct TestCategorizationRequest {
    pub text: String,
    pub merchant_name: Option<String>,
    /// Include the per-method breakdown
    #[serde(default)]
    pub include_stats: bool,
}

/// POST /api/categorize/test - Categorize one description
pub async fn test_categorization(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<CategorizationTest>, AppError> {
    let user_id = get_user_id(request.headers());
    let req: TestCategorizationRequest = read_json(request.into_body(), MAX_JSON_BODY).await?;

    let (settings, index) = load_context(&state, &user_id)?;
    let report = state.engine().test_categorization(
        &req.text,
        req.merchant_name.as_deref(),
        req.include_stats,
        &settings,
        &index,
    );

    state
        .db
        .log_audit(&user_id, "test", Some("categorization"), None, None)?;

    Ok(Json(report))
}

/// Request body for a bulk preview
///
/// Transactions are given either as JSON rows or as CSV text.
#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    #[serde(default)]
    pub transactions: Vec<PreviewTransaction>,
    pub csv: Option<String>,
    #[serde(default)]
    pub overwrite_existing: bool,
}

/// POST /api/categorize/preview - Suggest categories for a batch before import
pub async fn preview_categorization(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<CategorizationPreview>, AppError> {
    let user_id = get_user_id(request.headers());
    let req: PreviewRequest = read_json(request.into_body(), MAX_BATCH_BODY).await?;

    let mut transactions = req.transactions;
    if let Some(csv) = req.csv {
        transactions.extend(parse_transactions_csv(csv.as_bytes())?);
    }
    check_batch_size(&state, transactions.len())?;

    let (settings, index) = load_context(&state, &user_id)?;
    let overwrite = req.overwrite_existing;
    let preview = run_batch(Arc::clone(&state), move |batch, cancel| {
        batch.preview(&transactions, overwrite, &settings, &index, Some(cancel))
    })
    .await?;

    state.db.log_audit(
        &user_id,
        "preview",
        Some("categorization"),
        None,
        Some(&format!(
            "{} of {} transactions",
            preview.will_be_categorized, preview.total_transactions
        )),
    )?;

    Ok(Json(preview))
}

/// Request body for an analysis run
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub descriptions: Vec<String>,
}

/// POST /api/categorize/analyze - Report how well descriptions categorize
pub async fn analyze_categorization(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<CategorizationAnalysis>, AppError> {
    let user_id = get_user_id(request.headers());
    let req: AnalyzeRequest = read_json(request.into_body(), MAX_BATCH_BODY).await?;
    check_batch_size(&state, req.descriptions.len())?;

    let (settings, index) = load_context(&state, &user_id)?;
    let descriptions = req.descriptions;
    let analysis = run_batch(Arc::clone(&state), move |batch, cancel| {
        batch.analyze(&descriptions, &settings, &index, Some(cancel))
    })
    .await?;

    state.db.log_audit(
        &user_id,
        "analyze",
        Some("categorization"),
        None,
        Some(&format!(
            "{} of {} descriptions",
            analysis.successful_categorizations, analysis.total_transactions
        )),
    )?;

    Ok(Json(analysis))
}

/// Request body for applying a reviewed preview
#[derive(Debug, Deserialize)]
pub struct ApplyRequest {
    pub preview: CategorizationPreview,
    #[serde(default)]
    pub overrides: Vec<CategoryOverride>,
    /// Suggestions below this confidence are left for review
    pub auto_apply_threshold: Option<f64>,
}

/// POST /api/categorize/apply - Turn a preview plus overrides into decisions
pub async fn apply_categorization(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<Vec<CategorizationDecision>>, AppError> {
    let user_id = get_user_id(request.headers());
    let req: ApplyRequest = read_json(request.into_body(), MAX_BATCH_BODY).await?;
    check_batch_size(&state, req.preview.items.len())?;

    // Overrides and suggestions may only point at categories this user can see
    let known: HashSet<i64> = state
        .db
        .list_categories(&user_id)?
        .iter()
        .map(|c| c.id)
        .collect();
    if let Some(unknown) = req
        .overrides
        .iter()
        .filter_map(|o| o.category_id)
        .find(|id| !known.contains(id))
    {
        return Err(AppError::bad_request(&format!(
            "Unknown category id in overrides: {}",
            unknown
        )));
    }
    if let Some(unknown) = req
        .preview
        .items
        .iter()
        .filter_map(|item| item.result.as_ref().map(|r| r.category_id))
        .find(|id| !known.contains(id))
    {
        return Err(AppError::bad_request(&format!(
            "Unknown category id in preview: {}",
            unknown
        )));
    }

    let decisions =
        BatchCoordinator::apply(&req.preview, &req.overrides, req.auto_apply_threshold)?;
    let needs_review = decisions.iter().filter(|d| d.needs_review).count();

    state.db.log_audit(
        &user_id,
        "apply",
        Some("categorization"),
        None,
        Some(&format!(
            "{} decisions, {} overrides, {} need review",
            decisions.len(),
            req.overrides.len(),
            needs_review
        )),
    )?;

    Ok(Json(decisions))
}

// ========== Helpers ==========

/// The user's settings and a prepared index of their active categories
fn load_context(
    state: &AppState,
    user_id: &str,
) -> Result<(CategorizationSettings, Arc<CategoryIndex>), AppError> {
    let settings = state
        .db
        .get_settings(user_id, &state.engine_config().defaults)?;
    let categories = state.db.list_categories(user_id)?;
    let index = state
        .index_cache
        .get_or_build(&categories, state.engine().normalizer());
    Ok((settings, index))
}

fn check_batch_size(state: &AppState, len: usize) -> Result<(), AppError> {
    let max = state.engine_config().batch.max_batch_size;
    if len > max {
        return Err(AppError::bad_request(&format!(
            "Batch of {} exceeds the maximum of {} transactions",
            len, max
        )));
    }
    Ok(())
}

/// Sets the cancellation flag when the request future is dropped
struct CancelOnDrop(Arc<AtomicBool>);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

/// Run a CPU-bound batch job off the async runtime
///
/// If the client disconnects, the handler future is dropped and the job
/// stops at its next cancellation check.
async fn run_batch<T, F>(state: Arc<AppState>, job: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce(&BatchCoordinator, &AtomicBool) -> sift_core::Result<T> + Send + 'static,
{
    let cancel = Arc::new(AtomicBool::new(false));
    let _guard = CancelOnDrop(Arc::clone(&cancel));

    let result = tokio::task::spawn_blocking(move || job(&state.batch, &cancel)).await?;
    debug!("Batch job finished");

    Ok(result?)
}
