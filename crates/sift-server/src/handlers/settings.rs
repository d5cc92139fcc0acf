//! Categorization settings handlers

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    Json,
};

use super::read_json;
use crate::{get_user_id, AppError, AppState, MAX_JSON_BODY};
use sift_core::{CategorizationSettings, SettingsUpdate};

/// GET /api/categorize/settings - Current settings (defaults if never saved)
pub async fn get_settings(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<CategorizationSettings>, AppError> {
    let user_id = get_user_id(request.headers());

    let settings = state
        .db
        .get_settings(&user_id, &state.engine_config().defaults)?;

    state
        .db
        .log_audit(&user_id, "view", Some("settings"), None, None)?;

    Ok(Json(settings))
}

/// PUT /api/categorize/settings - Validate and store a settings update
///
/// Invalid thresholds or unknown method names return 400 and leave the
/// stored settings untouched.
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<CategorizationSettings>, AppError> {
    let user_id = get_user_id(request.headers());
    let req: SettingsUpdate = read_json(request.into_body(), MAX_JSON_BODY).await?;

    let settings = state
        .db
        .update_settings(&user_id, &req, &state.engine_config().defaults)?;

    let methods: Vec<&str> = settings.enabled_methods.iter().map(|m| m.as_str()).collect();
    state.db.log_audit(
        &user_id,
        "update",
        Some("settings"),
        None,
        Some(&format!(
            "threshold={} methods={}",
            settings.confidence_threshold,
            methods.join(",")
        )),
    )?;

    Ok(Json(settings))
}
