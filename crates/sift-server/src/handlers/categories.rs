//! Category handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    Json,
};
use serde::Deserialize;

use super::read_json;
use crate::{get_user_id, AppError, AppState, SuccessResponse, MAX_JSON_BODY};
use sift_core::models::{Category, CategoryUpdate, NewCategory};

/// Query parameters for listing categories
#[derive(Debug, Deserialize)]
pub struct CategoryListQuery {
    /// Include deactivated categories
    #[serde(default)]
    pub include_inactive: bool,
}

/// GET /api/categories - List the user's and system categories
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CategoryListQuery>,
    request: Request,
) -> Result<Json<Vec<Category>>, AppError> {
    let user_id = get_user_id(request.headers());

    let categories = if params.include_inactive {
        state.db.list_all_categories(&user_id)?
    } else {
        state.db.list_categories(&user_id)?
    };

    state
        .db
        .log_audit(&user_id, "list", Some("category"), None, None)?;

    Ok(Json(categories))
}

/// GET /api/categories/:id - Get a specific category
pub async fn get_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<Category>, AppError> {
    let user_id = get_user_id(request.headers());

    let category = state
        .db
        .get_category(&user_id, id)?
        .ok_or_else(|| AppError::not_found("Category not found"))?;

    state
        .db
        .log_audit(&user_id, "view", Some("category"), Some(id), None)?;

    Ok(Json(category))
}

/// POST /api/categories - Create a user category
pub async fn create_category(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<Category>, AppError> {
    let user_id = get_user_id(request.headers());
    let req: NewCategory = read_json(request.into_body(), MAX_JSON_BODY).await?;

    let category = state.db.create_category(&user_id, &req)?;

    state.db.log_audit(
        &user_id,
        "create",
        Some("category"),
        Some(category.id),
        Some(&category.name),
    )?;

    Ok(Json(category))
}

/// PATCH /api/categories/:id - Update a user category
pub async fn update_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<Category>, AppError> {
    let user_id = get_user_id(request.headers());
    let req: CategoryUpdate = read_json(request.into_body(), MAX_JSON_BODY).await?;

    let category = state.db.update_category(&user_id, id, &req)?;

    state
        .db
        .log_audit(&user_id, "update", Some("category"), Some(id), None)?;

    Ok(Json(category))
}

/// DELETE /api/categories/:id - Delete a user category
pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<SuccessResponse>, AppError> {
    let user_id = get_user_id(request.headers());

    state.db.delete_category(&user_id, id)?;

    state
        .db
        .log_audit(&user_id, "delete", Some("category"), Some(id), None)?;

    Ok(Json(SuccessResponse { success: true }))
}
