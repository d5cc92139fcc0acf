//! HTTP request handlers

pub mod audit;
pub mod categories;
pub mod categorize;
pub mod settings;

pub use audit::*;
pub use categories::*;
pub use categorize::*;
pub use settings::*;

use axum::body::Body;
use serde::de::DeserializeOwned;

use crate::AppError;

/// Read a JSON request body of at most `limit` bytes
pub(crate) async fn read_json<T: DeserializeOwned>(body: Body, limit: usize) -> Result<T, AppError> {
    let bytes = axum::body::to_bytes(body, limit)
        .await
        .map_err(|_| AppError::bad_request("Invalid request body"))?;
    serde_json::from_slice(&bytes).map_err(|_| AppError::bad_request("Invalid JSON"))
}
