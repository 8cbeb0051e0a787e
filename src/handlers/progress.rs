// src/handlers/progress.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::error::AppError;
use crate::store::gateway::PersistenceGateway;

/// GET /api/progress/{user_id}
///
/// Lifetime per-category answer tallies, fed by the answer statistics the
/// engine flushes at section boundaries.
pub async fn category_progress(
    State(gateway): State<Arc<dyn PersistenceGateway>>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let rows = gateway.category_progress(user_id).await?;
    Ok(Json(rows))
}
