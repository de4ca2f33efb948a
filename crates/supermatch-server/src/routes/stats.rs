//! Stats and health routes.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stats", get(get_stats))
        .route("/health", get(get_health))
}

/// GET /api/stats — storage statistics.
async fn get_stats(State(state): State<Arc<AppState>>) -> Result<Json<serde_json::Value>, ApiError> {
    let stats = state.store.get_stats()?;
    Ok(Json(serde_json::json!({
        "supervisors": stats.supervisors,
        "fieldEmbeddings": stats.field_embeddings,
        "interestEmbeddings": stats.interest_embeddings,
        "cacheEntries": stats.cache_entries,
        "embeddingDimension": stats.embedding_dimension,
        "embeddingModel": state.config.embedding.model,
        "dbSizeMb": stats.db_size_mb,
    })))
}

/// GET /api/health
async fn get_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "supermatch",
    }))
}
