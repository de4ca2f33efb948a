//! Embedding cache maintenance.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;
use supermatch_core::Error;

const MILLIS_PER_DAY: i64 = 86_400_000;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/cache/prune", post(prune_cache))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PruneRequest {
    older_than_days: i64,
}

/// Cutoff timestamp for entries unused for `days` days.
pub fn prune_cutoff(days: i64) -> Result<i64, Error> {
    if days < 0 {
        return Err(Error::InvalidRequest(format!(
            "olderThanDays must not be negative, got {}",
            days
        )));
    }
    let span = days.saturating_mul(MILLIS_PER_DAY);
    Ok(chrono::Utc::now().timestamp_millis().saturating_sub(span))
}

/// POST /api/cache/prune — drop cache entries not used recently.
async fn prune_cache(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PruneRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(req) = payload?;
    let cutoff = prune_cutoff(req.older_than_days)?;
    let removed = state.store.prune_embedding_cache(cutoff)?;
    Ok(Json(serde_json::json!({
        "removed": removed,
        "remaining": state.store.count_cache_entries()?,
    })))
}
