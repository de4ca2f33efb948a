//! Supervisor indexing and lookup routes.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;

use crate::error::ApiError;
use crate::state::AppState;
use supermatch_core::Error;
use supermatch_index::BatchReport;
use supermatch_store::Supervisor;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/supervisors", post(index_profiles))
        .route(
            "/supervisors/{id}",
            get(get_supervisor).delete(delete_supervisor),
        )
}

/// POST /api/supervisors — index one profile or an array of profiles.
async fn index_profiles(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<BatchReport>, ApiError> {
    let Json(body) = payload?;
    let profiles = match body {
        Value::Array(items) => items,
        single @ Value::Object(_) => vec![single],
        _ => {
            return Err(Error::InvalidRequest(
                "expected a profile object or an array of profiles".into(),
            )
            .into())
        }
    };
    let report = state.bounded(state.indexer.index_all(&profiles)).await?;
    Ok(Json(report))
}

/// GET /api/supervisors/{id}
async fn get_supervisor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Supervisor>, ApiError> {
    state
        .store
        .get_supervisor(&id)?
        .map(Json)
        .ok_or_else(|| Error::NotFound(format!("supervisor {}", id)).into())
}

/// DELETE /api/supervisors/{id} — embeddings cascade.
async fn delete_supervisor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.store.delete_supervisor(&id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::NotFound(format!("supervisor {}", id)).into())
    }
}
