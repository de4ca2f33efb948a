//! Supervisor search routes.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;
use supermatch_resolve::{resolve_limit, InterestMatches, SearchQuery, SearchResponse};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/search", post(search))
        .route("/search/interests", post(search_interests))
}

/// POST /api/search — multi-criteria search.
async fn search(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SearchQuery>, JsonRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let Json(query) = payload?;
    let response = state.bounded(state.searcher.search(&query)).await?;
    Ok(Json(response))
}

#[derive(Deserialize)]
struct InterestQuery {
    text: String,
    #[serde(default)]
    limit: Option<i64>,
}

/// POST /api/search/interests — rank individual research interests.
async fn search_interests(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<InterestQuery>, JsonRejection>,
) -> Result<Json<InterestMatches>, ApiError> {
    let Json(query) = payload?;
    let limit = resolve_limit(query.limit)?;
    let matches = state
        .bounded(state.searcher.interest_matches(&query.text, limit))
        .await?;
    Ok(Json(matches))
}
