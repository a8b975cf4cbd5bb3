//! Document search handler

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::{AppError, AppState, CallerIdentity};
use docsight_core::models::SearchHit;

/// Maximum search results per request
pub const MAX_SEARCH_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    pub limit: Option<i64>,
}

/// GET /api/search?q= - Substring search over the caller's documents
pub async fn search_documents(
    State(state): State<Arc<AppState>>,
    identity: CallerIdentity,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Vec<SearchHit>>, AppError> {
    if params.q.trim().is_empty() {
        return Err(AppError::bad_request("Query parameter q must not be empty"));
    }
    let limit = params.limit.unwrap_or(20).clamp(1, MAX_SEARCH_LIMIT);

    let hits = state.db.search_documents(&identity.owner, &params.q, limit)?;
    Ok(Json(hits))
}
