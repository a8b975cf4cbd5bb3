//! Analytics handlers

use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use chrono::Utc;

use crate::{AppError, AppState, CallerIdentity};
use docsight_core::analytics::{SummaryAssembler, SummaryResponse};
use docsight_core::models::DocumentUsage;

/// GET /api/analytics/summary - KPIs plus AI insights for the caller's documents
///
/// Responds 200 with a degraded payload when the AI is unreachable, 500 with
/// the raw text when it answered unusably, and 503 when no AI is configured.
pub async fn get_summary(
    State(state): State<Arc<AppState>>,
    identity: Option<Extension<CallerIdentity>>,
) -> Result<Json<SummaryResponse>, AppError> {
    let owner = identity.as_ref().map(|Extension(id)| id.owner.as_str());

    let outcome = SummaryAssembler::new(&state.db, state.ai.as_ref())
        .with_policy(state.analytics.retry_policy())
        .summarize(owner, Utc::now())
        .await?;

    if let Some(owner) = owner {
        let details = if outcome.is_degraded() { "degraded" } else { "complete" };
        state
            .db
            .log_activity(owner, "summary", Some("analytics"), None, Some(details))?;
    }

    Ok(Json(outcome.into_response()))
}

/// GET /api/analytics/usage - Document counts and sizes by type
pub async fn get_usage(
    State(state): State<Arc<AppState>>,
    identity: CallerIdentity,
) -> Result<Json<DocumentUsage>, AppError> {
    Ok(Json(state.db.document_usage(&identity.owner)?))
}
