//! Authentication-related handlers

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::{AppError, AppState, AuthMethod, CallerIdentity};
use docsight_core::auth::{self, Session};

/// Request body for register and login
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

/// Response for the /api/auth/profile endpoint
#[derive(Serialize)]
pub struct ProfileResponse {
    /// Identity documents are stored under
    pub user: String,
    /// How the caller was authenticated
    pub auth_method: AuthMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

fn jwt_secret(state: &AppState) -> Result<&str, AppError> {
    state.config.jwt_secret.as_deref().ok_or_else(|| {
        AppError::service_unavailable("Accounts are disabled (set DOCSIGHT_JWT_SECRET)")
    })
}

/// POST /api/auth/register - Create an account and return a session token
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CredentialsRequest>,
) -> Result<Json<Session>, AppError> {
    let secret = jwt_secret(&state)?;
    let session = auth::register(&state.db, &req.email, &req.password, secret)?;

    state
        .db
        .log_activity(&session.user.email, "register", Some("user"), Some(session.user.id), None)?;

    Ok(Json(session))
}

/// POST /api/auth/login - Exchange credentials for a session token
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CredentialsRequest>,
) -> Result<Json<Session>, AppError> {
    let secret = jwt_secret(&state)?;
    let session = auth::login(&state.db, &req.email, &req.password, secret)?;

    state
        .db
        .log_activity(&session.user.email, "login", Some("user"), Some(session.user.id), None)?;

    Ok(Json(session))
}

/// GET /api/auth/profile - Get the currently authenticated caller
pub async fn profile(
    State(state): State<Arc<AppState>>,
    identity: CallerIdentity,
) -> Result<Json<ProfileResponse>, AppError> {
    let user = match identity.user_id {
        Some(id) => state.db.get_user(id)?,
        None => None,
    };

    Ok(Json(ProfileResponse {
        user: identity.owner,
        auth_method: identity.method,
        email: user.as_ref().map(|u| u.email.clone()),
        role: user.map(|u| u.role),
    }))
}
