//! Chat handlers: sessions, messages, and document-grounded answers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{AppError, AppState, CallerIdentity};
use docsight_core::chat::answer_question;
use docsight_core::models::{ChatMessage, ChatRole, ChatSession};

const DEFAULT_SESSION_TITLE: &str = "New chat";

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub message: String,
    pub session_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub reply: String,
    pub session_id: Option<i64>,
    /// True when the AI could not be reached and `reply` is a fallback
    pub degraded: bool,
}

fn owned_session(state: &AppState, id: i64, owner: &str) -> Result<ChatSession, AppError> {
    state
        .db
        .get_chat_session(id)?
        .filter(|s| s.owner == owner)
        .ok_or_else(|| AppError::not_found(&format!("Chat session {} not found", id)))
}

/// GET /api/chat/sessions - List the caller's chat sessions
pub async fn list_chat_sessions(
    State(state): State<Arc<AppState>>,
    identity: CallerIdentity,
) -> Result<Json<Vec<ChatSession>>, AppError> {
    Ok(Json(state.db.list_chat_sessions(&identity.owner)?))
}

/// POST /api/chat/sessions - Start a chat session
pub async fn create_chat_session(
    State(state): State<Arc<AppState>>,
    identity: CallerIdentity,
    Json(req): Json<CreateSessionRequest>,
) -> Result<Json<ChatSession>, AppError> {
    let title = req
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_SESSION_TITLE);

    let id = state.db.create_chat_session(&identity.owner, title)?;
    let session = owned_session(&state, id, &identity.owner)?;
    Ok(Json(session))
}

/// GET /api/chat/sessions/:id/messages - Conversation history, oldest first
pub async fn list_chat_messages(
    State(state): State<Arc<AppState>>,
    identity: CallerIdentity,
    Path(id): Path<i64>,
) -> Result<Json<Vec<ChatMessage>>, AppError> {
    owned_session(&state, id, &identity.owner)?;
    Ok(Json(state.db.list_chat_messages(id)?))
}

/// POST /api/chat/send - Ask a question about the caller's documents
///
/// Both sides of the exchange are stored when a session is given.
pub async fn send_chat_message(
    State(state): State<Arc<AppState>>,
    identity: CallerIdentity,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, AppError> {
    if let Some(id) = req.session_id {
        owned_session(&state, id, &identity.owner)?;
    }

    let answer = answer_question(
        &state.db,
        state.ai.as_ref(),
        &identity.owner,
        &req.message,
        state.analytics.retry_policy(),
        state.analytics.chat_context_chars,
    )
    .await?;

    if let Some(id) = req.session_id {
        state.db.add_chat_message(id, ChatRole::User, req.message.trim())?;
        state.db.add_chat_message(id, ChatRole::Assistant, &answer.reply)?;
    }

    state.db.log_activity(
        &identity.owner,
        "chat",
        Some("chat_session"),
        req.session_id,
        answer.degraded.then_some("degraded"),
    )?;

    Ok(Json(SendMessageResponse {
        reply: answer.reply,
        session_id: req.session_id,
        degraded: answer.degraded,
    }))
}
