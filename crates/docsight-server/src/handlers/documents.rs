//! Document upload and management handlers

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use crate::{AppError, AppState, CallerIdentity, SuccessResponse};
use docsight_core::ingest::ingest_bytes;
use docsight_core::models::{Document, DocumentInfo};

/// Fetch a document only if `owner` owns it
///
/// Documents belonging to someone else are reported as missing.
fn owned_document(state: &AppState, id: i64, owner: &str) -> Result<Document, AppError> {
    state
        .db
        .get_document(id)?
        .filter(|doc| doc.owner == owner)
        .ok_or_else(|| AppError::not_found(&format!("Document {} not found", id)))
}

/// POST /api/documents/upload - Store the extracted text of a document
///
/// Expects multipart form with:
/// - file: UTF-8 text (required)
/// - type: bill | feedback | revenue | review | general (optional, inferred from the filename)
pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    identity: CallerIdentity,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<DocumentInfo>), AppError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut declared_type: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(&format!("Failed to read form field: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("upload.txt").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|_| AppError::bad_request("Failed to read file data"))?;

                if bytes.len() > state.config.max_upload_bytes {
                    return Err(AppError::bad_request(&format!(
                        "File too large. Maximum size is {} MB",
                        state.config.max_upload_bytes / 1024 / 1024
                    )));
                }

                file = Some((filename, bytes.to_vec()));
            }
            "type" => {
                let value = field
                    .text()
                    .await
                    .map_err(|_| AppError::bad_request("Failed to read type"))?;
                if !value.trim().is_empty() {
                    declared_type = Some(value);
                }
            }
            _ => {}
        }
    }

    let (filename, bytes) = file.ok_or_else(|| AppError::bad_request("Missing file field"))?;
    let new_doc = ingest_bytes(&filename, &bytes, declared_type.as_deref())?;
    let id = state.db.insert_document(&identity.owner, &new_doc)?;

    state.db.log_activity(
        &identity.owner,
        "upload",
        Some("document"),
        Some(id),
        Some(&format!("filename={}, type={}", new_doc.filename, new_doc.doc_type)),
    )?;
    info!(owner = %identity.owner, id, doc_type = %new_doc.doc_type, "Document uploaded");

    let doc = owned_document(&state, id, &identity.owner)?;
    Ok((StatusCode::CREATED, Json(DocumentInfo::from(&doc))))
}

/// GET /api/documents - List the caller's documents (no content)
pub async fn list_documents(
    State(state): State<Arc<AppState>>,
    identity: CallerIdentity,
) -> Result<Json<Vec<DocumentInfo>>, AppError> {
    Ok(Json(state.db.list_documents(&identity.owner)?))
}

/// GET /api/documents/:id - Get a single document with its text
pub async fn get_document(
    State(state): State<Arc<AppState>>,
    identity: CallerIdentity,
    Path(id): Path<i64>,
) -> Result<Json<Document>, AppError> {
    Ok(Json(owned_document(&state, id, &identity.owner)?))
}

/// DELETE /api/documents/:id - Delete a document
pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    identity: CallerIdentity,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    let doc = owned_document(&state, id, &identity.owner)?;
    state.db.delete_document(id)?;

    state.db.log_activity(
        &identity.owner,
        "delete",
        Some("document"),
        Some(id),
        Some(&format!("filename={}", doc.filename)),
    )?;

    Ok(Json(SuccessResponse { success: true }))
}
