use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::animations::{entry_to_response, EntryResponse};
use super::upload_error;
use crate::api::response::{ApiError, AppJson, JSend};
use crate::auth::RequireAdmin;
use crate::uploads::StartUpload;
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize, Serialize)]
pub struct StartUploadRequest {
    pub name: String,
    pub filename: String,
    /// Client-reported size, informational only
    pub size: u64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub mime: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StartUploadResponse {
    pub upload_id: String,
}

#[derive(Debug, Serialize)]
pub struct ChunkResponse {
    pub received: u64,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn start_upload(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    AppJson(req): AppJson<StartUploadRequest>,
) -> Result<Json<JSend<StartUploadResponse>>, ApiError> {
    let session = state
        .uploads
        .start_session(StartUpload {
            name: req.name,
            filename: req.filename,
            declared_size: req.size,
            tags: req.tags,
            mime: req.mime,
        })
        .await
        .map_err(upload_error)?;

    Ok(JSend::success(StartUploadResponse {
        upload_id: session.id,
    }))
}

/// Append the raw request body to the session's part.
pub async fn upload_chunk(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Path(upload_id): Path<String>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<JSend<ChunkResponse>>, ApiError> {
    let limit = state.config.uploads.max_chunk_size;

    // Refuse oversized chunks up front when the client declares a length
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    if declared.is_some_and(|len| len > limit) {
        return Err(ApiError::payload_too_large(format!(
            "Chunk exceeds maximum size of {limit} bytes"
        )));
    }

    let data = axum::body::to_bytes(body, limit as usize)
        .await
        .map_err(|e| {
            ApiError::payload_too_large(format!(
                "Failed to read chunk (maximum {limit} bytes): {e}"
            ))
        })?;

    let received = state
        .uploads
        .append_chunk(&upload_id, data)
        .await
        .map_err(upload_error)?;

    Ok(JSend::success(ChunkResponse { received }))
}

pub async fn finish_upload(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Path(upload_id): Path<String>,
) -> Result<Json<JSend<EntryResponse>>, ApiError> {
    let entry = state
        .uploads
        .finish_session(&upload_id)
        .await
        .map_err(upload_error)?;

    Ok(JSend::success(entry_to_response(&entry)))
}
