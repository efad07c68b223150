use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::catalog_error;
use crate::api::response::{ApiError, AppQuery, JSend, JSendPaginated, Pagination};
use crate::auth::RequireAdmin;
use crate::catalog::{FileRemoval, DEFAULT_PAGE_SIZE};
use crate::storage::models::LibraryEntry;
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct EntryResponse {
    pub created_at: String,
    pub filename: String,
    pub id: String,
    pub mime: Option<String>,
    pub name: String,
    pub size: u64,
    pub tags: Vec<String>,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub file_removed: bool,
}

#[derive(Debug, Deserialize)]
pub struct ListAnimationsParams {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub search: Option<String>,
    /// Comma-separated; an entry must carry every tag
    #[serde(default)]
    pub tags: Option<String>,
}

fn default_limit() -> u32 {
    DEFAULT_PAGE_SIZE
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn list_animations(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<ListAnimationsParams>,
) -> Result<Json<JSendPaginated<EntryResponse>>, ApiError> {
    let page = state
        .catalog
        .list(
            params.search.as_deref(),
            params.tags.as_deref(),
            params.limit,
            params.offset,
        )
        .map_err(catalog_error)?;

    let items = page.items.iter().map(entry_to_response).collect();

    Ok(JSendPaginated::success(
        items,
        Pagination {
            limit: params.limit,
            offset: params.offset,
            total: page.total,
        },
    ))
}

pub async fn get_animation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JSend<EntryResponse>>, ApiError> {
    let entry = state.catalog.get(&id).map_err(catalog_error)?;
    Ok(JSend::success(entry_to_response(&entry)))
}

pub async fn delete_animation(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<Json<JSend<DeleteResponse>>, ApiError> {
    let outcome = state.catalog.delete(&id).await.map_err(catalog_error)?;

    Ok(JSend::success(DeleteResponse {
        file_removed: outcome.file == FileRemoval::Removed,
    }))
}

// ============================================================================
// Helpers
// ============================================================================

pub(super) fn entry_to_response(entry: &LibraryEntry) -> EntryResponse {
    EntryResponse {
        created_at: entry.created_at.to_rfc3339(),
        filename: entry.filename.clone(),
        id: entry.id.clone(),
        mime: entry.mime.clone(),
        name: entry.name.clone(),
        size: entry.size,
        tags: entry.tags.clone(),
        url: entry.url.clone(),
    }
}
