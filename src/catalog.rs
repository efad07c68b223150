//! The library catalog: filtered listing, lookup, best-effort deletion and
//! retrieval of finalized media.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::byte_store::{ByteStore, ByteStoreError, ObjectReader};
use crate::storage::models::{EntryFilter, LibraryEntry};
use crate::storage::{Database, DatabaseError, EntryPage};

/// Public route prefix under which finalized files are served
pub const MEDIA_URL_PREFIX: &str = "/api/media/animations";

pub const DEFAULT_PAGE_SIZE: u32 = 50;

pub fn media_url(filename: &str) -> String {
    format!("{MEDIA_URL_PREFIX}/{filename}")
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Storage error: {0}")]
    Storage(#[from] ByteStoreError),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// What happened to the backing file of a deleted entry.
///
/// The record is removed whatever this says.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileRemoval {
    Removed,
    AlreadyMissing,
    Failed(String),
}

#[derive(Debug)]
pub struct DeleteOutcome {
    pub entry: LibraryEntry,
    pub file: FileRemoval,
}

/// An open finalized file, ready to stream
pub struct MediaFile {
    pub content_type: String,
    pub reader: ObjectReader,
    pub size: u64,
}

pub struct Catalog {
    db: Database,
    store: Arc<dyn ByteStore>,
}

impl Catalog {
    pub fn new(db: Database, store: Arc<dyn ByteStore>) -> Self {
        Self { db, store }
    }

    /// List entries newest first. `tags` is a comma-separated all-of filter.
    pub fn list(
        &self,
        search: Option<&str>,
        tags: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> Result<EntryPage, CatalogError> {
        if limit == 0 {
            return Err(CatalogError::InvalidInput(
                "limit must be greater than 0".into(),
            ));
        }

        let filter = EntryFilter {
            search: search
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            tags: match tags {
                Some(raw) => parse_tag_filter(raw)?,
                None => Vec::new(),
            },
        };

        Ok(self
            .db
            .query_entries(&filter, limit as usize, offset as usize)?)
    }

    pub fn get(&self, id: &str) -> Result<LibraryEntry, CatalogError> {
        self.db
            .get_entry(id)?
            .ok_or_else(|| CatalogError::NotFound(format!("entry {id}")))
    }

    /// Remove an entry, then try to remove its file.
    ///
    /// A file that cannot be removed is reported in the outcome and logged,
    /// never returned as an error: stale metadata must always be removable.
    pub async fn delete(&self, id: &str) -> Result<DeleteOutcome, CatalogError> {
        let entry = self
            .db
            .delete_entry(id)?
            .ok_or_else(|| CatalogError::NotFound(format!("entry {id}")))?;

        let file = match self.store.delete(&entry.filename).await {
            Ok(true) => FileRemoval::Removed,
            Ok(false) => FileRemoval::AlreadyMissing,
            Err(e) => {
                warn!(
                    entry_id = %id,
                    filename = %entry.filename,
                    error = %e,
                    "Failed to delete media file, entry removed anyway"
                );
                FileRemoval::Failed(e.to_string())
            }
        };

        debug!(entry_id = %id, file = ?file, "Deleted entry");
        Ok(DeleteOutcome { entry, file })
    }

    /// Open a stored file by filename.
    ///
    /// The file itself decides existence: a record without a file is
    /// `NotFound`, an orphaned file is still served.
    pub async fn open_media(&self, filename: &str) -> Result<MediaFile, CatalogError> {
        let not_found = || CatalogError::NotFound(format!("file {filename}"));

        let (size, reader) = match self.open_object(filename).await {
            Ok(opened) => opened,
            Err(ByteStoreError::NotFound(_)) | Err(ByteStoreError::InvalidKey(_)) => {
                return Err(not_found())
            }
            Err(e) => return Err(e.into()),
        };

        let content_type = self
            .db
            .get_entry_by_filename(filename)?
            .and_then(|entry| entry.mime)
            .or_else(|| mime_guess::from_path(filename).first().map(|m| m.to_string()))
            .unwrap_or_else(|| "application/octet-stream".to_string());

        Ok(MediaFile {
            content_type,
            reader,
            size,
        })
    }

    async fn open_object(&self, filename: &str) -> Result<(u64, ObjectReader), ByteStoreError> {
        let reader = self.store.open(filename).await?;
        let size = self.store.size(filename).await?;
        Ok((size, reader))
    }
}

/// Split a comma-separated tag list, dropping blanks.
///
/// A filter that names no tag at all (`","`, `" "`) is malformed.
pub fn parse_tag_filter(raw: &str) -> Result<Vec<String>, CatalogError> {
    let mut tags: Vec<String> = Vec::new();
    for tag in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }

    if tags.is_empty() {
        return Err(CatalogError::InvalidInput(format!(
            "tag filter '{raw}' contains no tags"
        )));
    }
    Ok(tags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::test_state;
    use crate::uploads::StartUpload;
    use bytes::Bytes;

    async fn upload(state: &crate::AppState, name: &str, tags: &[&str]) -> LibraryEntry {
        let session = state
            .uploads
            .start_session(StartUpload {
                name: name.to_string(),
                filename: format!("{name}.gif"),
                declared_size: 4,
                tags: tags.iter().map(|t| t.to_string()).collect(),
                mime: None,
            })
            .await
            .unwrap();
        state
            .uploads
            .append_chunk(&session.id, Bytes::from_static(b"data"))
            .await
            .unwrap();
        state.uploads.finish_session(&session.id).await.unwrap()
    }

    #[test]
    fn test_parse_tag_filter() {
        assert_eq!(
            parse_tag_filter(" a, b ,,a").unwrap(),
            vec!["a".to_string(), "b".to_string()]
        );
        assert!(matches!(
            parse_tag_filter(" , "),
            Err(CatalogError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_tag_filter_requires_all_tags() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);

        let both = upload(&state, "both", &["a", "b"]).await;
        let all_three = upload(&state, "three", &["a", "b", "c"]).await;
        upload(&state, "only-a", &["a"]).await;
        upload(&state, "none", &[]).await;

        let page = state.catalog.list(None, Some("a,b"), 50, 0).unwrap();
        assert_eq!(page.total, 2);
        let ids: Vec<&str> = page.items.iter().map(|e| e.id.as_str()).collect();
        assert!(ids.contains(&both.id.as_str()));
        assert!(ids.contains(&all_three.id.as_str()));
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);

        upload(&state, "Rainbow Spiral", &[]).await;
        upload(&state, "Fire", &[]).await;

        for query in ["spiral", "SPIRAL", "bOw sP"] {
            let page = state.catalog.list(Some(query), None, 50, 0).unwrap();
            assert_eq!(page.total, 1, "query {query}");
            assert_eq!(page.items[0].name, "Rainbow Spiral");
        }

        // Blank search means no filter
        assert_eq!(state.catalog.list(Some("  "), None, 50, 0).unwrap().total, 2);
    }

    #[tokio::test]
    async fn test_list_newest_first_with_total_before_pagination() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);

        let first = upload(&state, "one", &[]).await;
        let second = upload(&state, "two", &[]).await;
        let third = upload(&state, "three", &[]).await;

        let page = state.catalog.list(None, None, 2, 0).unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].id, third.id);
        assert_eq!(page.items[1].id, second.id);

        let page = state.catalog.list(None, None, 2, 2).unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, first.id);

        let page = state.catalog.list(None, None, 2, 10).unwrap();
        assert_eq!(page.total, 3);
        assert!(page.items.is_empty());
    }

    #[tokio::test]
    async fn test_list_rejects_zero_limit() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);

        assert!(matches!(
            state.catalog.list(None, None, 0, 0),
            Err(CatalogError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_missing_entry() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);

        let err = state.catalog.delete("nope").await.unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_removes_entry_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);

        let entry = upload(&state, "gone", &[]).await;
        let path = dir.path().join("media").join(&entry.filename);
        assert!(path.exists());

        let outcome = state.catalog.delete(&entry.id).await.unwrap();
        assert_eq!(outcome.file, FileRemoval::Removed);
        assert!(!path.exists());
        assert_eq!(state.catalog.list(None, None, 50, 0).unwrap().total, 0);
        assert!(matches!(
            state.catalog.get(&entry.id),
            Err(CatalogError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_with_file_already_missing() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);

        let entry = upload(&state, "orphan", &[]).await;
        std::fs::remove_file(dir.path().join("media").join(&entry.filename)).unwrap();

        let outcome = state.catalog.delete(&entry.id).await.unwrap();
        assert_eq!(outcome.file, FileRemoval::AlreadyMissing);
        assert_eq!(state.catalog.list(None, None, 50, 0).unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_open_media_uses_entry_mime() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);

        let entry = upload(&state, "clip", &[]).await;
        let media = state.catalog.open_media(&entry.filename).await.unwrap();
        assert_eq!(media.size, 4);
        assert_eq!(media.content_type, "image/gif");
    }

    #[tokio::test]
    async fn test_open_media_missing_file_with_record() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);

        let entry = upload(&state, "vanished", &[]).await;
        std::fs::remove_file(dir.path().join("media").join(&entry.filename)).unwrap();

        assert!(state.catalog.get(&entry.id).is_ok());
        assert!(matches!(
            state.catalog.open_media(&entry.filename).await,
            Err(CatalogError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_open_media_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);

        assert!(matches!(
            state.catalog.open_media("../data/media-library.redb").await,
            Err(CatalogError::NotFound(_))
        ));
    }
}
