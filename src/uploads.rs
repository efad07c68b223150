//! Chunked upload sessions: start, append chunks in order, finish into a
//! library entry.
//!
//! Appends and finishes for one session run under that session's async
//! mutex, so overlapping requests for the same upload are serialized and
//! chunks never interleave. Different sessions never contend.
//!
//! Only the wait for that mutex is bounded by the operation timeout. Once a
//! request holds it, the write (or the rename and commit of a finish) runs
//! in a spawned task that owns the lock, so neither a timeout nor a dropped
//! request can leave half a chunk behind or a renamed file without its entry.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use thiserror::Error;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, warn};

use crate::byte_store::{ByteStore, ByteStoreError};
use crate::catalog::media_url;
use crate::storage::models::{LibraryEntry, UploadSession};
use crate::storage::{Database, DatabaseError};

/// Extension used when the original filename has none we can keep.
const FALLBACK_EXTENSION: &str = "bin";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Upload session not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Upload session already completed: {0}")]
    AlreadyCompleted(String),
    #[error("Upload data missing for session: {0}")]
    MissingData(String),
    #[error("Timed out after {0:?} waiting for the upload session")]
    Timeout(Duration),
    #[error("Storage error: {0}")]
    Storage(#[from] ByteStoreError),
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error("Upload task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Parameters of a new upload, as declared by the client.
#[derive(Debug, Clone, Default)]
pub struct StartUpload {
    pub name: String,
    pub filename: String,
    pub declared_size: u64,
    pub tags: Vec<String>,
    pub mime: Option<String>,
}

/// Result of a sweep over stale sessions
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PruneStats {
    /// Unfinished sessions removed together with their parts
    pub abandoned: u64,
    /// Completed session records removed
    pub completed: u64,
    /// Sessions skipped because a request held their lock
    pub busy: u64,
}

type SessionLock = Arc<tokio::sync::Mutex<()>>;
type LockMap = Arc<Mutex<HashMap<String, SessionLock>>>;

/// A claim on one session's mutex.
///
/// While any lease for a session exists its mutex stays in the map; the
/// last lease to drop removes it.
struct SessionLease {
    locks: LockMap,
    id: String,
    lock: SessionLock,
    guard: Option<OwnedMutexGuard<()>>,
}

impl SessionLease {
    fn new(locks: &LockMap, id: &str) -> Self {
        let lock = {
            let mut map = locks.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(map.entry(id.to_string()).or_default())
        };
        Self {
            locks: Arc::clone(locks),
            id: id.to_string(),
            lock,
            guard: None,
        }
    }
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        drop(self.guard.take());

        let mut map = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        // Held by the map and this lease only
        let unused = Arc::strong_count(&self.lock) == 2
            && map.get(&self.id).is_some_and(|l| Arc::ptr_eq(l, &self.lock));
        if unused {
            map.remove(&self.id);
        }
    }
}

pub struct UploadManager {
    db: Database,
    store: Arc<dyn ByteStore>,
    locks: LockMap,
    op_timeout: Duration,
}

impl UploadManager {
    pub fn new(db: Database, store: Arc<dyn ByteStore>, op_timeout: Duration) -> Self {
        Self {
            db,
            store,
            locks: LockMap::default(),
            op_timeout,
        }
    }

    /// Create an empty part and an open session record.
    pub async fn start_session(&self, req: StartUpload) -> Result<UploadSession, UploadError> {
        let name = req.name.trim();
        let filename = req.filename.trim();
        if name.is_empty() {
            return Err(UploadError::InvalidInput("name must not be empty".into()));
        }
        if filename.is_empty() {
            return Err(UploadError::InvalidInput("filename must not be empty".into()));
        }

        let mime = req
            .mime
            .filter(|m| !m.trim().is_empty())
            .or_else(|| mime_guess::from_path(filename).first().map(|m| m.to_string()));

        let id = uuid::Uuid::new_v4().to_string();
        let session = UploadSession {
            temp_key: format!("{id}.part"),
            id,
            name: name.to_string(),
            filename: filename.to_string(),
            declared_size: req.declared_size,
            tags: normalize_tags(req.tags),
            mime,
            completed: false,
            final_path: None,
            created_at: Utc::now(),
        };

        self.store.create_part(&session.temp_key).await?;

        if let Err(e) = self.db.put_session(&session) {
            // Best-effort cleanup of the empty part
            let _ = self.store.delete_part(&session.temp_key).await;
            return Err(e.into());
        }

        debug!(
            upload_id = %session.id,
            name = %session.name,
            declared_size = session.declared_size,
            "Started upload session"
        );
        Ok(session)
    }

    /// Append one chunk to a session's part. Returns the number of bytes accepted.
    pub async fn append_chunk(&self, id: &str, data: Bytes) -> Result<u64, UploadError> {
        if self.db.get_session(id)?.is_none() {
            return Err(UploadError::NotFound(id.to_string()));
        }
        if data.is_empty() {
            return Err(UploadError::InvalidInput("empty chunk".into()));
        }

        let lease = self.lock_session(id).await?;
        let session = self.open_session(id)?;
        let received = data.len() as u64;

        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            let _lease = lease;
            match store.append_part(&session.temp_key, &data).await {
                Ok(()) => Ok(()),
                Err(ByteStoreError::NotFound(_)) => Err(UploadError::MissingData(session.id)),
                Err(e) => Err(e.into()),
            }
        })
        .await??;

        debug!(upload_id = %id, received, "Appended chunk");
        Ok(received)
    }

    /// Finalize a session into a library entry.
    ///
    /// The part is renamed into place, its real size measured, and the entry
    /// plus the session's completion are committed together. If that commit
    /// fails the rename is undone so the session can be finished again.
    pub async fn finish_session(&self, id: &str) -> Result<LibraryEntry, UploadError> {
        if self.db.get_session(id)?.is_none() {
            return Err(UploadError::NotFound(id.to_string()));
        }

        let lease = self.lock_session(id).await?;
        let session = self.open_session(id)?;

        let db = self.db.clone();
        let store = Arc::clone(&self.store);
        let entry = tokio::spawn(async move {
            let _lease = lease;
            finalize(&db, store.as_ref(), &session).await
        })
        .await??;

        info!(
            upload_id = %id,
            entry_id = %entry.id,
            filename = %entry.filename,
            size = entry.size,
            "Finished upload"
        );
        Ok(entry)
    }

    /// Remove sessions created more than `max_age` ago. Unfinished sessions
    /// lose their part as well; sessions with a request in flight are left alone.
    pub async fn prune_sessions(&self, max_age: Duration) -> Result<PruneStats, UploadError> {
        let mut stats = PruneStats::default();

        let Ok(max_age) = chrono::Duration::from_std(max_age) else {
            return Ok(stats);
        };
        let Some(cutoff) = Utc::now().checked_sub_signed(max_age) else {
            return Ok(stats);
        };

        for candidate in self.db.get_all_sessions()? {
            if candidate.created_at >= cutoff {
                continue;
            }

            let Some(_lease) = self.try_lock_session(&candidate.id) else {
                stats.busy += 1;
                continue;
            };

            // Re-read under the lock; a finish may have landed since the scan
            let Some(session) = self.db.get_session(&candidate.id)? else {
                continue;
            };

            if session.completed {
                stats.completed += 1;
            } else {
                if let Err(e) = self.store.delete_part(&session.temp_key).await {
                    warn!(upload_id = %session.id, error = %e, "Failed to delete stale upload part");
                    continue;
                }
                stats.abandoned += 1;
            }

            self.db.delete_session(&session.id)?;
        }

        if stats.abandoned + stats.completed > 0 {
            info!(
                abandoned = stats.abandoned,
                completed = stats.completed,
                busy = stats.busy,
                "Pruned upload sessions"
            );
        }
        Ok(stats)
    }

    /// Look up a session that may still accept writes.
    fn open_session(&self, id: &str) -> Result<UploadSession, UploadError> {
        let session = self
            .db
            .get_session(id)?
            .ok_or_else(|| UploadError::NotFound(id.to_string()))?;
        if session.completed {
            return Err(UploadError::AlreadyCompleted(id.to_string()));
        }
        Ok(session)
    }

    /// Wait for a session's mutex, at most `op_timeout`.
    async fn lock_session(&self, id: &str) -> Result<SessionLease, UploadError> {
        let mut lease = SessionLease::new(&self.locks, id);
        let guard = tokio::time::timeout(self.op_timeout, Arc::clone(&lease.lock).lock_owned())
            .await
            .map_err(|_| UploadError::Timeout(self.op_timeout))?;
        lease.guard = Some(guard);
        Ok(lease)
    }

    fn try_lock_session(&self, id: &str) -> Option<SessionLease> {
        let mut lease = SessionLease::new(&self.locks, id);
        lease.guard = Some(Arc::clone(&lease.lock).try_lock_owned().ok()?);
        Some(lease)
    }

    #[cfg(test)]
    fn tracked_sessions(&self) -> usize {
        self.locks.lock().map(|m| m.len()).unwrap_or_default()
    }
}

/// Rename the part into place and commit the entry. Runs to completion once
/// started; the rename is undone if the commit fails.
async fn finalize(
    db: &Database,
    store: &dyn ByteStore,
    session: &UploadSession,
) -> Result<LibraryEntry, UploadError> {
    if !store.part_exists(&session.temp_key).await? {
        return Err(UploadError::MissingData(session.id.clone()));
    }

    let filename = stored_filename(&session.id, &session.filename);
    match store.promote(&session.temp_key, &filename).await {
        Ok(()) => {}
        Err(ByteStoreError::NotFound(_)) => {
            return Err(UploadError::MissingData(session.id.clone()))
        }
        Err(e) => return Err(e.into()),
    }

    match record_completion(db, store, session, &filename).await {
        Ok(entry) => Ok(entry),
        Err(e) => {
            if let Err(undo) = store.demote(&filename, &session.temp_key).await {
                warn!(
                    upload_id = %session.id,
                    filename = %filename,
                    error = %undo,
                    "Failed to roll back finalized upload"
                );
            }
            Err(e)
        }
    }
}

async fn record_completion(
    db: &Database,
    store: &dyn ByteStore,
    session: &UploadSession,
    filename: &str,
) -> Result<LibraryEntry, UploadError> {
    let size = store.size(filename).await?;

    let entry = LibraryEntry {
        id: uuid::Uuid::new_v4().to_string(),
        name: session.name.clone(),
        filename: filename.to_string(),
        url: media_url(filename),
        size,
        tags: session.tags.clone(),
        mime: session.mime.clone(),
        created_at: Utc::now(),
    };

    let final_path = store.location(filename);
    if !db.complete_session(&session.id, &final_path, &entry)? {
        return Err(UploadError::NotFound(session.id.clone()));
    }
    Ok(entry)
}

/// `<session id>.<ext>`, keeping only a plain alphanumeric extension.
pub fn stored_filename(session_id: &str, original: &str) -> String {
    let ext = Path::new(original)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_else(|| FALLBACK_EXTENSION.to_string());

    format!("{session_id}.{ext}")
}

fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}
