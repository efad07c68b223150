use redb::ReadableTable;

use super::db::{Database, DatabaseError};
use super::models::{LibraryEntry, UploadSession};
use super::tables::*;

impl Database {
    // ========================================================================
    // Upload session operations
    // ========================================================================

    /// Store an upload session record
    pub fn put_session(&self, session: &UploadSession) -> Result<(), DatabaseError> {
        debug_assert!(!session.id.is_empty(), "session id must not be empty");

        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(UPLOAD_SESSIONS)?;
            let data = rmp_serde::to_vec_named(session)?;
            table.insert(session.id.as_str(), data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Get an upload session by id
    pub fn get_session(&self, id: &str) -> Result<Option<UploadSession>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(UPLOAD_SESSIONS)?;

        match table.get(id)? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    /// Get all upload sessions (for the sweeper)
    pub fn get_all_sessions(&self) -> Result<Vec<UploadSession>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(UPLOAD_SESSIONS)?;

        let mut sessions = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            sessions.push(rmp_serde::from_slice(value.value())?);
        }

        Ok(sessions)
    }

    /// Delete an upload session record
    pub fn delete_session(&self, id: &str) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;
        let deleted = {
            let mut table = write_txn.open_table(UPLOAD_SESSIONS)?;
            let removed = table.remove(id)?.is_some();
            removed
        };
        write_txn.commit()?;
        Ok(deleted)
    }

    /// Insert the library entry produced by a session and mark the session
    /// completed, in one transaction.
    ///
    /// Returns `false` without writing anything if the session no longer exists.
    pub fn complete_session(
        &self,
        session_id: &str,
        final_path: &str,
        entry: &LibraryEntry,
    ) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;

        let existing: Option<UploadSession> = {
            let table = write_txn.open_table(UPLOAD_SESSIONS)?;
            let result = match table.get(session_id)? {
                Some(data) => Some(rmp_serde::from_slice(data.value())?),
                None => None,
            };
            result
        };

        let Some(mut session) = existing else {
            write_txn.abort()?;
            return Ok(false);
        };

        let filename_taken = {
            let index = write_txn.open_table(ANIMATION_FILENAMES)?;
            let taken = index.get(entry.filename.as_str())?.is_some();
            taken
        };
        if filename_taken {
            write_txn.abort()?;
            return Err(DatabaseError::Conflict(format!(
                "stored filename '{}' is already indexed",
                entry.filename
            )));
        }

        {
            let mut entries = write_txn.open_table(ANIMATIONS)?;
            let data = rmp_serde::to_vec_named(entry)?;
            entries.insert(entry.id.as_str(), data.as_slice())?;

            let mut index = write_txn.open_table(ANIMATION_FILENAMES)?;
            index.insert(entry.filename.as_str(), entry.id.as_str())?;
        }

        session.completed = true;
        session.final_path = Some(final_path.to_string());
        {
            let mut table = write_txn.open_table(UPLOAD_SESSIONS)?;
            let data = rmp_serde::to_vec_named(&session)?;
            table.insert(session_id, data.as_slice())?;
        }

        write_txn.commit()?;
        Ok(true)
    }
}
