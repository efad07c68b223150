use redb::ReadableTable;

use super::db::{Database, DatabaseError};
use super::models::{EntryFilter, LibraryEntry};
use super::tables::*;

/// One page of a filtered listing
#[derive(Debug, Default)]
pub struct EntryPage {
    pub items: Vec<LibraryEntry>,
    /// Number of matches before pagination
    pub total: u64,
}

impl Database {
    // ========================================================================
    // Library entry operations
    // ========================================================================

    /// Get a library entry by id
    pub fn get_entry(&self, id: &str) -> Result<Option<LibraryEntry>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(ANIMATIONS)?;

        match table.get(id)? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    /// Get a library entry by stored filename (filename -> id -> entry)
    pub fn get_entry_by_filename(
        &self,
        filename: &str,
    ) -> Result<Option<LibraryEntry>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let index = read_txn.open_table(ANIMATION_FILENAMES)?;

        let id = match index.get(filename)? {
            Some(data) => data.value().to_string(),
            None => return Ok(None),
        };

        let table = read_txn.open_table(ANIMATIONS)?;
        match table.get(id.as_str())? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    /// Delete an entry and its filename index. Returns the removed entry.
    pub fn delete_entry(&self, id: &str) -> Result<Option<LibraryEntry>, DatabaseError> {
        let write_txn = self.begin_write()?;

        let existing: Option<LibraryEntry> = {
            let table = write_txn.open_table(ANIMATIONS)?;
            let result = match table.get(id)? {
                Some(data) => Some(rmp_serde::from_slice(data.value())?),
                None => None,
            };
            result
        };

        if let Some(ref entry) = existing {
            {
                let mut table = write_txn.open_table(ANIMATIONS)?;
                table.remove(id)?;
            }
            {
                let mut index = write_txn.open_table(ANIMATION_FILENAMES)?;
                index.remove(entry.filename.as_str())?;
            }
        }

        write_txn.commit()?;
        Ok(existing)
    }

    /// Get all entries in storage order
    pub fn get_all_entries(&self) -> Result<Vec<LibraryEntry>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(ANIMATIONS)?;

        let mut entries = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            entries.push(rmp_serde::from_slice(value.value())?);
        }

        Ok(entries)
    }

    /// Filter, sort newest first, then skip `offset` and take `limit`.
    pub fn query_entries(
        &self,
        filter: &EntryFilter,
        limit: usize,
        offset: usize,
    ) -> Result<EntryPage, DatabaseError> {
        let mut matched: Vec<LibraryEntry> = self
            .get_all_entries()?
            .into_iter()
            .filter(|e| filter.matches(e))
            .collect();

        matched.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });

        let total = matched.len() as u64;
        let items = matched.into_iter().skip(offset).take(limit).collect();

        Ok(EntryPage { items, total })
    }
}
