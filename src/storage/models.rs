use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An in-progress chunked upload stored in redb
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadSession {
    pub id: String,
    pub name: String,
    /// Filename as reported by the client; only its extension is kept
    pub filename: String,
    /// Client-reported size. Informational only, never trusted.
    pub declared_size: u64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub mime: Option<String>,
    /// Key of the append-only part in the byte store
    pub temp_key: String,
    pub completed: bool,
    #[serde(default)]
    pub final_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A finalized upload, listable in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryEntry {
    pub id: String,
    pub name: String,
    /// Stored filename, `<session id><ext>`
    pub filename: String,
    pub url: String,
    /// Measured from the finalized file
    pub size: u64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub mime: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Listing filter. Both criteria must hold when present.
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    /// Case-insensitive substring of the entry name
    pub search: Option<String>,
    /// Entry must carry every one of these tags
    pub tags: Vec<String>,
}

impl EntryFilter {
    pub fn matches(&self, entry: &LibraryEntry) -> bool {
        if let Some(ref search) = self.search {
            if !entry
                .name
                .to_lowercase()
                .contains(&search.to_lowercase())
            {
                return false;
            }
        }

        self.tags.iter().all(|tag| entry.tags.contains(tag))
    }
}
