use redb::TableDefinition;

/// Upload sessions: session id -> UploadSession (msgpack)
pub const UPLOAD_SESSIONS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("animation_uploads");

/// Library entries: entry id -> LibraryEntry (msgpack)
pub const ANIMATIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("animations");

/// Stored filename index: filename -> entry id (for /media/ route lookups)
pub const ANIMATION_FILENAMES: TableDefinition<&str, &str> =
    TableDefinition::new("animation_filenames");
