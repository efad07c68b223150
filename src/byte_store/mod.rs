mod local;

pub use local::LocalByteStore;

use std::pin::Pin;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncRead;

#[derive(Debug, Error)]
pub enum ByteStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Object not found: {0}")]
    NotFound(String),
    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

/// Readable handle to a finalized object.
pub type ObjectReader = Pin<Box<dyn AsyncRead + Send>>;

/// Abstraction over where upload bytes live.
///
/// Two namespaces: *parts* are append-only temporary objects keyed by
/// `<session id>.part`; *objects* are finalized media keyed by their stored
/// filename. `promote` moves a part into the object namespace atomically.
#[async_trait]
pub trait ByteStore: Send + Sync {
    /// Create an empty part, truncating any leftover with the same key.
    async fn create_part(&self, key: &str) -> Result<(), ByteStoreError>;
    /// Append to an existing part. Fails with `NotFound` if the part is gone.
    async fn append_part(&self, key: &str, data: &[u8]) -> Result<(), ByteStoreError>;
    async fn part_exists(&self, key: &str) -> Result<bool, ByteStoreError>;
    /// Remove a part. Returns whether it existed.
    async fn delete_part(&self, key: &str) -> Result<bool, ByteStoreError>;

    /// Atomically rename a part to a finalized object.
    async fn promote(&self, part_key: &str, name: &str) -> Result<(), ByteStoreError>;
    /// Reverse of `promote`, used to roll back a failed finalization.
    async fn demote(&self, name: &str, part_key: &str) -> Result<(), ByteStoreError>;

    async fn size(&self, name: &str) -> Result<u64, ByteStoreError>;
    async fn open(&self, name: &str) -> Result<ObjectReader, ByteStoreError>;
    /// Remove a finalized object. Returns whether it existed.
    async fn delete(&self, name: &str) -> Result<bool, ByteStoreError>;

    /// Human-readable location of a finalized object (logged and recorded on the session).
    fn location(&self, name: &str) -> String;
}
