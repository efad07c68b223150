use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use media_library::byte_store::{ByteStore, ByteStoreError, LocalByteStore, ObjectReader};
use media_library::catalog::{Catalog, FileRemoval};
use media_library::storage::Database;
use media_library::uploads::{StartUpload, UploadManager};

/// Local store whose deletes always fail, as on a read-only mount.
struct StuckDeleteStore {
    inner: LocalByteStore,
}

#[async_trait]
impl ByteStore for StuckDeleteStore {
    async fn create_part(&self, key: &str) -> Result<(), ByteStoreError> {
        self.inner.create_part(key).await
    }
    async fn append_part(&self, key: &str, data: &[u8]) -> Result<(), ByteStoreError> {
        self.inner.append_part(key, data).await
    }
    async fn part_exists(&self, key: &str) -> Result<bool, ByteStoreError> {
        self.inner.part_exists(key).await
    }
    async fn delete_part(&self, key: &str) -> Result<bool, ByteStoreError> {
        self.inner.delete_part(key).await
    }
    async fn promote(&self, part_key: &str, name: &str) -> Result<(), ByteStoreError> {
        self.inner.promote(part_key, name).await
    }
    async fn demote(&self, name: &str, part_key: &str) -> Result<(), ByteStoreError> {
        self.inner.demote(name, part_key).await
    }
    async fn size(&self, name: &str) -> Result<u64, ByteStoreError> {
        self.inner.size(name).await
    }
    async fn open(&self, name: &str) -> Result<ObjectReader, ByteStoreError> {
        self.inner.open(name).await
    }
    async fn delete(&self, _name: &str) -> Result<bool, ByteStoreError> {
        Err(ByteStoreError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only filesystem",
        )))
    }
    fn location(&self, name: &str) -> String {
        self.inner.location(name)
    }
}

#[tokio::test]
async fn test_delete_swallows_file_removal_failure() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("data")).unwrap();
    let store: Arc<dyn ByteStore> = Arc::new(StuckDeleteStore {
        inner: LocalByteStore::new(dir.path().join("media"), dir.path().join("tmp")).unwrap(),
    });

    let uploads = UploadManager::new(
        db.clone(),
        Arc::clone(&store),
        std::time::Duration::from_secs(5),
    );
    let catalog = Catalog::new(db, store);

    let session = uploads
        .start_session(StartUpload {
            name: "Stuck".to_string(),
            filename: "stuck.gif".to_string(),
            declared_size: 3,
            tags: Vec::new(),
            mime: None,
        })
        .await
        .unwrap();
    uploads
        .append_chunk(&session.id, Bytes::from_static(b"abc"))
        .await
        .unwrap();
    let entry = uploads.finish_session(&session.id).await.unwrap();

    let outcome = catalog.delete(&entry.id).await.unwrap();
    assert!(matches!(outcome.file, FileRemoval::Failed(_)));
    assert_eq!(outcome.entry.id, entry.id);

    // Metadata is gone even though the file is still on disk
    assert_eq!(catalog.list(None, None, 50, 0).unwrap().total, 0);
    assert!(dir.path().join("media").join(&entry.filename).exists());
}
