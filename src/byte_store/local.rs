use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use super::{ByteStore, ByteStoreError, ObjectReader};

/// Local filesystem byte store.
///
/// Parts and objects live in two directories that must be on the same
/// filesystem, otherwise `promote` cannot be a rename.
pub struct LocalByteStore {
    media_dir: PathBuf,
    tmp_dir: PathBuf,
}

impl LocalByteStore {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(
        media_dir: P,
        tmp_dir: Q,
    ) -> Result<Self, std::io::Error> {
        let media_dir = media_dir.as_ref().to_path_buf();
        let tmp_dir = tmp_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&media_dir)?;
        std::fs::create_dir_all(&tmp_dir)?;
        Ok(Self { media_dir, tmp_dir })
    }

    fn part_path(&self, key: &str) -> Result<PathBuf, ByteStoreError> {
        Ok(self.tmp_dir.join(checked_key(key)?))
    }

    fn object_path(&self, name: &str) -> Result<PathBuf, ByteStoreError> {
        Ok(self.media_dir.join(checked_key(name)?))
    }
}

/// Keys are single path components. Anything that could escape the base
/// directory is rejected.
fn checked_key(key: &str) -> Result<&str, ByteStoreError> {
    if key.is_empty()
        || key == "."
        || key.contains("..")
        || key.contains('/')
        || key.contains('\\')
        || key.contains('\0')
    {
        return Err(ByteStoreError::InvalidKey(key.to_string()));
    }
    Ok(key)
}

fn not_found_as(key: &str, e: std::io::Error) -> ByteStoreError {
    if e.kind() == ErrorKind::NotFound {
        ByteStoreError::NotFound(key.to_string())
    } else {
        ByteStoreError::Io(e)
    }
}

async fn remove_if_present(path: &Path) -> Result<bool, ByteStoreError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl ByteStore for LocalByteStore {
    async fn create_part(&self, key: &str) -> Result<(), ByteStoreError> {
        let path = self.part_path(key)?;
        tokio::fs::File::create(&path).await?;
        Ok(())
    }

    async fn append_part(&self, key: &str, data: &[u8]) -> Result<(), ByteStoreError> {
        let path = self.part_path(key)?;
        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .await
            .map_err(|e| not_found_as(key, e))?;
        file.write_all(data).await?;
        file.flush().await?;
        Ok(())
    }

    async fn part_exists(&self, key: &str) -> Result<bool, ByteStoreError> {
        let path = self.part_path(key)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }

    async fn delete_part(&self, key: &str) -> Result<bool, ByteStoreError> {
        let path = self.part_path(key)?;
        remove_if_present(&path).await
    }

    async fn promote(&self, part_key: &str, name: &str) -> Result<(), ByteStoreError> {
        let from = self.part_path(part_key)?;
        let to = self.object_path(name)?;
        tokio::fs::rename(&from, &to)
            .await
            .map_err(|e| not_found_as(part_key, e))
    }

    async fn demote(&self, name: &str, part_key: &str) -> Result<(), ByteStoreError> {
        let from = self.object_path(name)?;
        let to = self.part_path(part_key)?;
        tokio::fs::rename(&from, &to)
            .await
            .map_err(|e| not_found_as(name, e))
    }

    async fn size(&self, name: &str) -> Result<u64, ByteStoreError> {
        let path = self.object_path(name)?;
        let meta = tokio::fs::metadata(&path)
            .await
            .map_err(|e| not_found_as(name, e))?;
        Ok(meta.len())
    }

    async fn open(&self, name: &str) -> Result<ObjectReader, ByteStoreError> {
        let path = self.object_path(name)?;
        let file = tokio::fs::File::open(&path)
            .await
            .map_err(|e| not_found_as(name, e))?;
        Ok(Box::pin(file))
    }

    async fn delete(&self, name: &str) -> Result<bool, ByteStoreError> {
        let path = self.object_path(name)?;
        remove_if_present(&path).await
    }

    fn location(&self, name: &str) -> String {
        self.media_dir.join(name).to_string_lossy().to_string()
    }
}
