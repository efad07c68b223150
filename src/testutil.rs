//! Shared test helpers for media-library unit tests.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{AuthConfig, Config, NodeConfig, StorageConfig, UploadConfig};
use crate::byte_store::LocalByteStore;
use crate::storage::Database;
use crate::AppState;

/// Create a test AppState with a temporary database and local byte store.
pub fn test_state(temp_dir: &tempfile::TempDir) -> Arc<AppState> {
    let data_dir = temp_dir.path().join("data");
    let media_dir = temp_dir.path().join("media");
    let tmp_dir = temp_dir.path().join("tmp");

    let config = Config {
        auth: AuthConfig {
            admin_username: "admin".to_string(),
            admin_password: "s3cret".to_string(),
        },
        node: NodeConfig {
            bind_address: "127.0.0.1:0".to_string(),
            data_dir: data_dir.to_string_lossy().to_string(),
        },
        storage: StorageConfig {
            media_dir: media_dir.to_string_lossy().to_string(),
            tmp_dir: tmp_dir.to_string_lossy().to_string(),
        },
        uploads: UploadConfig {
            max_chunk_size: 1024 * 1024, // 1MB for tests
            op_timeout: Duration::from_secs(5),
            session_ttl: None,
            sweep_interval: Duration::from_secs(60),
        },
    };

    let db = Database::open(&data_dir).expect("Failed to open test database");
    let byte_store =
        LocalByteStore::new(&media_dir, &tmp_dir).expect("Failed to create test byte store");

    Arc::new(AppState::new(config, db, Arc::new(byte_store)))
}
