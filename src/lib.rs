//! media-library - Backend for a media library fed by chunked uploads
//!
//! This crate provides:
//! - A chunked upload session manager (start, append chunks, finish)
//! - A catalog of finalized entries with tag and name filtering
//! - redb embedded database for session and entry records
//! - A byte store abstraction for upload parts and finalized media
//! - REST API with a single shared admin credential for mutations

pub mod api;
pub mod auth;
pub mod byte_store;
pub mod catalog;
pub mod config;
pub mod storage;
#[cfg(test)]
pub mod testutil;
pub mod uploads;

use std::sync::Arc;

use auth::AdminCredentials;
use byte_store::ByteStore;
use catalog::Catalog;
use config::Config;
use storage::Database;
use uploads::UploadManager;

/// Shared application state
pub struct AppState {
    pub admin: AdminCredentials,
    pub catalog: Catalog,
    pub config: Config,
    pub uploads: UploadManager,
}

impl AppState {
    /// Wire the components around already-opened storage collaborators.
    pub fn new(config: Config, db: Database, byte_store: Arc<dyn ByteStore>) -> Self {
        let admin = AdminCredentials::from_config(&config.auth);
        let uploads = UploadManager::new(
            db.clone(),
            Arc::clone(&byte_store),
            config.uploads.op_timeout,
        );
        let catalog = Catalog::new(db, byte_store);

        Self {
            admin,
            catalog,
            config,
            uploads,
        }
    }
}
