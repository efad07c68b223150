mod animations;
mod health;
mod media;
mod uploads;

use crate::api::response::ApiError;
use crate::catalog::CatalogError;
use crate::uploads::UploadError;

pub use animations::{delete_animation, get_animation, list_animations};
pub use health::health;
pub use media::serve_media;
pub use uploads::{finish_upload, start_upload, upload_chunk};

/// Map an UploadError to an ApiError
fn upload_error(e: UploadError) -> ApiError {
    match e {
        UploadError::NotFound(_) => ApiError::not_found("Upload session not found"),
        UploadError::InvalidInput(msg) => ApiError::bad_request(msg),
        UploadError::AlreadyCompleted(_) => ApiError::conflict("Upload already completed"),
        UploadError::MissingData(_) => ApiError::not_found("Upload data missing"),
        UploadError::Timeout(after) => ApiError::request_timeout(format!(
            "Timed out after {after:?} waiting for the upload session"
        )),
        UploadError::Storage(_) | UploadError::Database(_) | UploadError::Task(_) => {
            tracing::error!(error = %e, "Upload operation failed");
            ApiError::internal(e.to_string())
        }
    }
}

/// Map a CatalogError to an ApiError
fn catalog_error(e: CatalogError) -> ApiError {
    match e {
        CatalogError::NotFound(_) => ApiError::not_found("Not found"),
        CatalogError::InvalidInput(msg) => ApiError::bad_request(msg),
        CatalogError::Storage(_) | CatalogError::Database(_) => {
            tracing::error!(error = %e, "Catalog operation failed");
            ApiError::internal(e.to_string())
        }
    }
}
