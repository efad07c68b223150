use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        // Animations library
        .route("/animations", get(handlers::list_animations))
        .route(
            "/animations/:id",
            get(handlers::get_animation).delete(handlers::delete_animation),
        )
        // Chunked uploads (admin)
        .route("/animations/uploads/start", post(handlers::start_upload))
        .route("/animations/uploads/:upload_id", post(handlers::upload_chunk))
        .route(
            "/animations/uploads/:upload_id/finish",
            post(handlers::finish_upload),
        )
        // Static content
        .route("/media/animations/:filename", get(handlers::serve_media));

    Router::new()
        .nest("/api", api)
        // Internal
        .route("/_internal/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
