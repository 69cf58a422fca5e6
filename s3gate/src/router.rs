//! HTTP router for s3gate

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::handlers::{self, AppState};

/// Read and write deadline for a whole request
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Headroom above the file limit for multipart boundaries and part headers
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.max_upload_size + MULTIPART_OVERHEAD;
    let shared_state = Arc::new(state);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/upload", post(handlers::upload))
        .route("/aws_upload", post(handlers::upload))
        .route("/presigned-url", post(handlers::presigned_url))
        .route("/delete-object", delete(handlers::delete_object))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .with_state(shared_state)
}
