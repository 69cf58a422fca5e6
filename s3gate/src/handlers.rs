//! HTTP request handlers

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use bytes::{Bytes, BytesMut};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::clients::ClientBundle;
use crate::error::ApiError;

/// Largest accepted file, in bytes
pub const MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

/// How long a presigned URL stays valid
pub const PRESIGN_TTL: Duration = Duration::from_secs(15 * 60);

/// Multipart form field carrying the upload
pub const FILE_FIELD: &str = "file";

/// Shared state for handlers
pub struct AppState {
    pub clients: ClientBundle,
    pub bucket: String,
    /// Key used by the presign and delete endpoints
    pub object_key: String,
    pub presign_ttl: Duration,
    pub max_upload_size: usize,
}

impl AppState {
    pub fn new(clients: ClientBundle, bucket: impl Into<String>, object_key: impl Into<String>) -> Self {
        Self {
            clients,
            bucket: bucket.into(),
            object_key: object_key.into(),
            presign_ttl: PRESIGN_TTL,
            max_upload_size: MAX_UPLOAD_SIZE,
        }
    }

    pub fn with_max_upload_size(mut self, max_upload_size: usize) -> Self {
        self.max_upload_size = max_upload_size;
        self
    }
}

struct FileUpload {
    filename: String,
    content_type: Option<String>,
    data: Bytes,
}

pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "running" })))
}

/// Store the form's `file` field under its filename
pub async fn upload(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<&'static str, ApiError> {
    let mut multipart = multipart.map_err(|rejection| {
        warn!(error = %rejection, "Rejected upload body");
        ApiError::InvalidForm
    })?;

    let file = read_file_field(&mut multipart, state.max_upload_size).await?;
    let size = file.data.len();

    state
        .clients
        .object_store
        .put_object(&state.bucket, &file.filename, file.data, file.content_type)
        .await
        .map_err(ApiError::Upload)?;

    info!(bucket = %state.bucket, key = %file.filename, size, "File uploaded successfully");
    Ok("file uploaded successfully")
}

/// Presign a GET for the configured object key
pub async fn presigned_url(State(state): State<Arc<AppState>>) -> Result<String, ApiError> {
    let url = state
        .clients
        .object_store
        .presign_get(&state.bucket, &state.object_key, state.presign_ttl)
        .await
        .map_err(ApiError::Presign)?;

    info!(bucket = %state.bucket, key = %state.object_key, "Generated presigned URL");
    Ok(url)
}

/// Delete the configured object key.
///
/// The existence probe afterwards is informational; its outcome never
/// changes the response once the delete itself succeeded.
pub async fn delete_object(State(state): State<Arc<AppState>>) -> Result<&'static str, ApiError> {
    let store = &state.clients.object_store;

    store
        .delete_object(&state.bucket, &state.object_key)
        .await
        .map_err(ApiError::Delete)?;

    match store.object_exists(&state.bucket, &state.object_key).await {
        Ok(false) => info!(bucket = %state.bucket, key = %state.object_key, "Object deleted"),
        Ok(true) => warn!(bucket = %state.bucket, key = %state.object_key, "Object still visible after delete"),
        Err(err) => warn!(error = %err, key = %state.object_key, "Post-delete existence check failed"),
    }

    Ok("object deleted")
}

async fn read_file_field(multipart: &mut Multipart, max_size: usize) -> Result<FileUpload, ApiError> {
    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field
            .file_name()
            .and_then(base_name)
            .ok_or(ApiError::InvalidFile)?;
        let content_type = field.content_type().map(String::from);

        let mut data = BytesMut::new();
        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            if data.len() + chunk.len() > max_size {
                return Err(ApiError::FileTooLarge);
            }
            data.extend_from_slice(&chunk);
        }

        return Ok(FileUpload {
            filename,
            content_type,
            data: data.freeze(),
        });
    }

    Err(ApiError::InvalidFile)
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::FileTooLarge
    } else {
        warn!(error = %err, "Malformed multipart body");
        ApiError::InvalidForm
    }
}

/// Last path component of a client-supplied filename
fn base_name(filename: &str) -> Option<String> {
    let name = filename.rsplit(|c: char| c == '/' || c == '\\').next()?.trim();
    match name {
        "" | "." | ".." => None,
        name => Some(name.to_string()),
    }
}
