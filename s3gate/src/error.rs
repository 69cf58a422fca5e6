//! Request-time errors

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use s3gate_s3::StorageError;
use std::error::Error as _;
use thiserror::Error;
use tracing::warn;

/// Every variant maps to 400 with its message as a plain-text body.
/// Provider failures are not told apart from bad input.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("file too large")]
    FileTooLarge,

    #[error("invalid file")]
    InvalidFile,

    #[error("invalid multipart form")]
    InvalidForm,

    #[error("error uploading file")]
    Upload(#[source] StorageError),

    #[error("error creating presigned url")]
    Presign(#[source] StorageError),

    #[error("error deleting object")]
    Delete(#[source] StorageError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.source() {
            Some(source) => warn!(error = %source, "{}", self),
            None => warn!("{}", self),
        }
        (self.status(), self.to_string()).into_response()
    }
}
