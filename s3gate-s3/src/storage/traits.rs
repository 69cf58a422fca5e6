//! Storage backend traits

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use thiserror::Error;

/// Errors from storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Bucket not found: {0}")]
    BucketNotFound(String),

    #[error("Bucket already exists: {0}")]
    BucketAlreadyExists(String),

    #[error("Couldn't create bucket {bucket} in region {region}: {message}")]
    CreateBucket {
        bucket: String,
        region: String,
        message: String,
    },

    #[error("Invalid presign expiry: {0}")]
    InvalidExpiry(String),

    #[error("{operation} failed for {resource}: {message}")]
    Provider {
        operation: &'static str,
        resource: String,
        message: String,
    },
}

impl StorageError {
    pub fn provider(
        operation: &'static str,
        resource: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Provider {
            operation,
            resource: resource.into(),
            message: message.into(),
        }
    }
}

/// Summary of an object in a listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    pub key: String,
    pub size: i64,
}

/// Abstract object storage backend
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Check if a bucket exists. An absent bucket is `Ok(false)`.
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, StorageError>;

    /// Create a bucket in the given region
    async fn create_bucket(&self, bucket: &str, region: &str) -> Result<(), StorageError>;

    /// List the first page of objects in a bucket
    async fn list_objects(&self, bucket: &str) -> Result<Vec<ObjectSummary>, StorageError>;

    /// Put an object, replacing any existing object under the same key
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: Option<String>,
    ) -> Result<(), StorageError>;

    /// Delete an object. Deleting a missing key succeeds.
    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StorageError>;

    /// Check if an object exists. A missing key is `Ok(false)`.
    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError>;

    /// Generate a presigned GET URL valid for `expires_in`
    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, StorageError>;
}
