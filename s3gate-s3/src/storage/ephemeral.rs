//! In-memory ephemeral storage backend

use super::traits::{ObjectStore, ObjectSummary, StorageError};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use dashmap::{mapref::entry::Entry, DashMap};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::sync::Arc;
use std::time::Duration;

/// Longest expiry S3 accepts for a SigV4 presigned URL
const MAX_PRESIGN_EXPIRY: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Characters left unescaped in a key, matching S3 path encoding
const KEY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// In-memory stored object
struct InMemoryObject {
    data: Bytes,
    content_type: Option<String>,
}

/// In-memory bucket
struct InMemoryBucket {
    region: String,
    objects: DashMap<String, InMemoryObject>,
}

impl InMemoryBucket {
    fn new(region: &str) -> Self {
        Self {
            region: region.to_string(),
            objects: DashMap::new(),
        }
    }
}

/// Ephemeral (in-memory) object store
pub struct EphemeralObjectStore {
    endpoint: String,
    buckets: DashMap<String, Arc<InMemoryBucket>>,
}

impl Default for EphemeralObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EphemeralObjectStore {
    pub fn new() -> Self {
        Self::with_endpoint("http://localhost")
    }

    /// Create a store whose presigned URLs point at `endpoint`
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            buckets: DashMap::new(),
        }
    }

    /// Read back an object's bytes
    pub fn object_data(&self, bucket: &str, key: &str) -> Option<Bytes> {
        let bucket_ref = self.buckets.get(bucket)?;
        let object = bucket_ref.objects.get(key)?;
        Some(object.data.clone())
    }

    /// Content type recorded at upload
    pub fn object_content_type(&self, bucket: &str, key: &str) -> Option<String> {
        let bucket_ref = self.buckets.get(bucket)?;
        let object = bucket_ref.objects.get(key)?;
        object.content_type.clone()
    }

    /// Region a bucket was created in
    pub fn bucket_region(&self, bucket: &str) -> Option<String> {
        self.buckets.get(bucket).map(|b| b.region.clone())
    }

    fn bucket(&self, bucket: &str) -> Result<Arc<InMemoryBucket>, StorageError> {
        self.buckets
            .get(bucket)
            .map(|b| Arc::clone(b.value()))
            .ok_or_else(|| StorageError::BucketNotFound(bucket.to_string()))
    }
}

#[async_trait]
impl ObjectStore for EphemeralObjectStore {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, StorageError> {
        Ok(self.buckets.contains_key(bucket))
    }

    async fn create_bucket(&self, bucket: &str, region: &str) -> Result<(), StorageError> {
        if bucket.is_empty() {
            return Err(StorageError::CreateBucket {
                bucket: bucket.to_string(),
                region: region.to_string(),
                message: "bucket name must not be empty".to_string(),
            });
        }
        match self.buckets.entry(bucket.to_string()) {
            Entry::Occupied(_) => Err(StorageError::BucketAlreadyExists(bucket.to_string())),
            Entry::Vacant(entry) => {
                entry.insert(Arc::new(InMemoryBucket::new(region)));
                Ok(())
            }
        }
    }

    async fn list_objects(&self, bucket: &str) -> Result<Vec<ObjectSummary>, StorageError> {
        let bucket_ref = self.bucket(bucket)?;
        let mut objects: Vec<ObjectSummary> = bucket_ref
            .objects
            .iter()
            .map(|entry| ObjectSummary {
                key: entry.key().clone(),
                size: i64::try_from(entry.value().data.len()).unwrap_or(i64::MAX),
            })
            .collect();
        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: Option<String>,
    ) -> Result<(), StorageError> {
        let bucket_ref = self.bucket(bucket)?;
        bucket_ref.objects.insert(
            key.to_string(),
            InMemoryObject {
                data,
                content_type,
            },
        );
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        let bucket_ref = self.bucket(bucket)?;
        bucket_ref.objects.remove(key);
        Ok(())
    }

    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError> {
        Ok(self
            .buckets
            .get(bucket)
            .is_some_and(|b| b.objects.contains_key(key)))
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, StorageError> {
        if expires_in.is_zero() || expires_in > MAX_PRESIGN_EXPIRY {
            return Err(StorageError::InvalidExpiry(format!(
                "{}s is outside 1s..={}s",
                expires_in.as_secs(),
                MAX_PRESIGN_EXPIRY.as_secs()
            )));
        }

        Ok(format!(
            "{}/{}/{}?X-Amz-Date={}&X-Amz-Expires={}",
            self.endpoint,
            bucket,
            utf8_percent_encode(key, KEY_ENCODE_SET),
            Utc::now().format("%Y%m%dT%H%M%SZ"),
            expires_in.as_secs()
        ))
    }
}
