//! Amazon S3 backend built on the AWS SDK

use super::traits::{ObjectStore, ObjectSummary, StorageError};
use async_trait::async_trait;
use aws_sdk_s3::{
    error::DisplayErrorContext,
    presigning::PresigningConfig,
    primitives::ByteStream,
    types::{BucketLocationConstraint, CreateBucketConfiguration},
    Client,
};
use bytes::Bytes;
use std::time::Duration;
use tracing::debug;

/// The one region where S3 rejects an explicit location constraint
const DEFAULT_REGION: &str = "us-east-1";

/// S3 backend. Presigning goes through the same client.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, StorageError> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(err) => {
                let err = err.into_service_error();
                if err.is_not_found() {
                    debug!(bucket = %bucket, "Bucket not found");
                    Ok(false)
                } else {
                    Err(StorageError::provider(
                        "HeadBucket",
                        bucket,
                        DisplayErrorContext(&err).to_string(),
                    ))
                }
            }
        }
    }

    async fn create_bucket(&self, bucket: &str, region: &str) -> Result<(), StorageError> {
        let mut request = self.client.create_bucket().bucket(bucket);
        if region != DEFAULT_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(region))
                    .build(),
            );
        }

        request
            .send()
            .await
            .map_err(|err| StorageError::CreateBucket {
                bucket: bucket.to_string(),
                region: region.to_string(),
                message: DisplayErrorContext(&err).to_string(),
            })?;
        Ok(())
    }

    async fn list_objects(&self, bucket: &str) -> Result<Vec<ObjectSummary>, StorageError> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .send()
            .await
            .map_err(|err| {
                StorageError::provider(
                    "ListObjectsV2",
                    bucket,
                    DisplayErrorContext(&err).to_string(),
                )
            })?;

        Ok(output
            .contents()
            .iter()
            .map(|object| ObjectSummary {
                key: object.key().unwrap_or_default().to_string(),
                size: object.size().unwrap_or_default(),
            })
            .collect())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: Option<String>,
    ) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .set_content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|err| {
                StorageError::provider(
                    "PutObject",
                    format!("{bucket}/{key}"),
                    DisplayErrorContext(&err).to_string(),
                )
            })?;
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| {
                StorageError::provider(
                    "DeleteObject",
                    format!("{bucket}/{key}"),
                    DisplayErrorContext(&err).to_string(),
                )
            })?;
        Ok(())
    }

    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError> {
        match self.client.head_object().bucket(bucket).key(key).send().await {
            Ok(_) => Ok(true),
            Err(err) => {
                let err = err.into_service_error();
                if err.is_not_found() {
                    Ok(false)
                } else {
                    Err(StorageError::provider(
                        "HeadObject",
                        format!("{bucket}/{key}"),
                        DisplayErrorContext(&err).to_string(),
                    ))
                }
            }
        }
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, StorageError> {
        let presigning = PresigningConfig::expires_in(expires_in)
            .map_err(|err| StorageError::InvalidExpiry(err.to_string()))?;

        let request = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|err| {
                StorageError::provider(
                    "PresignGetObject",
                    format!("{bucket}/{key}"),
                    DisplayErrorContext(&err).to_string(),
                )
            })?;

        Ok(request.uri().to_string())
    }
}
