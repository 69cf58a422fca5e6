//! Startup provisioning
//!
//! On boot the configured bucket either already exists, in which case its
//! contents are reported and nothing else happens, or it is created and the
//! configured managed policy gets a new default version granting access to
//! it. An existing bucket is taken as proof that an earlier run already
//! patched the policy.
//!
//! Every failure here is fatal: the caller is expected to exit rather than
//! serve traffic from a half-provisioned account.

use s3gate_iam::{bucket_arn, DocumentError, Partition, PolicyDocument, PolicyError, PolicyService};
use s3gate_s3::{ObjectSummary, StorageError};
use thiserror::Error;
use tracing::{info, warn};

use crate::clients::ClientBundle;
use crate::config::StorageSettings;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Failed to check whether bucket {bucket} exists")]
    CheckBucket {
        bucket: String,
        #[source]
        source: StorageError,
    },

    #[error("Failed to list objects in bucket {bucket}")]
    ListObjects {
        bucket: String,
        #[source]
        source: StorageError,
    },

    #[error("Failed to create bucket")]
    CreateBucket(#[source] StorageError),

    #[error("Failed to fetch policy {policy_arn}")]
    FetchPolicy {
        policy_arn: String,
        #[source]
        source: PolicyError,
    },

    #[error("Failed to fetch policy version {version_id} of {policy_arn}")]
    FetchPolicyVersion {
        policy_arn: String,
        version_id: String,
        #[source]
        source: PolicyError,
    },

    #[error("Failed to process policy document of {policy_arn}")]
    Document {
        policy_arn: String,
        #[source]
        source: DocumentError,
    },

    #[error("Failed to publish new version of policy {policy_arn}")]
    PublishVersion {
        policy_arn: String,
        #[source]
        source: PolicyError,
    },
}

/// What bootstrap should reconcile
#[derive(Debug, Clone)]
pub struct BootstrapTarget {
    pub bucket: String,
    pub region: String,
    pub policy_arn: String,
}

impl From<&StorageSettings> for BootstrapTarget {
    fn from(settings: &StorageSettings) -> Self {
        Self {
            bucket: settings.bucket_name.clone(),
            region: settings.region.clone(),
            policy_arn: settings.policy_arn.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// The bucket was already there; the policy was not touched
    ExistingBucket { objects: Vec<ObjectSummary> },
    /// The bucket was created and the policy republished
    Provisioned {
        policy_version_id: String,
        statements_updated: usize,
    },
}

/// A published policy patch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyUpdate {
    pub version_id: String,
    pub statements_updated: usize,
}

/// Reconcile bucket existence with the managed policy
pub async fn run(
    clients: &ClientBundle,
    target: &BootstrapTarget,
) -> Result<BootstrapOutcome, BootstrapError> {
    let store = clients.object_store.as_ref();

    let exists = store
        .bucket_exists(&target.bucket)
        .await
        .map_err(|source| BootstrapError::CheckBucket {
            bucket: target.bucket.clone(),
            source,
        })?;

    if exists {
        let objects = store
            .list_objects(&target.bucket)
            .await
            .map_err(|source| BootstrapError::ListObjects {
                bucket: target.bucket.clone(),
                source,
            })?;

        info!(bucket = %target.bucket, objects = objects.len(), "Bucket already exists");
        for object in &objects {
            info!(key = %object.key, size = object.size, "Bucket object");
        }
        return Ok(BootstrapOutcome::ExistingBucket { objects });
    }

    store
        .create_bucket(&target.bucket, &target.region)
        .await
        .map_err(BootstrapError::CreateBucket)?;
    info!(bucket = %target.bucket, region = %target.region, "Created bucket");

    let resource = bucket_arn(Partition::for_region(&target.region), &target.bucket);
    let update = grant_resource(clients.policy_service.as_ref(), &target.policy_arn, &resource).await?;

    Ok(BootstrapOutcome::Provisioned {
        policy_version_id: update.version_id,
        statements_updated: update.statements_updated,
    })
}

/// Add `resource_arn` to every resource list of the policy's default
/// version and publish the result as the new default version.
pub async fn grant_resource(
    policies: &dyn PolicyService,
    policy_arn: &str,
    resource_arn: &str,
) -> Result<PolicyUpdate, BootstrapError> {
    let fetch_error = |source| BootstrapError::FetchPolicy {
        policy_arn: policy_arn.to_string(),
        source,
    };

    let policy = policies.get_policy(policy_arn).await.map_err(fetch_error)?;
    let version_id = policy
        .default_version_id
        .ok_or_else(|| fetch_error(PolicyError::MissingDefaultVersion(policy_arn.to_string())))?;
    info!(
        policy_arn = %policy_arn,
        policy_name = %policy.name,
        policy_id = %policy.id,
        version_id = %version_id,
        "Checked existing policy"
    );

    let version = policies
        .get_policy_version(policy_arn, &version_id)
        .await
        .map_err(|source| BootstrapError::FetchPolicyVersion {
            policy_arn: policy_arn.to_string(),
            version_id: version_id.clone(),
            source,
        })?;
    if !version.is_default {
        warn!(policy_arn = %policy_arn, version_id = %version.version_id, "Fetched version is not marked default");
    }
    info!(policy_arn = %policy_arn, version_id = %version.version_id, "Retrieved policy version");

    let document_error = |source| BootstrapError::Document {
        policy_arn: policy_arn.to_string(),
        source,
    };

    let mut document = PolicyDocument::from_encoded(&version.document).map_err(document_error)?;
    let statements_updated = document.add_resource(resource_arn);
    if statements_updated == 0 {
        warn!(policy_arn = %policy_arn, resource = %resource_arn, "No resource list needed the bucket");
    } else {
        info!(resource = %resource_arn, statements_updated, "Added bucket to policy");
    }
    let patched = document.to_json().map_err(document_error)?;

    let new_version_id = policies
        .create_policy_version(policy_arn, &patched, true)
        .await
        .map_err(|source| BootstrapError::PublishVersion {
            policy_arn: policy_arn.to_string(),
            source,
        })?;
    info!(policy_arn = %policy_arn, version_id = %new_version_id, "Created new default policy version");

    Ok(PolicyUpdate {
        version_id: new_version_id,
        statements_updated,
    })
}
