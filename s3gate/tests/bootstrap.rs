//! Bootstrap scenarios against the in-memory backends

use async_trait::async_trait;
use bytes::Bytes;
use s3gate::{bootstrap, BootstrapError, BootstrapOutcome, BootstrapTarget, ClientBundle};
use s3gate_iam::{EphemeralPolicyService, PolicyDocument, PolicyError, PolicyService};
use s3gate_s3::{EphemeralObjectStore, ObjectStore, ObjectSummary, StorageError};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

const POLICY_ARN: &str = "arn:aws:iam::123:policy/X";
const POLICY: &str = r#"{"Version":"2012-10-17","Statement":[{"Effect":"Allow","Action":["s3:GetObject","s3:PutObject"],"Resource":["arn:aws:s3:::other-bucket"]}]}"#;

struct Harness {
    store: Arc<EphemeralObjectStore>,
    policies: Arc<EphemeralPolicyService>,
    clients: ClientBundle,
}

impl Harness {
    fn new() -> Self {
        let store = Arc::new(EphemeralObjectStore::new());
        let policies = Arc::new(EphemeralPolicyService::new());
        let clients = ClientBundle::new(store.clone(), policies.clone());
        Self {
            store,
            policies,
            clients,
        }
    }

    fn with_policy(document: &str) -> Self {
        let harness = Self::new();
        harness.policies.insert_policy(POLICY_ARN, document).unwrap();
        harness
    }

    fn default_document(&self) -> Value {
        serde_json::from_str(&self.policies.default_document(POLICY_ARN).unwrap()).unwrap()
    }
}

fn target(bucket: &str, region: &str) -> BootstrapTarget {
    BootstrapTarget {
        bucket: bucket.to_string(),
        region: region.to_string(),
        policy_arn: POLICY_ARN.to_string(),
    }
}

#[tokio::test]
async fn test_new_bucket_is_created_and_granted() {
    let h = Harness::with_policy(POLICY);

    let outcome = bootstrap::run(&h.clients, &target("data-bucket", "eu-west-1"))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        BootstrapOutcome::Provisioned {
            policy_version_id: "v2".to_string(),
            statements_updated: 1,
        }
    );
    assert!(h.store.bucket_exists("data-bucket").await.unwrap());
    assert_eq!(
        h.default_document()["Statement"][0]["Resource"],
        json!(["arn:aws:s3:::other-bucket", "arn:aws:s3:::data-bucket"])
    );
    // Actions and version survive the round trip
    assert_eq!(
        h.default_document()["Statement"][0]["Action"],
        json!(["s3:GetObject", "s3:PutObject"])
    );
    assert_eq!(h.default_document()["Version"], json!("2012-10-17"));
    assert_eq!(h.policies.version_count(POLICY_ARN), 2);
}

#[tokio::test]
async fn test_second_run_skips_policy() {
    let h = Harness::with_policy(POLICY);
    let target = target("data-bucket", "eu-west-1");

    bootstrap::run(&h.clients, &target).await.unwrap();
    let document_after_first = h.default_document();

    let outcome = bootstrap::run(&h.clients, &target).await.unwrap();

    assert_eq!(outcome, BootstrapOutcome::ExistingBucket { objects: vec![] });
    assert_eq!(h.policies.version_count(POLICY_ARN), 2);
    assert_eq!(h.default_document(), document_after_first);
}

#[tokio::test]
async fn test_existing_bucket_reports_contents() {
    let h = Harness::with_policy(POLICY);
    h.store.create_bucket("data-bucket", "eu-west-1").await.unwrap();
    h.store
        .put_object("data-bucket", "report.csv", Bytes::from("a,b\n1,2\n"), None)
        .await
        .unwrap();

    let outcome = bootstrap::run(&h.clients, &target("data-bucket", "eu-west-1"))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        BootstrapOutcome::ExistingBucket {
            objects: vec![ObjectSummary {
                key: "report.csv".to_string(),
                size: 8,
            }],
        }
    );
    assert_eq!(h.policies.version_count(POLICY_ARN), 1);
}

#[tokio::test]
async fn test_policy_without_resource_lists_is_republished_unchanged() {
    let document = json!({
        "Version": "2012-10-17",
        "Statement": [{"Effect": "Allow", "Action": "s3:ListAllMyBuckets", "NotResource": "arn:aws:s3:::x"}]
    });
    let h = Harness::with_policy(&document.to_string());

    let outcome = bootstrap::run(&h.clients, &target("data-bucket", "eu-west-1"))
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        BootstrapOutcome::Provisioned { statements_updated: 0, .. }
    ));
    assert_eq!(h.default_document(), document);
}

#[tokio::test]
async fn test_partition_follows_region() {
    let h = Harness::with_policy(POLICY);

    bootstrap::run(&h.clients, &target("cn-bucket", "cn-north-1"))
        .await
        .unwrap();

    assert_eq!(
        h.default_document()["Statement"][0]["Resource"][1],
        json!("arn:aws-cn:s3:::cn-bucket")
    );
}

#[tokio::test]
async fn test_missing_policy_is_fatal() {
    let h = Harness::new();

    let err = bootstrap::run(&h.clients, &target("data-bucket", "eu-west-1"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        BootstrapError::FetchPolicy {
            source: PolicyError::NoSuchPolicy(_),
            ..
        }
    ));
    // No rollback: the bucket stays and the next run takes the existing-bucket path
    assert!(h.store.bucket_exists("data-bucket").await.unwrap());
}

#[tokio::test]
async fn test_malformed_document_is_fatal() {
    let h = Harness::with_policy("[\"not\", \"an\", \"object\"]");

    let err = bootstrap::run(&h.clients, &target("data-bucket", "eu-west-1"))
        .await
        .unwrap_err();

    assert!(matches!(err, BootstrapError::Document { .. }));
    assert_eq!(h.policies.version_count(POLICY_ARN), 1);
}

#[tokio::test]
async fn test_ephemeral_backend_provisions_seeded_policy() {
    let clients = ClientBundle::ephemeral(POLICY_ARN);

    let outcome = bootstrap::run(&clients, &target("data-bucket", "eu-west-1"))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        BootstrapOutcome::Provisioned {
            policy_version_id: "v2".to_string(),
            statements_updated: 1,
        }
    );
    assert!(clients.object_store.bucket_exists("data-bucket").await.unwrap());

    let version = clients
        .policy_service
        .get_policy_version(POLICY_ARN, "v2")
        .await
        .unwrap();
    assert!(version.is_default);
    let document = PolicyDocument::from_encoded(&version.document).unwrap();
    assert_eq!(
        serde_json::to_value(&document).unwrap()["Statement"][0]["Resource"],
        json!(["arn:aws:s3:::data-bucket"])
    );

    let outcome = bootstrap::run(&clients, &target("data-bucket", "eu-west-1"))
        .await
        .unwrap();
    assert_eq!(outcome, BootstrapOutcome::ExistingBucket { objects: vec![] });
}

/// Store whose bucket calls fail the way a provider outage would
struct BrokenStore {
    probe_fails: bool,
}

#[async_trait]
impl ObjectStore for BrokenStore {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, StorageError> {
        if self.probe_fails {
            Err(StorageError::provider("HeadBucket", bucket, "403 Forbidden"))
        } else {
            Ok(false)
        }
    }

    async fn create_bucket(&self, bucket: &str, region: &str) -> Result<(), StorageError> {
        Err(StorageError::CreateBucket {
            bucket: bucket.to_string(),
            region: region.to_string(),
            message: "BucketAlreadyExists".to_string(),
        })
    }

    async fn list_objects(&self, _bucket: &str) -> Result<Vec<ObjectSummary>, StorageError> {
        Ok(vec![])
    }

    async fn put_object(
        &self,
        _bucket: &str,
        _key: &str,
        _data: Bytes,
        _content_type: Option<String>,
    ) -> Result<(), StorageError> {
        Ok(())
    }

    async fn delete_object(&self, _bucket: &str, _key: &str) -> Result<(), StorageError> {
        Ok(())
    }

    async fn object_exists(&self, _bucket: &str, _key: &str) -> Result<bool, StorageError> {
        Ok(false)
    }

    async fn presign_get(
        &self,
        _bucket: &str,
        _key: &str,
        _expires_in: Duration,
    ) -> Result<String, StorageError> {
        Ok(String::new())
    }
}

#[tokio::test]
async fn test_create_failure_is_fatal_and_leaves_policy_alone() {
    let policies = Arc::new(EphemeralPolicyService::new());
    policies.insert_policy(POLICY_ARN, POLICY).unwrap();
    let clients = ClientBundle::new(Arc::new(BrokenStore { probe_fails: false }), policies.clone());

    let err = bootstrap::run(&clients, &target("data-bucket", "eu-west-1"))
        .await
        .unwrap_err();

    match err {
        BootstrapError::CreateBucket(StorageError::CreateBucket { bucket, region, .. }) => {
            assert_eq!(bucket, "data-bucket");
            assert_eq!(region, "eu-west-1");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(policies.version_count(POLICY_ARN), 1);
}

#[tokio::test]
async fn test_probe_failure_is_fatal() {
    let policies = Arc::new(EphemeralPolicyService::new());
    let clients = ClientBundle::new(Arc::new(BrokenStore { probe_fails: true }), policies);

    let err = bootstrap::run(&clients, &target("data-bucket", "eu-west-1"))
        .await
        .unwrap_err();

    assert!(matches!(err, BootstrapError::CheckBucket { .. }));
}
