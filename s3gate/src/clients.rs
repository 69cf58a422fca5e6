//! Provider client construction

use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use s3gate_iam::{AwsPolicyService, EphemeralPolicyService, PolicyService};
use s3gate_s3::{EphemeralObjectStore, ObjectStore, S3ObjectStore};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::StorageSettings;

/// Policy seeded into the ephemeral backend so bootstrap has something to patch
const EPHEMERAL_POLICY_DOCUMENT: &str =
    r#"{"Version":"2012-10-17","Statement":[{"Effect":"Allow","Action":"s3:*","Resource":[]}]}"#;

/// The provider clients shared by every request for the life of the process.
///
/// Built once in `main` and handed to whoever needs it; cloning only bumps
/// the reference counts.
#[derive(Clone)]
pub struct ClientBundle {
    pub object_store: Arc<dyn ObjectStore>,
    pub policy_service: Arc<dyn PolicyService>,
}

impl ClientBundle {
    pub fn new(object_store: Arc<dyn ObjectStore>, policy_service: Arc<dyn PolicyService>) -> Self {
        Self {
            object_store,
            policy_service,
        }
    }

    /// Build S3 and IAM clients from static credentials and a region
    pub async fn connect(settings: &StorageSettings) -> Self {
        let credentials = Credentials::new(
            &settings.access_key,
            &settings.secret_key,
            None,
            None,
            "s3gate-static",
        );

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()))
            .credentials_provider(credentials);
        if let Some(endpoint) = &settings.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(settings.force_path_style)
            .build();
        let s3 = aws_sdk_s3::Client::from_conf(s3_config);
        let iam = aws_sdk_iam::Client::new(&sdk_config);

        info!(
            region = %settings.region,
            endpoint = settings.endpoint_url.as_deref().unwrap_or("default"),
            "AWS clients initialized"
        );

        Self::new(
            Arc::new(S3ObjectStore::new(s3)),
            Arc::new(AwsPolicyService::new(iam)),
        )
    }

    /// In-memory clients with `policy_arn` pre-created
    pub fn ephemeral(policy_arn: &str) -> Self {
        let policies = EphemeralPolicyService::new();
        if let Err(err) = policies.insert_policy(policy_arn, EPHEMERAL_POLICY_DOCUMENT) {
            warn!(error = %err, "Failed to seed ephemeral policy");
        }

        info!(policy_arn = %policy_arn, "Ephemeral clients initialized");

        Self::new(
            Arc::new(EphemeralObjectStore::new()),
            Arc::new(policies),
        )
    }
}
