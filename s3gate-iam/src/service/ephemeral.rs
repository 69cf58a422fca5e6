//! IAM in-memory policy storage

use super::traits::{PolicyError, PolicyInfo, PolicyService, PolicyVersionInfo};
use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use uuid::Uuid;

/// IAM keeps at most this many versions per managed policy
pub const MAX_POLICY_VERSIONS: usize = 5;

/// RFC 3986 unreserved characters stay as-is, like IAM's document encoding
const DOCUMENT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// A stored policy version
#[derive(Debug, Clone)]
struct StoredVersion {
    version_id: String,
    /// Plain JSON
    document: String,
}

/// An IAM managed policy
#[derive(Debug, Clone)]
struct StoredPolicy {
    policy_name: String,
    policy_id: String,
    default_version_id: String,
    versions: Vec<StoredVersion>,
    next_version: u32,
}

impl StoredPolicy {
    fn default_version(&self) -> Option<&StoredVersion> {
        self.versions
            .iter()
            .find(|v| v.version_id == self.default_version_id)
    }
}

/// In-memory IAM policy storage
#[derive(Debug, Default)]
pub struct EphemeralPolicyService {
    /// Policies indexed by ARN
    policies: DashMap<String, StoredPolicy>,
}

impl EphemeralPolicyService {
    pub fn new() -> Self {
        Self {
            policies: DashMap::new(),
        }
    }

    /// Create a policy under the local account, returning its ARN
    pub fn create_policy(
        &self,
        policy_name: &str,
        policy_document: &str,
        path: Option<&str>,
    ) -> Result<String, PolicyError> {
        let arn = format!(
            "arn:aws:iam::000000000000:policy{}{}",
            path.unwrap_or("/"),
            policy_name
        );
        self.insert_policy(&arn, policy_document)?;
        Ok(arn)
    }

    /// Register a policy under an explicit ARN with `v1` as its default version
    pub fn insert_policy(&self, policy_arn: &str, policy_document: &str) -> Result<(), PolicyError> {
        let Entry::Vacant(entry) = self.policies.entry(policy_arn.to_string()) else {
            return Err(PolicyError::provider(
                "CreatePolicy",
                policy_arn,
                "EntityAlreadyExists: a policy with this ARN already exists",
            ));
        };

        let policy_name = policy_arn
            .rsplit('/')
            .next()
            .unwrap_or(policy_arn)
            .to_string();
        let policy_id = format!(
            "ANPA{}",
            &Uuid::new_v4().simple().to_string()[..17].to_uppercase()
        );

        entry.insert(StoredPolicy {
            policy_name,
            policy_id,
            default_version_id: "v1".to_string(),
            versions: vec![StoredVersion {
                version_id: "v1".to_string(),
                document: policy_document.to_string(),
            }],
            next_version: 2,
        });
        Ok(())
    }

    /// Plain JSON of the policy's current default version
    pub fn default_document(&self, policy_arn: &str) -> Option<String> {
        let policy = self.policies.get(policy_arn)?;
        policy.default_version().map(|v| v.document.clone())
    }

    /// Number of versions retained for a policy
    pub fn version_count(&self, policy_arn: &str) -> usize {
        self.policies
            .get(policy_arn)
            .map_or(0, |p| p.versions.len())
    }
}

#[async_trait]
impl PolicyService for EphemeralPolicyService {
    async fn get_policy(&self, policy_arn: &str) -> Result<PolicyInfo, PolicyError> {
        self.policies
            .get(policy_arn)
            .map(|p| PolicyInfo {
                arn: policy_arn.to_string(),
                name: p.policy_name.clone(),
                id: p.policy_id.clone(),
                default_version_id: Some(p.default_version_id.clone()),
            })
            .ok_or_else(|| PolicyError::NoSuchPolicy(policy_arn.to_string()))
    }

    async fn get_policy_version(
        &self,
        policy_arn: &str,
        version_id: &str,
    ) -> Result<PolicyVersionInfo, PolicyError> {
        let policy = self
            .policies
            .get(policy_arn)
            .ok_or_else(|| PolicyError::NoSuchPolicy(policy_arn.to_string()))?;

        let version = policy
            .versions
            .iter()
            .find(|v| v.version_id == version_id)
            .ok_or_else(|| PolicyError::NoSuchVersion {
                policy_arn: policy_arn.to_string(),
                version_id: version_id.to_string(),
            })?;

        Ok(PolicyVersionInfo {
            version_id: version.version_id.clone(),
            document: utf8_percent_encode(&version.document, DOCUMENT_ENCODE_SET).to_string(),
            is_default: version.version_id == policy.default_version_id,
        })
    }

    async fn create_policy_version(
        &self,
        policy_arn: &str,
        document: &str,
        set_as_default: bool,
    ) -> Result<String, PolicyError> {
        let mut policy = self
            .policies
            .get_mut(policy_arn)
            .ok_or_else(|| PolicyError::NoSuchPolicy(policy_arn.to_string()))?;

        if policy.versions.len() >= MAX_POLICY_VERSIONS {
            return Err(PolicyError::provider(
                "CreatePolicyVersion",
                policy_arn,
                format!("LimitExceeded: a managed policy can have at most {MAX_POLICY_VERSIONS} versions"),
            ));
        }

        let version_id = format!("v{}", policy.next_version);
        policy.next_version += 1;
        policy.versions.push(StoredVersion {
            version_id: version_id.clone(),
            document: document.to_string(),
        });
        if set_as_default {
            policy.default_version_id = version_id.clone();
        }
        Ok(version_id)
    }
}
