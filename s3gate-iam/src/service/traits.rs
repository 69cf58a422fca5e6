//! Policy service traits

use async_trait::async_trait;
use thiserror::Error;

/// IAM errors
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("No such policy: {0}")]
    NoSuchPolicy(String),

    #[error("No such policy version: {policy_arn} {version_id}")]
    NoSuchVersion {
        policy_arn: String,
        version_id: String,
    },

    #[error("Policy {0} has no default version")]
    MissingDefaultVersion(String),

    #[error("Policy version of {0} has no document")]
    MissingDocument(String),

    #[error("{operation} failed for {policy_arn}: {message}")]
    Provider {
        operation: &'static str,
        policy_arn: String,
        message: String,
    },
}

impl PolicyError {
    pub fn provider(
        operation: &'static str,
        policy_arn: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Provider {
            operation,
            policy_arn: policy_arn.into(),
            message: message.into(),
        }
    }
}

/// A managed policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyInfo {
    pub arn: String,
    pub name: String,
    /// Stable `ANPA...` identifier
    pub id: String,
    pub default_version_id: Option<String>,
}

/// One version of a managed policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyVersionInfo {
    pub version_id: String,
    /// URL-encoded JSON, as IAM returns it
    pub document: String,
    pub is_default: bool,
}

/// Managed-policy operations used at bootstrap
#[async_trait]
pub trait PolicyService: Send + Sync {
    /// Look up a policy by ARN
    async fn get_policy(&self, policy_arn: &str) -> Result<PolicyInfo, PolicyError>;

    /// Fetch one version of a policy, including its document
    async fn get_policy_version(
        &self,
        policy_arn: &str,
        version_id: &str,
    ) -> Result<PolicyVersionInfo, PolicyError>;

    /// Publish a new version (plain JSON), returning its version id
    async fn create_policy_version(
        &self,
        policy_arn: &str,
        document: &str,
        set_as_default: bool,
    ) -> Result<String, PolicyError>;
}
