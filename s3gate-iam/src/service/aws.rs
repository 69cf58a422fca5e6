//! IAM backend built on the AWS SDK

use super::traits::{PolicyError, PolicyInfo, PolicyService, PolicyVersionInfo};
use async_trait::async_trait;
use aws_sdk_iam::{error::DisplayErrorContext, Client};

#[derive(Debug, Clone)]
pub struct AwsPolicyService {
    client: Client,
}

impl AwsPolicyService {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PolicyService for AwsPolicyService {
    async fn get_policy(&self, policy_arn: &str) -> Result<PolicyInfo, PolicyError> {
        let output = match self.client.get_policy().policy_arn(policy_arn).send().await {
            Ok(output) => output,
            Err(err) => {
                let err = err.into_service_error();
                if err.is_no_such_entity_exception() {
                    return Err(PolicyError::NoSuchPolicy(policy_arn.to_string()));
                }
                return Err(PolicyError::provider(
                    "GetPolicy",
                    policy_arn,
                    DisplayErrorContext(&err).to_string(),
                ));
            }
        };

        let policy = output
            .policy()
            .ok_or_else(|| PolicyError::NoSuchPolicy(policy_arn.to_string()))?;

        Ok(PolicyInfo {
            arn: policy.arn().unwrap_or(policy_arn).to_string(),
            name: policy.policy_name().unwrap_or_default().to_string(),
            id: policy.policy_id().unwrap_or_default().to_string(),
            default_version_id: policy.default_version_id().map(String::from),
        })
    }

    async fn get_policy_version(
        &self,
        policy_arn: &str,
        version_id: &str,
    ) -> Result<PolicyVersionInfo, PolicyError> {
        let result = self
            .client
            .get_policy_version()
            .policy_arn(policy_arn)
            .version_id(version_id)
            .send()
            .await;

        let output = match result {
            Ok(output) => output,
            Err(err) => {
                let err = err.into_service_error();
                if err.is_no_such_entity_exception() {
                    return Err(PolicyError::NoSuchVersion {
                        policy_arn: policy_arn.to_string(),
                        version_id: version_id.to_string(),
                    });
                }
                return Err(PolicyError::provider(
                    "GetPolicyVersion",
                    policy_arn,
                    DisplayErrorContext(&err).to_string(),
                ));
            }
        };

        let version = output
            .policy_version()
            .ok_or_else(|| PolicyError::MissingDocument(policy_arn.to_string()))?;
        let document = version
            .document()
            .ok_or_else(|| PolicyError::MissingDocument(policy_arn.to_string()))?;

        Ok(PolicyVersionInfo {
            version_id: version.version_id().unwrap_or(version_id).to_string(),
            document: document.to_string(),
            is_default: version.is_default_version(),
        })
    }

    async fn create_policy_version(
        &self,
        policy_arn: &str,
        document: &str,
        set_as_default: bool,
    ) -> Result<String, PolicyError> {
        let output = self
            .client
            .create_policy_version()
            .policy_arn(policy_arn)
            .policy_document(document)
            .set_as_default(set_as_default)
            .send()
            .await
            .map_err(|err| {
                PolicyError::provider(
                    "CreatePolicyVersion",
                    policy_arn,
                    DisplayErrorContext(&err).to_string(),
                )
            })?;

        Ok(output
            .policy_version()
            .and_then(|v| v.version_id())
            .unwrap_or_default()
            .to_string())
    }
}
