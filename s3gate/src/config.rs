//! Configuration management

use serde::Deserialize;
use std::fmt;
use thiserror::Error;

/// Which provider backend the client bundle talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Backend {
    /// Amazon S3 and IAM (or a compatible endpoint)
    Aws,
    /// In-process memory; nothing leaves the process
    Ephemeral,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("Missing required configuration: {}", .0.join(", "))]
    Missing(Vec<&'static str>),
}

/// Provider settings, read from `s3gate.toml` and `AWS_*` variables
#[derive(Clone, Deserialize, Default)]
pub struct StorageSettings {
    #[serde(default)]
    pub access_key: String,

    #[serde(default)]
    pub secret_key: String,

    #[serde(default)]
    pub region: String,

    #[serde(default)]
    pub bucket_name: String,

    #[serde(default)]
    pub policy_arn: String,

    /// Override for S3-compatible services and local emulators
    #[serde(default)]
    pub endpoint_url: Option<String>,

    #[serde(default)]
    pub force_path_style: bool,

    /// Key served by the presign and delete endpoints
    #[serde(default = "default_object_key")]
    pub object_key: String,
}

fn default_object_key() -> String {
    "sample.txt".to_string()
}

impl fmt::Debug for StorageSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageSettings")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("region", &self.region)
            .field("bucket_name", &self.bucket_name)
            .field("policy_arn", &self.policy_arn)
            .field("endpoint_url", &self.endpoint_url)
            .field("force_path_style", &self.force_path_style)
            .field("object_key", &self.object_key)
            .finish()
    }
}

/// `AWS_BUCKET_NAME` maps to `bucket_name`; keys are never nested
fn environment() -> ::config::Environment {
    ::config::Environment::with_prefix("AWS")
}

impl StorageSettings {
    /// Load configuration from file and environment
    pub fn load(file_stem: &str) -> Result<Self, ConfigError> {
        let config = ::config::Config::builder()
            .add_source(::config::File::with_name(file_stem).required(false))
            .add_source(environment())
            .build()?;

        Ok(config.try_deserialize::<StorageSettings>()?)
    }

    /// Report every required value that is missing for `backend`
    pub fn validate(&self, backend: Backend) -> Result<(), ConfigError> {
        let mut required = vec![
            ("region", &self.region),
            ("bucket_name", &self.bucket_name),
            ("policy_arn", &self.policy_arn),
        ];
        if backend == Backend::Aws {
            required.insert(0, ("secret_key", &self.secret_key));
            required.insert(0, ("access_key", &self.access_key));
        }

        let missing: Vec<&'static str> = required
            .into_iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| name)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Missing(missing))
        }
    }
}
