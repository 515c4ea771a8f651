//! Pipeline configuration.
//!
//! All process-wide configuration is collected into a [`PipelineConfig`]
//! constructed once at startup and threaded through each component, so that
//! components stay testable with injected configuration. Credentials come
//! from environment variables only and are read exactly once, in
//! [`AwsCredentials::from_env`].

use std::path::PathBuf;

use crate::topics::TopicConfig;

/// Default AWS region when none is configured.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Location of the corpus object in the store.
#[derive(Debug, Clone)]
pub struct ObjectLocator {
    /// Bucket name
    pub bucket: String,
    /// Object key (path within the bucket)
    pub key: String,
}

impl std::fmt::Display for ObjectLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// Static AWS credentials read from the environment.
#[derive(Debug, Clone)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Present for temporary/STS credentials only
    pub session_token: Option<String>,
}

impl AwsCredentials {
    /// Read credentials from `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` /
    /// `AWS_SESSION_TOKEN`.
    ///
    /// Returns `None` when the key pair is not set, in which case object
    /// store requests go out unsigned (public buckets still work).
    pub fn from_env() -> Option<Self> {
        let access_key_id = std::env::var("AWS_ACCESS_KEY_ID").ok()?;
        let secret_access_key = std::env::var("AWS_SECRET_ACCESS_KEY").ok()?;
        if access_key_id.is_empty() || secret_access_key.is_empty() {
            return None;
        }
        Some(Self {
            access_key_id,
            secret_access_key,
            session_token: std::env::var("AWS_SESSION_TOKEN")
                .ok()
                .filter(|t| !t.is_empty()),
        })
    }
}

/// Complete configuration for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Where the raw corpus lives
    pub source: ObjectLocator,
    /// AWS region for the object store
    pub region: String,
    /// Custom endpoint override (e.g. a MinIO gateway); when set, path-style
    /// addressing is used instead of virtual-host addressing
    pub endpoint: Option<String>,
    /// Directory that receives CSV exports and visualizations
    pub output_dir: PathBuf,
    /// Topic-model parameters
    pub topics: TopicConfig,
    /// Credentials for signed requests, if available
    pub credentials: Option<AwsCredentials>,
}

impl PipelineConfig {
    /// Build a configuration with defaults for everything but the locator.
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            source: ObjectLocator {
                bucket: bucket.into(),
                key: key.into(),
            },
            region: DEFAULT_REGION.to_string(),
            endpoint: None,
            output_dir: PathBuf::from("data"),
            topics: TopicConfig::default(),
            credentials: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locator_display() {
        let locator = ObjectLocator {
            bucket: "research-gap".to_string(),
            key: "abstract-artificial-set.txt".to_string(),
        };
        assert_eq!(
            locator.to_string(),
            "s3://research-gap/abstract-artificial-set.txt"
        );
    }

    #[test]
    fn test_config_defaults() {
        let config = PipelineConfig::new("bucket", "key.txt");
        assert_eq!(config.region, DEFAULT_REGION);
        assert!(config.endpoint.is_none());
        assert_eq!(config.output_dir, PathBuf::from("data"));
    }
}
