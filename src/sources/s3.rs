mod client;
mod error;
mod signing;
mod types;

pub use client::S3Client;
pub use error::S3Error;
pub use signing::{
    Credentials, canonical_query, derive_signing_key, encode_key, has_dot_segment, sign_request,
};
pub use types::{ErrorResponse, ListBucketResult, ObjectSummary};

use std::time::Duration;

use async_trait::async_trait;

use super::retry::RetryPolicy;
use super::{RawState, StateSource};
use crate::config::InventoryConfig;
use crate::error::ConfigError;
use crate::pattern::SearchPattern;

/// State objects in an S3 (or S3-compatible) bucket.
#[derive(Debug, Clone)]
pub struct S3Source {
    client: S3Client,
    pattern: SearchPattern,
}

impl S3Source {
    pub fn new(client: S3Client, pattern: SearchPattern) -> Self {
        Self { client, pattern }
    }

    pub fn from_config(config: &InventoryConfig, pattern: SearchPattern) -> Result<Self, ConfigError> {
        let s3 = config.s3()?;

        let bucket = s3
            .bucket
            .as_deref()
            .filter(|b| !b.is_empty())
            .ok_or_else(|| ConfigError::configuration("s3_config.bucket is required"))?;

        let access_key = s3.access_key.clone().ok_or_else(|| {
            ConfigError::authentication(
                "No S3 access key provided. Set TFSTATE_S3_ACCESS_KEY or s3_config.access_key",
            )
        })?;
        let secret_key = s3.secret_key.clone().ok_or_else(|| {
            ConfigError::authentication(
                "No S3 secret key provided. Set TFSTATE_S3_SECRET_KEY or s3_config.secret_key",
            )
        })?;

        let credentials = Credentials {
            access_key,
            secret_key,
            session_token: s3.session_token.clone(),
        };

        let client = S3Client::new(
            &s3.endpoint_url(),
            s3.region_or_default(),
            bucket,
            credentials,
            Duration::from_secs(config.timeout_secs),
        )?
        .with_retry_policy(RetryPolicy::with_max_attempts(config.max_attempts));

        Ok(Self::new(client, pattern))
    }

    /// Keys matching the search pattern, sorted. Keys with dot segments are
    /// skipped since no path-style request can address them.
    pub async fn matching_keys(&self) -> Result<Vec<String>, S3Error> {
        let prefix = self.pattern.literal_prefix();
        let objects = self.client.list_objects(&prefix).await?;
        let listed = objects.len();

        let mut keys: Vec<String> = objects
            .into_iter()
            .map(|object| object.key)
            .filter(|key| self.pattern.is_match(key))
            .filter(|key| {
                if has_dot_segment(key) {
                    tracing::warn!(key = %key, "skipping object with '.' or '..' key segments");
                    return false;
                }
                true
            })
            .collect();
        keys.sort();

        tracing::info!(
            bucket = %self.client.bucket(),
            prefix = %prefix,
            listed,
            matched = keys.len(),
            pattern = self.pattern.as_str(),
            "matching state objects"
        );
        Ok(keys)
    }
}

#[async_trait]
impl StateSource for S3Source {
    fn name(&self) -> &str {
        "s3"
    }

    async fn fetch_states(&self) -> Result<Vec<RawState>, ConfigError> {
        let keys = self.matching_keys().await?;

        let mut states = Vec::with_capacity(keys.len());
        for key in keys {
            let bytes = self.client.get_object(&key).await?;
            tracing::debug!(key = %key, size = bytes.len(), "state object fetched");
            states.push(RawState::new(key, bytes));
        }
        Ok(states)
    }
}
