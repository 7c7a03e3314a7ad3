pub mod local;
pub mod retry;
pub mod s3;

use async_trait::async_trait;

use crate::config::{InventoryConfig, SourceType};
use crate::error::ConfigError;
use crate::pattern::SearchPattern;

/// Bytes of one state document and where they came from.
#[derive(Debug, Clone, PartialEq)]
pub struct RawState {
    pub origin: String,
    pub bytes: Vec<u8>,
}

impl RawState {
    pub fn new(origin: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            origin: origin.into(),
            bytes: bytes.into(),
        }
    }
}

/// Read-only capability to fetch every state document matching a location.
#[async_trait]
pub trait StateSource: Send + Sync {
    fn name(&self) -> &str;

    /// Documents in a stable order. Each call fetches afresh.
    async fn fetch_states(&self) -> Result<Vec<RawState>, ConfigError>;
}

pub fn build_source(config: &InventoryConfig) -> Result<Box<dyn StateSource>, ConfigError> {
    let pattern = SearchPattern::new(&config.search_pattern)?;
    match config.source_type {
        SourceType::Local => {
            let path = config.local_path.clone().ok_or_else(|| {
                ConfigError::configuration("local_path is required when source_type is local")
            })?;
            Ok(Box::new(local::LocalSource::new(path, pattern)))
        }
        SourceType::S3 => Ok(Box::new(s3::S3Source::from_config(config, pattern)?)),
    }
}
