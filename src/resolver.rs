use crate::config::InventoryConfig;
use crate::error::ConfigError;
use crate::inventory::{InventoryMapper, InventoryResult};
use crate::sources::{StateSource, build_source};
use crate::terraform::{StateDocument, parse_state};

/// Fetches state documents, parses them and maps them into an inventory.
pub struct Resolver {
    source: Box<dyn StateSource>,
    mapper: InventoryMapper,
}

impl Resolver {
    pub fn new(source: Box<dyn StateSource>, mapper: InventoryMapper) -> Self {
        Self { source, mapper }
    }

    pub fn from_config(config: &InventoryConfig) -> Result<Self, ConfigError> {
        let source = build_source(config)?;
        let mapper = InventoryMapper::from_config(config)?;
        Ok(Self::new(source, mapper))
    }

    /// Every document is parsed before mapping starts; the first malformed
    /// one fails the whole call.
    pub async fn fetch_documents(&self) -> Result<Vec<StateDocument>, ConfigError> {
        let mut states = self.source.fetch_states().await?;
        states.sort_by(|a, b| a.origin.cmp(&b.origin));

        tracing::info!(source = self.source.name(), count = states.len(), "state documents fetched");

        states
            .iter()
            .map(|state| parse_state(&state.bytes, &state.origin))
            .collect()
    }

    pub async fn resolve(&self) -> Result<InventoryResult, ConfigError> {
        let documents = self.fetch_documents().await?;
        Ok(self.mapper.map(&documents))
    }
}
