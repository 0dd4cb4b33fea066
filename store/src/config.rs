use crate::StoreError;
use async_trait::async_trait;
use common::models::ExchangeConfig;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

/// Where per-exchange pair configuration lives between restarts
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Fetch the stored configuration for an exchange
    async fn get_exchange_config(&self, name: &str) -> Result<ExchangeConfig, StoreError>;

    /// Overwrite the stored configuration for an already known exchange
    async fn update_exchange_config(&self, config: &ExchangeConfig) -> Result<(), StoreError>;
}

/// Process-local config store
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    exchanges: RwLock<HashMap<String, ExchangeConfig>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_exchanges(configs: impl IntoIterator<Item = ExchangeConfig>) -> Self {
        let store = Self::new();
        for config in configs {
            store.insert(config);
        }
        store
    }

    /// Adds or replaces an exchange entry
    pub fn insert(&self, config: ExchangeConfig) {
        self.exchanges.write().insert(config.name.clone(), config);
    }

    pub fn get(&self, name: &str) -> Option<ExchangeConfig> {
        self.exchanges.read().get(name).cloned()
    }

    pub fn exchange_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.exchanges.read().keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn get_exchange_config(&self, name: &str) -> Result<ExchangeConfig, StoreError> {
        self.get(name)
            .ok_or_else(|| StoreError::UnknownExchange(name.to_string()))
    }

    async fn update_exchange_config(&self, config: &ExchangeConfig) -> Result<(), StoreError> {
        let mut exchanges = self.exchanges.write();
        match exchanges.get_mut(&config.name) {
            Some(stored) => {
                debug!(exchange = %config.name, "Updating exchange config");
                *stored = config.clone();
                Ok(())
            }
            None => Err(StoreError::UnknownExchange(config.name.clone())),
        }
    }
}
