use crate::models::{AssetClass, PairFormat};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Persisted pair lists for one asset class, comma-joined in the exchange's
/// config format
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairStrings {
    #[serde(default)]
    pub enabled: String,
    #[serde(default)]
    pub available: String,
}

/// Per-exchange pair configuration as held by the config store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeConfig {
    pub name: String,
    pub enabled: bool,
    #[serde(default)]
    pub supports_auto_pair_updates: bool,
    /// Unix seconds; 0 means never
    #[serde(default)]
    pub pairs_last_updated: i64,
    #[serde(default)]
    pub request_format: Option<PairFormat>,
    #[serde(default)]
    pub config_format: Option<PairFormat>,
    #[serde(default)]
    pub asset_classes: Vec<AssetClass>,
    #[serde(default)]
    pub pairs: BTreeMap<AssetClass, PairStrings>,
}

impl ExchangeConfig {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            enabled: true,
            ..Self::default()
        }
    }

    /// Seeds the enabled list for an asset class.
    pub fn with_enabled_pairs(mut self, asset: AssetClass, pairs: &str) -> Self {
        self.pairs.entry(asset).or_default().enabled = pairs.to_string();
        self
    }
}

/// What a connector knows about its own exchange before any config is read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeDefaults {
    pub request_format: PairFormat,
    pub config_format: PairFormat,
    pub asset_classes: Vec<AssetClass>,
    pub supports_auto_pair_updates: bool,
    /// Config-formatted pairs enabled when the operator has not chosen any
    pub enabled_pairs: Vec<String>,
}
