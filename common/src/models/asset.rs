use crate::Error;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Partitions an exchange's pair namespace: the same symbol can mean a spot
/// market on one class and a contract on another.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssetClass {
    #[serde(rename = "spot")]
    Spot,
    #[serde(rename = "margin")]
    Margin,
    #[serde(rename = "futures")]
    Futures,
    #[serde(rename = "perpetual_swap")]
    PerpetualSwap,
    #[serde(rename = "binary")]
    Binary,
}

impl AssetClass {
    pub const ALL: [AssetClass; 5] = [
        AssetClass::Spot,
        AssetClass::Margin,
        AssetClass::Futures,
        AssetClass::PerpetualSwap,
        AssetClass::Binary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetClass::Spot => "spot",
            AssetClass::Margin => "margin",
            AssetClass::Futures => "futures",
            AssetClass::PerpetualSwap => "perpetual_swap",
            AssetClass::Binary => "binary",
        }
    }
}

impl std::fmt::Display for AssetClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetClass {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        AssetClass::ALL
            .into_iter()
            .find(|asset| asset.as_str() == wanted)
            .ok_or_else(|| Error::ParseError(format!("unknown asset class '{}'", s)))
    }
}
