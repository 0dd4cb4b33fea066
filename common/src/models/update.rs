use crate::models::{AssetClass, CurrencyPair, Item};
use serde::{Deserialize, Serialize};

/// What a connector's decode step produced. The core dispatches on the
/// variant instead of inspecting payload shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MarketUpdate {
    Orderbook(DepthUpdate),
    Ticker(TickerUpdate),
    Symbols(SymbolList),
}

impl MarketUpdate {
    pub fn exchange(&self) -> &str {
        match self {
            MarketUpdate::Orderbook(depth) => &depth.exchange,
            MarketUpdate::Ticker(ticker) => &ticker.exchange,
            MarketUpdate::Symbols(list) => &list.exchange,
        }
    }
}

/// A full bid/ask replacement for one pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepthUpdate {
    pub exchange: String,
    pub pair: CurrencyPair,
    pub asset: AssetClass,
    pub bids: Vec<Item>,
    pub asks: Vec<Item>,
}

/// Last traded price and 24h volume for one pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickerUpdate {
    pub exchange: String,
    pub pair: CurrencyPair,
    pub asset: AssetClass,
    pub last: f64,
    pub volume: f64,
}

/// Every symbol an exchange currently lists, already rendered in the
/// exchange's config format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolList {
    pub exchange: String,
    pub asset: AssetClass,
    pub symbols: Vec<String>,
}
