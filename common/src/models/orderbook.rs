use crate::models::{AssetClass, CurrencyPair};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One price level
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub price: f64,
    pub amount: f64,
}

impl Item {
    pub fn new(price: f64, amount: f64) -> Self {
        Self { price, amount }
    }
}

/// Sums one side of a book: (total amount, total price * amount).
pub fn calculate_totals(items: &[Item]) -> (f64, f64) {
    items.iter().fold((0.0, 0.0), |(amount, notional), item| {
        (amount + item.amount, notional + item.price * item.amount)
    })
}

/// Full bid/ask depth for one (exchange, pair, asset class) at a point in
/// time. Snapshots are never patched; a newer fetch produces a new snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderbookSnapshot {
    pub exchange: String,
    pub pair: CurrencyPair,
    pub asset: AssetClass,
    /// Highest price first
    pub bids: Vec<Item>,
    /// Lowest price first
    pub asks: Vec<Item>,
    pub last_updated: DateTime<Utc>,
}

impl OrderbookSnapshot {
    pub fn new(
        exchange: &str,
        pair: CurrencyPair,
        asset: AssetClass,
        bids: Vec<Item>,
        asks: Vec<Item>,
    ) -> Self {
        Self {
            exchange: exchange.to_string(),
            pair,
            asset,
            bids,
            asks,
            last_updated: Utc::now(),
        }
    }

    pub fn total_bids(&self) -> (f64, f64) {
        calculate_totals(&self.bids)
    }

    pub fn total_asks(&self) -> (f64, f64) {
        calculate_totals(&self.asks)
    }

    pub fn best_bid(&self) -> Option<Item> {
        self.bids.first().copied()
    }

    pub fn best_ask(&self) -> Option<Item> {
        self.asks.first().copied()
    }
}
