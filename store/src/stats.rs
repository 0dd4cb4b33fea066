use common::models::{AssetClass, Currency, CurrencyPair};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

/// Last seen price and volume for one exchange's pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatItem {
    pub exchange: String,
    pub pair: CurrencyPair,
    pub asset: AssetClass,
    pub price: f64,
    pub volume: f64,
}

/// Ranks exchanges quoting the same pair by price or volume
#[derive(Debug, Default)]
pub struct TickerStats {
    items: RwLock<Vec<StatItem>>,
}

impl TickerStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a ticker. Incomplete tickers (no exchange, a missing currency,
    /// zero price or volume) are ignored. XBT is also recorded as BTC, and
    /// USDT quotes also as USD, so they rank alongside the common spelling.
    pub fn add(&self, exchange: &str, pair: &CurrencyPair, asset: AssetClass, price: f64, volume: f64) {
        if exchange.is_empty()
            || pair.first.is_empty()
            || pair.second.is_empty()
            || price == 0.0
            || volume == 0.0
        {
            debug!(exchange, pair = %pair, "Ignoring incomplete ticker");
            return;
        }

        if pair.first.as_str() == "XBT" {
            let alias = CurrencyPair::new("BTC", pair.second.clone());
            self.append(exchange, &alias, asset, price, volume);
        }

        if pair.second.as_str() == "USDT" {
            let alias = CurrencyPair::new(pair.first.clone(), Currency::new("USD"));
            self.append(exchange, &alias, asset, price, volume);
        }

        self.append(exchange, pair, asset, price, volume);
    }

    /// Updates the matching entry in place, or adds a new one.
    pub fn append(&self, exchange: &str, pair: &CurrencyPair, asset: AssetClass, price: f64, volume: f64) {
        let mut items = self.items.write();
        if let Some(item) = items
            .iter_mut()
            .find(|item| item.exchange == exchange && item.pair == *pair && item.asset == asset)
        {
            item.price = price;
            item.volume = volume;
            return;
        }

        items.push(StatItem {
            exchange: exchange.to_string(),
            pair: pair.clone(),
            asset,
            price,
            volume,
        });
    }

    pub fn items(&self) -> Vec<StatItem> {
        self.items.read().clone()
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    fn sorted_by<F>(&self, pair: &CurrencyPair, asset: AssetClass, descending: bool, key: F) -> Vec<StatItem>
    where
        F: Fn(&StatItem) -> f64,
    {
        let mut matching: Vec<StatItem> = self
            .items
            .read()
            .iter()
            .filter(|item| item.pair == *pair && item.asset == asset)
            .cloned()
            .collect();

        matching.sort_by(|a, b| {
            let order = key(a).partial_cmp(&key(b)).unwrap_or(Ordering::Equal);
            if descending {
                order.reverse()
            } else {
                order
            }
        });
        matching
    }

    /// Exchanges quoting `pair`, cheapest first unless `descending`
    pub fn sort_exchanges_by_price(&self, pair: &CurrencyPair, asset: AssetClass, descending: bool) -> Vec<StatItem> {
        self.sorted_by(pair, asset, descending, |item| item.price)
    }

    /// Exchanges quoting `pair`, thinnest first unless `descending`
    pub fn sort_exchanges_by_volume(&self, pair: &CurrencyPair, asset: AssetClass, descending: bool) -> Vec<StatItem> {
        self.sorted_by(pair, asset, descending, |item| item.volume)
    }
}
