use chrono::Duration;
use common::{
    models::{AssetClass, Currency, CurrencyPair, Item, OrderbookSnapshot},
    Error, NotFound, Result,
};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

type AssetBooks = HashMap<AssetClass, Arc<OrderbookSnapshot>>;
type ExchangeBooks = HashMap<Currency, HashMap<Currency, AssetBooks>>;

/// Latest depth snapshot per (exchange, pair, asset class).
///
/// Writers build a fresh immutable snapshot and swap it in under the
/// exchange's shard lock; readers get an `Arc` to whichever snapshot was
/// current, so bids and asks always come from the same update. Entries are
/// never evicted.
#[derive(Debug, Default)]
pub struct OrderbookRegistry {
    exchanges: DashMap<String, ExchangeBooks>,
}

impl OrderbookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or wholesale replaces the snapshot for a key.
    pub fn process(
        &self,
        exchange: &str,
        pair: &CurrencyPair,
        asset: AssetClass,
        bids: Vec<Item>,
        asks: Vec<Item>,
    ) -> Arc<OrderbookSnapshot> {
        let mut snapshot = OrderbookSnapshot::new(exchange, pair.clone(), asset, bids, asks);

        let mut books = self.exchanges.entry(exchange.to_string()).or_default();
        let slot = books
            .entry(pair.first.clone())
            .or_default()
            .entry(pair.second.clone())
            .or_default();

        let created = match slot.get(&asset) {
            Some(previous) => {
                // keep last_updated strictly increasing per key
                if snapshot.last_updated <= previous.last_updated {
                    snapshot.last_updated = previous.last_updated + Duration::nanoseconds(1);
                }
                false
            }
            None => true,
        };

        let snapshot = Arc::new(snapshot);
        slot.insert(asset, Arc::clone(&snapshot));
        drop(books);

        debug!(
            exchange,
            pair = %pair,
            asset = %asset,
            bids = snapshot.bids.len(),
            asks = snapshot.asks.len(),
            "{} orderbook",
            if created { "Created" } else { "Updated" }
        );
        snapshot
    }

    /// Exact lookup: BTC/USD never matches a USD/BTC book.
    pub fn get(
        &self,
        exchange: &str,
        pair: &CurrencyPair,
        asset: AssetClass,
    ) -> Result<Arc<OrderbookSnapshot>> {
        let books = self
            .exchanges
            .get(exchange)
            .ok_or_else(|| NotFound::Exchange(exchange.to_string()))?;

        let seconds = books
            .get(&pair.first)
            .ok_or_else(|| NotFound::FirstCurrency {
                exchange: exchange.to_string(),
                currency: pair.first.to_string(),
            })?;

        let assets = seconds
            .get(&pair.second)
            .ok_or_else(|| NotFound::SecondCurrency {
                exchange: exchange.to_string(),
                pair: pair.to_string(),
            })?;

        let snapshot = assets.get(&asset).ok_or_else(|| NotFound::AssetClass {
            exchange: exchange.to_string(),
            pair: pair.to_string(),
            asset: asset.to_string(),
        })?;

        Ok(Arc::clone(snapshot))
    }

    /// Like [`get`](Self::get), but falls back to the pair quoted the other
    /// way round. Errors from the direct lookup win.
    pub fn get_symmetric(
        &self,
        exchange: &str,
        pair: &CurrencyPair,
        asset: AssetClass,
    ) -> Result<Arc<OrderbookSnapshot>> {
        match self.get(exchange, pair, asset) {
            Err(Error::NotFound(NotFound::Exchange(name))) => {
                Err(NotFound::Exchange(name).into())
            }
            Err(err) => self.get(exchange, &pair.swap(), asset).map_err(|_| err),
            found => found,
        }
    }

    /// Every snapshot held for an exchange, ordered by pair then asset class.
    pub fn get_by_exchange(&self, exchange: &str) -> Result<Vec<Arc<OrderbookSnapshot>>> {
        let books = self
            .exchanges
            .get(exchange)
            .ok_or_else(|| NotFound::Exchange(exchange.to_string()))?;

        let mut snapshots: Vec<Arc<OrderbookSnapshot>> = books
            .values()
            .flat_map(|seconds| seconds.values())
            .flat_map(|assets| assets.values())
            .cloned()
            .collect();
        drop(books);

        if snapshots.is_empty() {
            return Err(NotFound::Exchange(exchange.to_string()).into());
        }

        snapshots.sort_by(|a, b| {
            (&a.pair.first, &a.pair.second, a.asset).cmp(&(&b.pair.first, &b.pair.second, b.asset))
        });
        Ok(snapshots)
    }

    /// Whether the exchange has any book whose first currency is `currency`.
    pub fn first_currency_exists(&self, exchange: &str, currency: &Currency) -> bool {
        self.exchanges
            .get(exchange)
            .map(|books| books.contains_key(currency))
            .unwrap_or(false)
    }

    /// Whether the exchange has any book for exactly this first/second
    /// combination, under any asset class.
    pub fn second_currency_exists(&self, exchange: &str, pair: &CurrencyPair) -> bool {
        self.exchanges
            .get(exchange)
            .and_then(|books| {
                books
                    .get(&pair.first)
                    .map(|seconds| seconds.contains_key(&pair.second))
            })
            .unwrap_or(false)
    }

    /// Names of exchanges with at least one snapshot, sorted.
    pub fn exchanges(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .exchanges
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    /// Total number of snapshots held.
    pub fn len(&self) -> usize {
        self.exchanges
            .iter()
            .map(|entry| {
                entry
                    .value()
                    .values()
                    .flat_map(|seconds| seconds.values())
                    .map(HashMap::len)
                    .sum::<usize>()
            })
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
