use crate::{OrderbookRegistry, PairDiff, PairSetManager, TickerStats};
use common::{
    models::{CurrencyPair, MarketUpdate, OrderbookSnapshot},
    Error, Result,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// What an ingested update changed
#[derive(Debug, Clone)]
pub enum Ingested {
    Orderbook(Arc<OrderbookSnapshot>),
    Ticker,
    Pairs {
        diff: PairDiff,
        /// Enabled pairs dropped because they are no longer listed
        disabled: Vec<CurrencyPair>,
    },
}

/// Routes decoded connector output into the core stores
#[derive(Clone)]
pub struct Ingestor {
    registry: Arc<OrderbookRegistry>,
    pairs: Arc<PairSetManager>,
    stats: Arc<TickerStats>,
}

impl Ingestor {
    pub fn new(
        registry: Arc<OrderbookRegistry>,
        pairs: Arc<PairSetManager>,
        stats: Arc<TickerStats>,
    ) -> Self {
        Self {
            registry,
            pairs,
            stats,
        }
    }

    pub async fn ingest(&self, update: MarketUpdate) -> Result<Ingested> {
        match update {
            MarketUpdate::Orderbook(depth) => {
                let snapshot = self.registry.process(
                    &depth.exchange,
                    &depth.pair,
                    depth.asset,
                    depth.bids,
                    depth.asks,
                );
                Ok(Ingested::Orderbook(snapshot))
            }
            MarketUpdate::Ticker(ticker) => {
                self.stats.add(
                    &ticker.exchange,
                    &ticker.pair,
                    ticker.asset,
                    ticker.last,
                    ticker.volume,
                );
                Ok(Ingested::Ticker)
            }
            MarketUpdate::Symbols(list) => {
                let diff = match self
                    .pairs
                    .reconcile(&list.exchange, list.asset, &list.symbols, false, false)
                    .await
                {
                    Ok(diff) => diff,
                    Err(err @ Error::ConfigPersistence(_)) => {
                        // available already changed in memory; keep enabled in step
                        if let Err(repair_err) = self
                            .pairs
                            .check_pair_consistency(&list.exchange, list.asset)
                            .await
                        {
                            warn!(
                                exchange = %list.exchange,
                                asset = %list.asset,
                                error = %repair_err,
                                "Enabled pair repair failed"
                            );
                        }
                        return Err(err);
                    }
                    Err(err) => return Err(err),
                };
                let disabled = self
                    .pairs
                    .check_pair_consistency(&list.exchange, list.asset)
                    .await?;
                debug!(
                    exchange = %list.exchange,
                    asset = %list.asset,
                    new = diff.new_pairs.len(),
                    removed = diff.removed_pairs.len(),
                    disabled = disabled.len(),
                    "Applied symbol list"
                );
                Ok(Ingested::Pairs { diff, disabled })
            }
        }
    }
}
