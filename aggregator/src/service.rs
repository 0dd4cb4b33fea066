use crate::config::AggregatorConfig;
use common::{models::MarketUpdate, Result};
use connectors::ExchangeConnector;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use store::{ConfigStore, Ingested, Ingestor, OrderbookRegistry, PairSetManager, TickerStats};
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy)]
enum Poll {
    Orderbook,
    Ticker,
}

impl Poll {
    fn as_str(&self) -> &'static str {
        match self {
            Poll::Orderbook => "orderbook",
            Poll::Ticker => "ticker",
        }
    }
}

/// Service feeding exchange data into the orderbook registry, pair sets
/// and ticker stats
pub struct AggregatorService {
    /// Latest depth per exchange, pair and asset class
    registry: Arc<OrderbookRegistry>,
    /// Enabled/available pairs per exchange
    pairs: Arc<PairSetManager>,
    /// Last price and volume per exchange
    stats: Arc<TickerStats>,
    ingestor: Ingestor,
}

impl AggregatorService {
    pub fn new(config_store: Arc<dyn ConfigStore>) -> Self {
        let registry = Arc::new(OrderbookRegistry::new());
        let pairs = Arc::new(PairSetManager::new(config_store));
        let stats = Arc::new(TickerStats::new());
        let ingestor = Ingestor::new(Arc::clone(&registry), Arc::clone(&pairs), Arc::clone(&stats));

        Self {
            registry,
            pairs,
            stats,
            ingestor,
        }
    }

    pub fn registry(&self) -> &OrderbookRegistry {
        &self.registry
    }

    pub fn pairs(&self) -> &PairSetManager {
        &self.pairs
    }

    pub fn stats(&self) -> &TickerStats {
        &self.stats
    }

    /// Registers the exchange's pair sets and pulls its first symbol list.
    /// A failed first sync is logged; the exchange still polls its
    /// configured pairs.
    pub async fn bootstrap(&self, connector: &dyn ExchangeConnector) -> Result<()> {
        let name = connector.name();
        self.pairs.register(name, &connector.defaults()).await?;

        if let Err(e) = self.sync_pairs(connector).await {
            warn!(exchange = name, error = %e, "Initial pair sync failed");
        }
        Ok(())
    }

    /// Fetches the listed symbols for every asset class and applies them to
    /// the available sets.
    pub async fn sync_pairs(&self, connector: &dyn ExchangeConnector) -> Result<()> {
        let name = connector.name();
        for asset in self.pairs.asset_classes(name).await? {
            let update = connector.fetch_symbols(asset).await?;
            if let Ingested::Pairs { diff, disabled } = self.ingestor.ingest(update).await? {
                info!(
                    exchange = name,
                    asset = %asset,
                    new = diff.new_pairs.len(),
                    removed = diff.removed_pairs.len(),
                    disabled = disabled.len(),
                    "Synced pairs"
                );
            }
        }
        Ok(())
    }

    /// Refetches depth for every enabled pair. Returns how many books were
    /// updated; pairs that fail are logged and skipped.
    pub async fn refresh_orderbooks(&self, connector: &dyn ExchangeConnector) -> Result<usize> {
        self.poll(connector, Poll::Orderbook).await
    }

    /// Refetches tickers for every enabled pair.
    pub async fn refresh_tickers(&self, connector: &dyn ExchangeConnector) -> Result<usize> {
        self.poll(connector, Poll::Ticker).await
    }

    async fn poll(&self, connector: &dyn ExchangeConnector, kind: Poll) -> Result<usize> {
        let name = connector.name();
        let format = self.pairs.request_format(name).await?;
        let mut updated = 0;

        for asset in self.pairs.asset_classes(name).await? {
            let pairs = self.pairs.enabled_pairs(name, asset).await?;
            let fetches = pairs.iter().map(|pair| {
                let symbol = format.format(pair);
                async move {
                    let result = match kind {
                        Poll::Orderbook => connector.fetch_orderbook(pair, &symbol, asset).await,
                        Poll::Ticker => connector.fetch_ticker(pair, &symbol, asset).await,
                    };
                    (pair, result)
                }
            });

            for (pair, result) in join_all(fetches).await {
                let outcome = match result {
                    Ok(update) => self.apply(update).await,
                    Err(e) => Err(e),
                };
                match outcome {
                    Ok(()) => updated += 1,
                    Err(e) => error!(
                        exchange = name,
                        pair = %pair,
                        asset = %asset,
                        error = %e,
                        "Failed to refresh {}",
                        kind.as_str()
                    ),
                }
            }
        }
        Ok(updated)
    }

    async fn apply(&self, update: MarketUpdate) -> Result<()> {
        self.ingestor.ingest(update).await.map(|_| ())
    }

    /// Logs bid/ask totals for every held book and the price range across
    /// exchanges for every ticked pair.
    pub fn log_depth_summary(&self) {
        for exchange in self.registry.exchanges() {
            let Ok(snapshots) = self.registry.get_by_exchange(&exchange) else {
                continue;
            };
            for snapshot in snapshots {
                let (bid_amount, bid_value) = snapshot.total_bids();
                let (ask_amount, ask_value) = snapshot.total_asks();
                info!(
                    exchange = %exchange,
                    pair = %snapshot.pair,
                    asset = %snapshot.asset,
                    bid_amount,
                    bid_value,
                    ask_amount,
                    ask_value,
                    "Orderbook depth"
                );
            }
        }

        let mut seen = HashSet::new();
        for item in self.stats.items() {
            if !seen.insert((item.pair.clone(), item.asset)) {
                continue;
            }
            let ranked = self
                .stats
                .sort_exchanges_by_price(&item.pair, item.asset, false);
            if let (Some(low), Some(high)) = (ranked.first(), ranked.last()) {
                info!(
                    pair = %item.pair,
                    asset = %item.asset,
                    exchanges = ranked.len(),
                    cheapest = %low.exchange,
                    low = low.price,
                    dearest = %high.exchange,
                    high = high.price,
                    "Ticker range"
                );
            }
        }
    }

    /// Bootstraps one exchange then polls it until shutdown is signalled.
    pub async fn run_exchange(
        self: Arc<Self>,
        connector: Arc<dyn ExchangeConnector>,
        config: Arc<AggregatorConfig>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let name = connector.name().to_string();
        if let Err(e) = self.bootstrap(connector.as_ref()).await {
            error!(exchange = %name, error = %e, "Failed to register exchange");
            return;
        }
        info!(exchange = %name, "Polling exchange");

        let mut pairs_tick = interval(config.pairs_interval);
        let mut orderbook_tick = interval(config.orderbook_interval);
        let mut ticker_tick = interval(config.ticker_interval);
        for tick in [&mut pairs_tick, &mut orderbook_tick, &mut ticker_tick] {
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        }
        // bootstrap already synced
        pairs_tick.tick().await;

        loop {
            tokio::select! {
                _ = pairs_tick.tick() => {
                    if let Err(e) = self.sync_pairs(connector.as_ref()).await {
                        warn!(exchange = %name, error = %e, "Pair sync failed");
                    }
                }
                _ = orderbook_tick.tick() => {
                    match self.refresh_orderbooks(connector.as_ref()).await {
                        Ok(updated) => debug!(exchange = %name, updated, "Refreshed orderbooks"),
                        Err(e) => warn!(exchange = %name, error = %e, "Orderbook refresh failed"),
                    }
                }
                _ = ticker_tick.tick() => {
                    match self.refresh_tickers(connector.as_ref()).await {
                        Ok(updated) => debug!(exchange = %name, updated, "Refreshed tickers"),
                        Err(e) => warn!(exchange = %name, error = %e, "Ticker refresh failed"),
                    }
                }
                _ = shutdown.changed() => {
                    info!(exchange = %name, "Stopping exchange loop");
                    break;
                }
            }
        }
    }
}
