use common::models::{
    AssetClass, CurrencyPair, DepthUpdate, ExchangeConfig, ExchangeDefaults, Item, MarketUpdate,
    PairFormat, SymbolList, TickerUpdate,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use store::{
    ConfigStore, Ingested, Ingestor, MemoryConfigStore, OrderbookRegistry, PairSetManager,
    StoreError, TickerStats,
};

/// Memory store whose writes can be switched off
#[derive(Default)]
struct ReadOnlyAfterStart {
    inner: MemoryConfigStore,
    read_only: AtomicBool,
}

#[async_trait]
impl ConfigStore for ReadOnlyAfterStart {
    async fn get_exchange_config(&self, name: &str) -> Result<ExchangeConfig, StoreError> {
        self.inner.get_exchange_config(name).await
    }

    async fn update_exchange_config(&self, config: &ExchangeConfig) -> Result<(), StoreError> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(StoreError::WriteError("read-only filesystem".to_string()));
        }
        self.inner.update_exchange_config(config).await
    }
}

struct Harness {
    registry: Arc<OrderbookRegistry>,
    pairs: Arc<PairSetManager>,
    stats: Arc<TickerStats>,
    ingestor: Ingestor,
}

async fn harness() -> Harness {
    let config = ExchangeConfig::new("coinbase").with_enabled_pairs(AssetClass::Spot, "BTC-USD,ZZZ-USD");
    harness_with(Arc::new(MemoryConfigStore::with_exchanges([config]))).await
}

async fn harness_with(store: Arc<dyn ConfigStore>) -> Harness {
    let pairs = Arc::new(PairSetManager::new(store));
    let defaults = ExchangeDefaults {
        request_format: PairFormat::new("-", true),
        config_format: PairFormat::new("-", true),
        asset_classes: vec![AssetClass::Spot],
        supports_auto_pair_updates: true,
        enabled_pairs: Vec::new(),
    };
    pairs.register("coinbase", &defaults).await.unwrap();

    let registry = Arc::new(OrderbookRegistry::new());
    let stats = Arc::new(TickerStats::new());
    let ingestor = Ingestor::new(Arc::clone(&registry), Arc::clone(&pairs), Arc::clone(&stats));
    Harness {
        registry,
        pairs,
        stats,
        ingestor,
    }
}

#[tokio::test]
async fn depth_updates_land_in_the_registry() {
    let h = harness().await;
    let update = MarketUpdate::Orderbook(DepthUpdate {
        exchange: "coinbase".to_string(),
        pair: CurrencyPair::new("BTC", "USD"),
        asset: AssetClass::Spot,
        bids: vec![Item::new(100.0, 1.0)],
        asks: vec![Item::new(101.0, 2.0)],
    });

    let Ingested::Orderbook(snapshot) = h.ingestor.ingest(update).await.unwrap() else {
        panic!("expected an orderbook");
    };
    assert_eq!(snapshot.best_ask(), Some(Item::new(101.0, 2.0)));
    assert!(h
        .registry
        .get("coinbase", &CurrencyPair::new("BTC", "USD"), AssetClass::Spot)
        .is_ok());
}

#[tokio::test]
async fn tickers_land_in_the_stats() {
    let h = harness().await;
    let update = MarketUpdate::Ticker(TickerUpdate {
        exchange: "coinbase".to_string(),
        pair: CurrencyPair::new("BTC", "USD"),
        asset: AssetClass::Spot,
        last: 30_000.0,
        volume: 12.5,
    });

    assert!(matches!(h.ingestor.ingest(update).await.unwrap(), Ingested::Ticker));
    assert_eq!(h.stats.len(), 1);
}

#[tokio::test]
async fn symbol_lists_update_available_and_repair_enabled() {
    let h = harness().await;
    let update = MarketUpdate::Symbols(SymbolList {
        exchange: "coinbase".to_string(),
        asset: AssetClass::Spot,
        symbols: vec!["BTC-USD".to_string(), "eth-usd".to_string()],
    });

    let Ingested::Pairs { diff, disabled } = h.ingestor.ingest(update).await.unwrap() else {
        panic!("expected a pair update");
    };
    assert_eq!(
        diff.new_pairs,
        vec![CurrencyPair::new("BTC", "USD"), CurrencyPair::new("ETH", "USD")]
    );
    assert_eq!(disabled, vec![CurrencyPair::new("ZZZ", "USD")]);
    assert_eq!(
        h.pairs.enabled_pairs("coinbase", AssetClass::Spot).await.unwrap(),
        vec![CurrencyPair::new("BTC", "USD")]
    );
}

#[tokio::test]
async fn empty_symbol_list_is_an_error() {
    let h = harness().await;
    let update = MarketUpdate::Symbols(SymbolList {
        exchange: "coinbase".to_string(),
        asset: AssetClass::Spot,
        symbols: Vec::new(),
    });

    let err = h.ingestor.ingest(update).await.unwrap_err();
    assert!(matches!(err, common::Error::EmptyInput(_)));
}

#[tokio::test]
async fn failed_save_still_repairs_enabled_pairs() {
    let store = Arc::new(ReadOnlyAfterStart::default());
    store
        .inner
        .insert(ExchangeConfig::new("coinbase").with_enabled_pairs(AssetClass::Spot, "ZZZ-USD"));
    let h = harness_with(store.clone()).await;
    store.read_only.store(true, Ordering::SeqCst);

    let update = MarketUpdate::Symbols(SymbolList {
        exchange: "coinbase".to_string(),
        asset: AssetClass::Spot,
        symbols: vec!["BTC-USD".to_string(), "LTC-USD".to_string()],
    });
    let err = h.ingestor.ingest(update).await.unwrap_err();
    assert!(matches!(err, common::Error::ConfigPersistence(_)), "got {err:?}");

    let listed = [CurrencyPair::new("BTC", "USD"), CurrencyPair::new("LTC", "USD")];
    assert_eq!(
        h.pairs.available_pairs("coinbase", AssetClass::Spot).await.unwrap(),
        listed.to_vec()
    );
    let enabled = h.pairs.enabled_pairs("coinbase", AssetClass::Spot).await.unwrap();
    assert_eq!(enabled.len(), 1);
    assert!(listed.contains(&enabled[0]), "{enabled:?} not drawn from listed pairs");
}
