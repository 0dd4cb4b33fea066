use common::models::{AssetClass, Currency, CurrencyPair, Item};
use common::{Error, NotFound};
use rstest::rstest;
use std::sync::Arc;
use store::OrderbookRegistry;

fn btc_usd() -> CurrencyPair {
    CurrencyPair::new("BTC", "USD")
}

fn book(levels: &[(f64, f64)]) -> Vec<Item> {
    levels.iter().map(|&(price, amount)| Item::new(price, amount)).collect()
}

fn seeded() -> OrderbookRegistry {
    let registry = OrderbookRegistry::new();
    registry.process(
        "Exchange",
        &btc_usd(),
        AssetClass::Spot,
        book(&[(100.0, 10.0)]),
        book(&[(101.0, 5.0)]),
    );
    registry
}

#[test]
fn process_then_get_returns_the_snapshot() {
    let registry = seeded();
    let snapshot = registry.get("Exchange", &btc_usd(), AssetClass::Spot).unwrap();

    assert_eq!(snapshot.exchange, "Exchange");
    assert_eq!(snapshot.pair, btc_usd());
    assert_eq!(snapshot.bids, book(&[(100.0, 10.0)]));
    assert_eq!(snapshot.asks, book(&[(101.0, 5.0)]));
    assert_eq!(registry.len(), 1);
}

#[test]
fn process_replaces_instead_of_merging() {
    let registry = seeded();
    registry.process(
        "Exchange",
        &btc_usd(),
        AssetClass::Spot,
        book(&[(99.0, 1.0), (98.0, 2.0)]),
        Vec::new(),
    );

    let snapshot = registry.get("Exchange", &btc_usd(), AssetClass::Spot).unwrap();
    assert_eq!(snapshot.bids, book(&[(99.0, 1.0), (98.0, 2.0)]));
    assert!(snapshot.asks.is_empty());
    assert_eq!(registry.len(), 1);
}

#[test]
fn readers_keep_the_snapshot_they_fetched() {
    let registry = seeded();
    let before = registry.get("Exchange", &btc_usd(), AssetClass::Spot).unwrap();
    registry.process("Exchange", &btc_usd(), AssetClass::Spot, Vec::new(), Vec::new());

    assert_eq!(before.bids.len(), 1);
    assert!(registry
        .get("Exchange", &btc_usd(), AssetClass::Spot)
        .unwrap()
        .bids
        .is_empty());
}

#[test]
fn last_updated_strictly_increases() {
    let registry = OrderbookRegistry::new();
    let mut previous = None;
    for _ in 0..100 {
        let snapshot = registry.process("Exchange", &btc_usd(), AssetClass::Spot, Vec::new(), Vec::new());
        if let Some(previous) = previous {
            assert!(snapshot.last_updated > previous);
        }
        previous = Some(snapshot.last_updated);
    }
}

#[rstest]
#[case("Missing", CurrencyPair::new("BTC", "USD"), AssetClass::Spot, NotFound::Exchange("Missing".into()))]
#[case(
    "Exchange",
    CurrencyPair::new("LTC", "USD"),
    AssetClass::Spot,
    NotFound::FirstCurrency { exchange: "Exchange".into(), currency: "LTC".into() }
)]
#[case(
    "Exchange",
    CurrencyPair::new("BTC", "AUD"),
    AssetClass::Spot,
    NotFound::SecondCurrency { exchange: "Exchange".into(), pair: "BTCAUD".into() }
)]
#[case(
    "Exchange",
    CurrencyPair::new("BTC", "USD"),
    AssetClass::Futures,
    NotFound::AssetClass { exchange: "Exchange".into(), pair: "BTCUSD".into(), asset: "futures".into() }
)]
fn get_reports_why_nothing_matched(
    #[case] exchange: &str,
    #[case] pair: CurrencyPair,
    #[case] asset: AssetClass,
    #[case] reason: NotFound,
) {
    let registry = seeded();
    match registry.get(exchange, &pair, asset) {
        Err(Error::NotFound(actual)) => assert_eq!(actual, reason),
        other => panic!("expected not found, got {other:?}"),
    }
}

#[test]
fn exact_get_does_not_match_reversed_pair() {
    let registry = seeded();
    assert!(registry.get("Exchange", &btc_usd().swap(), AssetClass::Spot).is_err());
}

#[test]
fn get_symmetric_falls_back_to_reversed_pair() {
    let registry = seeded();
    let snapshot = registry
        .get_symmetric("Exchange", &btc_usd().swap(), AssetClass::Spot)
        .unwrap();
    assert_eq!(snapshot.pair, btc_usd());

    let err = registry
        .get_symmetric("Missing", &btc_usd(), AssetClass::Spot)
        .unwrap_err();
    assert_eq!(err.not_found(), Some(&NotFound::Exchange("Missing".into())));

    let err = registry
        .get_symmetric("Exchange", &CurrencyPair::new("ETH", "USD"), AssetClass::Spot)
        .unwrap_err();
    assert!(matches!(err.not_found(), Some(NotFound::FirstCurrency { .. })));
}

#[test]
fn pairs_are_case_insensitive() {
    let registry = OrderbookRegistry::new();
    registry.process(
        "Exchange",
        &CurrencyPair::with_delimiter("btc", "usd", "-"),
        AssetClass::Spot,
        Vec::new(),
        Vec::new(),
    );
    assert!(registry.get("Exchange", &btc_usd(), AssetClass::Spot).is_ok());
}

#[test]
fn asset_classes_are_kept_apart() {
    let registry = seeded();
    registry.process(
        "Exchange",
        &btc_usd(),
        AssetClass::Futures,
        book(&[(200.0, 1.0)]),
        Vec::new(),
    );

    let spot = registry.get("Exchange", &btc_usd(), AssetClass::Spot).unwrap();
    let futures = registry.get("Exchange", &btc_usd(), AssetClass::Futures).unwrap();
    assert_eq!(spot.bids, book(&[(100.0, 10.0)]));
    assert_eq!(futures.bids, book(&[(200.0, 1.0)]));
    assert_eq!(registry.len(), 2);
}

#[test]
fn get_by_exchange_orders_by_pair_then_asset() {
    let registry = seeded();
    registry.process("Exchange", &CurrencyPair::new("ETH", "USD"), AssetClass::Spot, Vec::new(), Vec::new());
    registry.process("Exchange", &CurrencyPair::new("BTC", "EUR"), AssetClass::Spot, Vec::new(), Vec::new());
    registry.process("Exchange", &btc_usd(), AssetClass::Margin, Vec::new(), Vec::new());
    registry.process("Other", &btc_usd(), AssetClass::Spot, Vec::new(), Vec::new());

    let keys: Vec<(String, AssetClass)> = registry
        .get_by_exchange("Exchange")
        .unwrap()
        .iter()
        .map(|snapshot| (snapshot.pair.to_string(), snapshot.asset))
        .collect();
    assert_eq!(
        keys,
        vec![
            ("BTCEUR".to_string(), AssetClass::Spot),
            ("BTCUSD".to_string(), AssetClass::Spot),
            ("BTCUSD".to_string(), AssetClass::Margin),
            ("ETHUSD".to_string(), AssetClass::Spot),
        ]
    );

    let err = registry.get_by_exchange("Missing").unwrap_err();
    assert_eq!(err.not_found(), Some(&NotFound::Exchange("Missing".into())));
    assert_eq!(registry.exchanges(), vec!["Exchange".to_string(), "Other".to_string()]);
}

#[test]
fn currency_existence_checks() {
    let registry = seeded();

    assert!(registry.first_currency_exists("Exchange", &Currency::new("btc")));
    assert!(!registry.first_currency_exists("Exchange", &Currency::new("USD")));
    assert!(!registry.first_currency_exists("Missing", &Currency::new("BTC")));

    assert!(registry.second_currency_exists("Exchange", &btc_usd()));
    assert!(!registry.second_currency_exists("Exchange", &btc_usd().swap()));
    assert!(!registry.second_currency_exists("Exchange", &CurrencyPair::new("BTC", "AUD")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writers_and_readers_see_whole_snapshots() {
    let registry = Arc::new(OrderbookRegistry::new());
    let codes = ["BTC", "ETH", "LTC", "XRP", "DOGE", "ADA", "SOL", "DOT"];

    let writers = codes.iter().map(|code| {
        let registry = Arc::clone(&registry);
        let pair = CurrencyPair::new(*code, "USD");
        tokio::spawn(async move {
            for i in 1..=50 {
                let depth = i as usize;
                let bids = vec![Item::new(i as f64, 1.0); depth];
                let asks = vec![Item::new(i as f64 + 1.0, 1.0); depth];
                registry.process("Exchange", &pair, AssetClass::Spot, bids, asks);
                tokio::task::yield_now().await;
            }
        })
    });

    let readers = codes.iter().map(|code| {
        let registry = Arc::clone(&registry);
        let pair = CurrencyPair::new(*code, "USD");
        tokio::spawn(async move {
            for _ in 0..50 {
                if let Ok(snapshot) = registry.get("Exchange", &pair, AssetClass::Spot) {
                    // bids and asks always come from the same write
                    assert_eq!(snapshot.bids.len(), snapshot.asks.len());
                    assert_eq!(snapshot.bids[0].price + 1.0, snapshot.asks[0].price);
                }
                tokio::task::yield_now().await;
            }
        })
    });

    let handles: Vec<_> = writers.chain(readers).collect();
    for result in futures::future::join_all(handles).await {
        result.unwrap();
    }

    assert_eq!(registry.len(), codes.len());
    for code in codes {
        let snapshot = registry
            .get("Exchange", &CurrencyPair::new(code, "USD"), AssetClass::Spot)
            .unwrap();
        assert_eq!(snapshot.bids.len(), 50);
        assert_eq!(snapshot.best_bid(), Some(Item::new(50.0, 1.0)));
    }
}
