pub mod binance;
pub mod coinbase;

use async_trait::async_trait;
use common::{
    models::{AssetClass, CurrencyPair, ExchangeDefaults, Item, MarketUpdate},
    Error, Result,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

pub use binance::BinanceConnector;
pub use coinbase::CoinbaseConnector;

/// Trait defining the interface for exchange API clients.
///
/// Connectors only fetch and decode. Everything they return is a
/// [`MarketUpdate`] for the core to ingest; they hold no market state.
#[async_trait]
pub trait ExchangeConnector: Send + Sync {
    /// Name the exchange is configured under
    fn name(&self) -> &str;

    /// Pair formats, asset classes and starter pairs for a fresh config
    fn defaults(&self) -> ExchangeDefaults;

    /// Every symbol currently listed, rendered in the config format
    async fn fetch_symbols(&self, asset: AssetClass) -> Result<MarketUpdate>;

    /// Full depth for a pair. `symbol` is the pair in the request format.
    async fn fetch_orderbook(
        &self,
        pair: &CurrencyPair,
        symbol: &str,
        asset: AssetClass,
    ) -> Result<MarketUpdate>;

    /// Last price and 24h volume for a pair
    async fn fetch_ticker(
        &self,
        pair: &CurrencyPair,
        symbol: &str,
        asset: AssetClass,
    ) -> Result<MarketUpdate>;
}

/// Builds the connector for a configured exchange name.
pub fn connector(name: &str, timeout: Duration) -> Result<Arc<dyn ExchangeConnector>> {
    match name.trim().to_lowercase().as_str() {
        binance::NAME => Ok(Arc::new(BinanceConnector::with_timeout(timeout)?)),
        coinbase::NAME => Ok(Arc::new(CoinbaseConnector::with_timeout(timeout)?)),
        other => Err(Error::ConfigError(format!("no connector for exchange '{}'", other))),
    }
}

fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(Error::HttpError)
}

fn ensure_spot(exchange: &str, asset: AssetClass) -> Result<()> {
    match asset {
        AssetClass::Spot => Ok(()),
        other => Err(Error::ExchangeError(format!(
            "{} connector does not support {} markets",
            exchange, other
        ))),
    }
}

/// Returns the body of a successful response, or the exchange's error text.
async fn read_body(exchange: &str, response: reqwest::Response) -> Result<String> {
    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        error!("{} API error: {} - {}", exchange, status, error_text);
        return Err(Error::ExchangeError(format!(
            "{} API error: {} - {}",
            exchange, status, error_text
        )));
    }
    response.text().await.map_err(Error::HttpError)
}

fn decode<T: DeserializeOwned>(exchange: &str, what: &str, body: &str) -> Result<T> {
    serde_json::from_str(body)
        .map_err(|e| Error::ParseError(format!("Failed to parse {} {}: {}", exchange, what, e)))
}

fn parse_number(field: &str, raw: &str) -> Result<f64> {
    raw.parse::<f64>()
        .map_err(|e| Error::ParseError(format!("Failed to parse {} '{}': {}", field, raw, e)))
}

/// Book cells arrive as decimal strings on some venues and bare numbers on
/// others, sometimes within one row.
fn cell_value(cell: &Value) -> Result<f64> {
    match cell {
        Value::String(raw) => parse_number("level", raw),
        Value::Number(number) => number
            .as_f64()
            .ok_or_else(|| Error::ParseError(format!("level {} is not a float", number))),
        other => Err(Error::ParseError(format!("unexpected level cell {}", other))),
    }
}

/// Decodes `[price, amount, ...]` rows. Trailing cells are ignored.
fn levels(rows: &[Vec<Value>]) -> Result<Vec<Item>> {
    rows.iter()
        .map(|row| match row.as_slice() {
            [price, amount, ..] => Ok(Item::new(cell_value(price)?, cell_value(amount)?)),
            _ => Err(Error::ParseError(format!(
                "level row has {} cells, expected at least 2",
                row.len()
            ))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(json!("0.01634790"), 0.0163479)]
    #[case(json!(3), 3.0)]
    #[case(json!(2.5), 2.5)]
    fn cells_accept_strings_and_numbers(#[case] cell: Value, #[case] expected: f64) {
        assert_eq!(cell_value(&cell).unwrap(), expected);
    }

    #[rstest]
    #[case(json!(null))]
    #[case(json!("abc"))]
    #[case(json!([1]))]
    fn cells_reject_other_shapes(#[case] cell: Value) {
        assert!(matches!(cell_value(&cell), Err(Error::ParseError(_))));
    }

    #[test]
    fn levels_take_the_first_two_cells() {
        let rows: Vec<Vec<Value>> = serde_json::from_str(r#"[["100.5", "2", 7], [99, "1.25"]]"#).unwrap();
        assert_eq!(
            levels(&rows).unwrap(),
            vec![Item::new(100.5, 2.0), Item::new(99.0, 1.25)]
        );

        let short: Vec<Vec<Value>> = serde_json::from_str(r#"[["100.5"]]"#).unwrap();
        assert!(levels(&short).is_err());
    }

    #[test]
    fn builds_connectors_by_name() {
        let timeout = Duration::from_secs(5);
        assert_eq!(connector("Binance", timeout).unwrap().name(), "binance");
        assert_eq!(connector("coinbase", timeout).unwrap().name(), "coinbase");
        assert!(matches!(connector("kraken", timeout), Err(Error::ConfigError(_))));
    }

    #[test]
    fn only_spot_is_supported() {
        assert!(ensure_spot("binance", AssetClass::Spot).is_ok());
        assert!(ensure_spot("binance", AssetClass::Futures).is_err());
    }
}
