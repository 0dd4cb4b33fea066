use crate::{decode, ensure_spot, http_client, levels, parse_number, read_body, ExchangeConnector};
use async_trait::async_trait;
use common::{
    models::{
        AssetClass, CurrencyPair, DepthUpdate, ExchangeDefaults, MarketUpdate, PairFormat,
        SymbolList, TickerUpdate,
    },
    Error, Result,
};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

pub const NAME: &str = "coinbase";

const COINBASE_PRO_API_URL: &str = "https://api.exchange.coinbase.com";

pub struct CoinbaseConnector {
    client: reqwest::Client,
}

impl Default for CoinbaseConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl CoinbaseConnector {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
        })
    }

    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<String> {
        let url = format!("{}/{}", COINBASE_PRO_API_URL, path);
        debug!("Fetching {} from Coinbase", url);

        // the exchange API rejects requests without a user agent
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, "market-core")
            .query(query)
            .send()
            .await
            .map_err(Error::HttpError)?;
        read_body("Coinbase", response).await
    }
}

#[derive(Debug, Deserialize)]
struct Product {
    id: String,
    status: String,
    #[serde(default)]
    trading_disabled: bool,
}

/// Level 2 book. Rows are `[price, size, num_orders]` with the first two as
/// strings and the order count as an integer.
#[derive(Debug, Deserialize)]
struct CoinbaseBook {
    bids: Vec<Vec<Value>>,
    asks: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct CoinbaseTicker {
    price: String,
    volume: String,
}

fn parse_products(body: &str) -> Result<MarketUpdate> {
    let products: Vec<Product> = decode("Coinbase", "products", body)?;
    let symbols = products
        .into_iter()
        .filter(|product| product.status == "online" && !product.trading_disabled)
        .map(|product| product.id)
        .collect();

    Ok(MarketUpdate::Symbols(SymbolList {
        exchange: NAME.to_string(),
        asset: AssetClass::Spot,
        symbols,
    }))
}

fn parse_book(pair: &CurrencyPair, body: &str) -> Result<MarketUpdate> {
    let book: CoinbaseBook = decode("Coinbase", "book", body)?;
    Ok(MarketUpdate::Orderbook(DepthUpdate {
        exchange: NAME.to_string(),
        pair: pair.clone(),
        asset: AssetClass::Spot,
        bids: levels(&book.bids)?,
        asks: levels(&book.asks)?,
    }))
}

fn parse_ticker(pair: &CurrencyPair, body: &str) -> Result<MarketUpdate> {
    let ticker: CoinbaseTicker = decode("Coinbase", "ticker", body)?;
    Ok(MarketUpdate::Ticker(TickerUpdate {
        exchange: NAME.to_string(),
        pair: pair.clone(),
        asset: AssetClass::Spot,
        last: parse_number("price", &ticker.price)?,
        volume: parse_number("volume", &ticker.volume)?,
    }))
}

#[async_trait]
impl ExchangeConnector for CoinbaseConnector {
    fn name(&self) -> &str {
        NAME
    }

    fn defaults(&self) -> ExchangeDefaults {
        ExchangeDefaults {
            request_format: PairFormat::new("-", true),
            config_format: PairFormat::new("-", true),
            asset_classes: vec![AssetClass::Spot],
            supports_auto_pair_updates: true,
            enabled_pairs: vec!["BTC-USD".to_string(), "ETH-USD".to_string()],
        }
    }

    async fn fetch_symbols(&self, asset: AssetClass) -> Result<MarketUpdate> {
        ensure_spot(NAME, asset)?;
        let body = self.get("products", &[]).await?;
        parse_products(&body)
    }

    async fn fetch_orderbook(
        &self,
        pair: &CurrencyPair,
        symbol: &str,
        asset: AssetClass,
    ) -> Result<MarketUpdate> {
        ensure_spot(NAME, asset)?;
        let path = format!("products/{}/book", symbol);
        let body = self.get(&path, &[("level", "2")]).await?;
        parse_book(pair, &body)
    }

    async fn fetch_ticker(
        &self,
        pair: &CurrencyPair,
        symbol: &str,
        asset: AssetClass,
    ) -> Result<MarketUpdate> {
        ensure_spot(NAME, asset)?;
        let path = format!("products/{}/ticker", symbol);
        let body = self.get(&path, &[]).await?;
        parse_ticker(pair, &body)
    }
}
