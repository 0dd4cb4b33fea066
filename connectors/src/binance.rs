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

pub const NAME: &str = "binance";

const BINANCE_API_URL: &str = "https://api.binance.com/api/v3";
const DEPTH_LIMIT: u32 = 100;

pub struct BinanceConnector {
    client: reqwest::Client,
}

impl Default for BinanceConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl BinanceConnector {
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
        let url = format!("{}/{}", BINANCE_API_URL, path);
        debug!("Fetching {} from Binance", url);

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(Error::HttpError)?;
        read_body("Binance", response).await
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BinanceSymbol {
    status: String,
    base_asset: String,
    quote_asset: String,
}

#[derive(Debug, Deserialize)]
struct ExchangeInfo {
    symbols: Vec<BinanceSymbol>,
}

#[derive(Debug, Deserialize)]
struct BinanceDepth {
    bids: Vec<Vec<Value>>,
    asks: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct Binance24hTicker {
    #[serde(rename = "lastPrice")]
    last_price: String,
    volume: String,
}

/// Keeps symbols that are currently trading, as BASE-QUOTE.
fn parse_symbols(body: &str) -> Result<MarketUpdate> {
    let info: ExchangeInfo = decode("Binance", "exchange info", body)?;
    let symbols = info
        .symbols
        .into_iter()
        .filter(|symbol| symbol.status == "TRADING")
        .map(|symbol| format!("{}-{}", symbol.base_asset, symbol.quote_asset))
        .collect();

    Ok(MarketUpdate::Symbols(SymbolList {
        exchange: NAME.to_string(),
        asset: AssetClass::Spot,
        symbols,
    }))
}

fn parse_depth(pair: &CurrencyPair, body: &str) -> Result<MarketUpdate> {
    let depth: BinanceDepth = decode("Binance", "depth", body)?;
    Ok(MarketUpdate::Orderbook(DepthUpdate {
        exchange: NAME.to_string(),
        pair: pair.clone(),
        asset: AssetClass::Spot,
        bids: levels(&depth.bids)?,
        asks: levels(&depth.asks)?,
    }))
}

fn parse_ticker(pair: &CurrencyPair, body: &str) -> Result<MarketUpdate> {
    let ticker: Binance24hTicker = decode("Binance", "ticker", body)?;
    Ok(MarketUpdate::Ticker(TickerUpdate {
        exchange: NAME.to_string(),
        pair: pair.clone(),
        asset: AssetClass::Spot,
        last: parse_number("price", &ticker.last_price)?,
        volume: parse_number("volume", &ticker.volume)?,
    }))
}

#[async_trait]
impl ExchangeConnector for BinanceConnector {
    fn name(&self) -> &str {
        NAME
    }

    fn defaults(&self) -> ExchangeDefaults {
        ExchangeDefaults {
            request_format: PairFormat::new("", true).with_separator(","),
            config_format: PairFormat::new("-", true),
            asset_classes: vec![AssetClass::Spot],
            supports_auto_pair_updates: true,
            enabled_pairs: vec!["BTC-USDT".to_string(), "ETH-USDT".to_string()],
        }
    }

    async fn fetch_symbols(&self, asset: AssetClass) -> Result<MarketUpdate> {
        ensure_spot(NAME, asset)?;
        let body = self.get("exchangeInfo", &[]).await?;
        parse_symbols(&body)
    }

    async fn fetch_orderbook(
        &self,
        pair: &CurrencyPair,
        symbol: &str,
        asset: AssetClass,
    ) -> Result<MarketUpdate> {
        ensure_spot(NAME, asset)?;
        let limit = DEPTH_LIMIT.to_string();
        let body = self
            .get("depth", &[("symbol", symbol), ("limit", limit.as_str())])
            .await?;
        parse_depth(pair, &body)
    }

    async fn fetch_ticker(
        &self,
        pair: &CurrencyPair,
        symbol: &str,
        asset: AssetClass,
    ) -> Result<MarketUpdate> {
        ensure_spot(NAME, asset)?;
        let body = self.get("ticker/24hr", &[("symbol", symbol)]).await?;
        parse_ticker(pair, &body)
    }
}
