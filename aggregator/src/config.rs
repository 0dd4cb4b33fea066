use common::{Error, Result};
use std::collections::HashMap;
use std::time::Duration;

const DEFAULT_EXCHANGES: &str = "binance,coinbase";

/// Runtime settings for the aggregator
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatorConfig {
    /// Exchanges to poll, lowercase
    pub exchanges: Vec<String>,
    /// How often enabled orderbooks are refetched
    pub orderbook_interval: Duration,
    /// How often tickers are refetched
    pub ticker_interval: Duration,
    /// How often the available pair list is resynced
    pub pairs_interval: Duration,
    /// Per-request HTTP timeout
    pub http_timeout: Duration,
    /// Operator-chosen enabled pairs per exchange, config-formatted and comma-joined
    pub enabled_pairs: HashMap<String, String>,
}

impl AggregatorConfig {
    /// Create a new aggregator configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let exchanges: Vec<String> = lookup("AGGREGATOR_EXCHANGES")
            .unwrap_or_else(|| DEFAULT_EXCHANGES.to_string())
            .split(',')
            .map(|name| name.trim().to_lowercase())
            .filter(|name| !name.is_empty())
            .collect();
        if exchanges.is_empty() {
            return Err(Error::ConfigError(
                "AGGREGATOR_EXCHANGES names no exchanges".to_string(),
            ));
        }

        let seconds = |key: &str, default: u64| -> Result<Duration> {
            match lookup(key) {
                None => Ok(Duration::from_secs(default)),
                Some(raw) => match raw.trim().parse::<u64>() {
                    Ok(0) | Err(_) => Err(Error::ConfigError(format!(
                        "{} must be a positive number of seconds, got '{}'",
                        key, raw
                    ))),
                    Ok(secs) => Ok(Duration::from_secs(secs)),
                },
            }
        };

        let enabled_pairs = exchanges
            .iter()
            .filter_map(|name| {
                let key = format!("{}_ENABLED_PAIRS", name.to_uppercase());
                lookup(&key).map(|pairs| (name.clone(), pairs))
            })
            .collect();

        Ok(Self {
            orderbook_interval: seconds("ORDERBOOK_POLL_SECS", 10)?,
            ticker_interval: seconds("TICKER_POLL_SECS", 30)?,
            pairs_interval: seconds("PAIRS_SYNC_SECS", 3600)?,
            http_timeout: seconds("HTTP_TIMEOUT_SECS", 15)?,
            exchanges,
            enabled_pairs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = AggregatorConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.exchanges, vec!["binance", "coinbase"]);
        assert_eq!(config.orderbook_interval, Duration::from_secs(10));
        assert_eq!(config.ticker_interval, Duration::from_secs(30));
        assert_eq!(config.pairs_interval, Duration::from_secs(3600));
        assert_eq!(config.http_timeout, Duration::from_secs(15));
        assert!(config.enabled_pairs.is_empty());
    }

    #[test]
    fn reads_exchanges_and_their_pairs() {
        let config = AggregatorConfig::from_lookup(lookup(&[
            ("AGGREGATOR_EXCHANGES", " Coinbase , ,"),
            ("COINBASE_ENABLED_PAIRS", "BTC-USD,LTC-USD"),
            ("BINANCE_ENABLED_PAIRS", "BTC-USDT"),
            ("ORDERBOOK_POLL_SECS", "3"),
        ]))
        .unwrap();

        assert_eq!(config.exchanges, vec!["coinbase"]);
        assert_eq!(config.orderbook_interval, Duration::from_secs(3));
        assert_eq!(
            config.enabled_pairs.get("coinbase").map(String::as_str),
            Some("BTC-USD,LTC-USD")
        );
        assert!(!config.enabled_pairs.contains_key("binance"));
    }

    #[rstest]
    #[case("AGGREGATOR_EXCHANGES", " , ")]
    #[case("TICKER_POLL_SECS", "0")]
    #[case("PAIRS_SYNC_SECS", "hourly")]
    #[case("HTTP_TIMEOUT_SECS", "-1")]
    fn rejects_bad_values(#[case] key: &str, #[case] value: &str) {
        let err = AggregatorConfig::from_lookup(lookup(&[(key, value)])).unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)), "got {err:?}");
    }
}
