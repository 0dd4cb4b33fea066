use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Exchange API error: {0}")]
    ExchangeError(String),

    #[error("Parsing error: {0}")]
    ParseError(String),

    #[error("Not found: {0}")]
    NotFound(#[from] NotFound),

    #[error("Invalid pair format: {0}")]
    InvalidFormat(String),

    #[error("Empty pair list for {0}")]
    EmptyInput(String),

    #[error("Config persistence error: {0}")]
    ConfigPersistence(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Why a lookup came back empty.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotFound {
    #[error("no orderbooks for exchange {0}")]
    Exchange(String),

    #[error("{exchange} has no orderbook with first currency {currency}")]
    FirstCurrency { exchange: String, currency: String },

    #[error("{exchange} has no orderbook for {pair}")]
    SecondCurrency { exchange: String, pair: String },

    #[error("{exchange} has no {asset} orderbook for {pair}")]
    AssetClass {
        exchange: String,
        pair: String,
        asset: String,
    },

    #[error("no pair configuration for exchange {0}")]
    ExchangeConfig(String),

    #[error("{exchange} has no {asset} pair set")]
    PairSet { exchange: String, asset: String },
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// The lookup reason, if this is a not-found error.
    pub fn not_found(&self) -> Option<&NotFound> {
        match self {
            Error::NotFound(reason) => Some(reason),
            _ => None,
        }
    }
}
