use crate::models::{Currency, CurrencyPair};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// How an exchange renders pairs, either on the wire (request format) or in
/// persisted configuration (config format).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairFormat {
    /// Text between the two currencies; empty means concatenated ("BTCUSD")
    #[serde(default)]
    pub delimiter: String,
    pub uppercase: bool,
    /// Joins several pairs into one request parameter
    #[serde(default)]
    pub separator: String,
    /// Anchor currency used to split concatenated symbols ("BTCDOGE" with index BTC)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<Currency>,
}

impl PairFormat {
    pub fn new(delimiter: &str, uppercase: bool) -> Self {
        Self {
            delimiter: delimiter.to_string(),
            uppercase,
            ..Self::default()
        }
    }

    pub fn with_separator(mut self, separator: &str) -> Self {
        self.separator = separator.to_string();
        self
    }

    pub fn with_index(mut self, index: impl Into<Currency>) -> Self {
        self.index = Some(index.into());
        self
    }

    fn case(&self, code: &Currency) -> String {
        if self.uppercase {
            code.as_str().to_string()
        } else {
            code.as_str().to_lowercase()
        }
    }

    pub fn format(&self, pair: &CurrencyPair) -> String {
        format!(
            "{}{}{}",
            self.case(&pair.first),
            self.delimiter,
            self.case(&pair.second)
        )
    }

    /// Renders every pair and joins them with the separator.
    pub fn format_pairs(&self, pairs: &[CurrencyPair]) -> String {
        pairs
            .iter()
            .map(|pair| self.format(pair))
            .collect::<Vec<_>>()
            .join(&self.separator)
    }

    /// Splits a raw exchange symbol into a pair.
    ///
    /// The delimiter is tried first, then the index currency as a prefix or
    /// suffix. A symbol neither can split is rejected rather than guessed at,
    /// since currency codes run anywhere from 3 to 5 characters.
    pub fn parse(&self, raw: &str) -> Result<CurrencyPair> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(Error::InvalidFormat("empty symbol".to_string()));
        }

        if !self.delimiter.is_empty() {
            if let Some((first, second)) = raw.split_once(self.delimiter.as_str()) {
                if first.is_empty() || second.is_empty() {
                    return Err(Error::InvalidFormat(format!(
                        "{raw}: missing currency around delimiter {:?}",
                        self.delimiter
                    )));
                }
                return Ok(CurrencyPair::with_delimiter(first, second, &self.delimiter));
            }
        }

        if let Some(index) = self.index.as_ref().filter(|index| !index.is_empty()) {
            let symbol = raw.to_uppercase();
            let index = index.as_str();
            if symbol.len() > index.len() {
                if let Some(rest) = symbol.strip_prefix(index) {
                    return Ok(CurrencyPair::new(index, rest));
                }
                if let Some(rest) = symbol.strip_suffix(index) {
                    return Ok(CurrencyPair::new(rest, index));
                }
            }
            return Err(Error::InvalidFormat(format!(
                "{raw}: neither starts nor ends with index currency {index}"
            )));
        }

        Err(Error::InvalidFormat(format!(
            "{raw}: no delimiter {:?} and no index currency to split on",
            self.delimiter
        )))
    }

    /// Parses a comma-joined pair list as stored in configuration. Entries
    /// that cannot be split are handed back untouched.
    pub fn parse_list(&self, list: &str) -> (Vec<CurrencyPair>, Vec<String>) {
        let mut pairs = Vec::new();
        let mut rejected = Vec::new();
        for entry in list.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            match self.parse(entry) {
                Ok(pair) => pairs.push(pair),
                Err(_) => rejected.push(entry.to_string()),
            }
        }
        (pairs, rejected)
    }
}
