use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A currency code such as "BTC" or "USD". Stored uppercase, so comparisons
/// are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Currency {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl From<String> for Currency {
    fn from(code: String) -> Self {
        Self::new(code)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

/// Represents a pair of currencies being traded, e.g. BTC/USD.
///
/// `delimiter` records how the pair was written when it was built. It is
/// rendering metadata only: two pairs are equal when their currencies are,
/// in the same order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrencyPair {
    /// Base currency (e.g., BTC)
    pub first: Currency,
    /// Quote currency (e.g., USD)
    pub second: Currency,
    #[serde(default)]
    pub delimiter: String,
}

impl CurrencyPair {
    pub fn new(first: impl Into<Currency>, second: impl Into<Currency>) -> Self {
        Self::with_delimiter(first, second, "")
    }

    pub fn with_delimiter(
        first: impl Into<Currency>,
        second: impl Into<Currency>,
        delimiter: &str,
    ) -> Self {
        Self {
            first: first.into(),
            second: second.into(),
            delimiter: delimiter.to_string(),
        }
    }

    /// The same instrument quoted the other way round.
    pub fn swap(&self) -> Self {
        Self {
            first: self.second.clone(),
            second: self.first.clone(),
            delimiter: self.delimiter.clone(),
        }
    }

    /// Compares currencies. With `symmetric` set, USD/BTC also matches BTC/USD.
    pub fn equal(&self, other: &CurrencyPair, symmetric: bool) -> bool {
        if self == other {
            return true;
        }
        symmetric && self.first == other.second && self.second == other.first
    }

    pub fn is_empty(&self) -> bool {
        self.first.is_empty() && self.second.is_empty()
    }
}

impl PartialEq for CurrencyPair {
    fn eq(&self, other: &Self) -> bool {
        self.first == other.first && self.second == other.second
    }
}

impl Eq for CurrencyPair {}

impl Hash for CurrencyPair {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.first.hash(state);
        self.second.hash(state);
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.first, self.delimiter, self.second)
    }
}
