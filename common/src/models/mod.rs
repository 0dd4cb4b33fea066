mod asset;
mod currency;
mod exchange;
mod format;
mod orderbook;
mod update;

pub use asset::AssetClass;
pub use currency::{Currency, CurrencyPair};
pub use exchange::{ExchangeConfig, ExchangeDefaults, PairStrings};
pub use format::PairFormat;
pub use orderbook::{calculate_totals, Item, OrderbookSnapshot};
pub use update::{DepthUpdate, MarketUpdate, SymbolList, TickerUpdate};
