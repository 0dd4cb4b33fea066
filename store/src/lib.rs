mod config;
mod error;
mod ingest;
mod orderbook;
mod pairs;
mod stats;

pub use config::{ConfigStore, MemoryConfigStore};
pub use error::StoreError;
pub use ingest::{Ingested, Ingestor};
pub use orderbook::OrderbookRegistry;
pub use pairs::{PairDiff, PairSet, PairSetManager, PAIRS_STALE_AFTER_DAYS};
pub use stats::{StatItem, TickerStats};
