use crate::ConfigStore;
use chrono::{DateTime, Duration, TimeZone, Utc};
use common::{
    models::{AssetClass, CurrencyPair, ExchangeConfig, ExchangeDefaults, PairFormat},
    Error, NotFound, Result,
};
use dashmap::DashMap;
use rand::seq::SliceRandom;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Manually maintained pair lists older than this get a warning at registration
pub const PAIRS_STALE_AFTER_DAYS: i64 = 30;

/// Enabled and available pairs for one (exchange, asset class)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairSet {
    /// Everything the exchange currently lists
    pub available: Vec<CurrencyPair>,
    /// The subset the operator trades or watches
    pub enabled: Vec<CurrencyPair>,
}

impl PairSet {
    /// Directional membership test: BTC/USD does not match USD/BTC.
    pub fn contains(&self, pair: &CurrencyPair, enabled: bool) -> bool {
        self.pairs(enabled).iter().any(|p| p.equal(pair, false))
    }

    fn pairs(&self, enabled: bool) -> &Vec<CurrencyPair> {
        if enabled {
            &self.enabled
        } else {
            &self.available
        }
    }

    fn pairs_mut(&mut self, enabled: bool) -> &mut Vec<CurrencyPair> {
        if enabled {
            &mut self.enabled
        } else {
            &mut self.available
        }
    }
}

/// What a reconciliation changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairDiff {
    pub new_pairs: Vec<CurrencyPair>,
    pub removed_pairs: Vec<CurrencyPair>,
}

impl PairDiff {
    pub fn is_empty(&self) -> bool {
        self.new_pairs.is_empty() && self.removed_pairs.is_empty()
    }
}

#[derive(Debug)]
struct ExchangePairs {
    config: ExchangeConfig,
    request_format: PairFormat,
    config_format: PairFormat,
    sets: HashMap<AssetClass, PairSet>,
}

impl ExchangePairs {
    fn set(&self, exchange: &str, asset: AssetClass) -> Result<&PairSet> {
        self.sets.get(&asset).ok_or_else(|| {
            NotFound::PairSet {
                exchange: exchange.to_string(),
                asset: asset.to_string(),
            }
            .into()
        })
    }

    /// Writes the in-memory lists for `asset` back into the config view.
    fn sync_config(&mut self, asset: AssetClass) {
        let set = self.sets.entry(asset).or_default();
        let strings = self.config.pairs.entry(asset).or_default();
        strings.enabled = join_pairs(&self.config_format, &set.enabled);
        strings.available = join_pairs(&self.config_format, &set.available);
        if !self.config.asset_classes.contains(&asset) {
            self.config.asset_classes.push(asset);
        }
    }
}

fn join_pairs(format: &PairFormat, pairs: &[CurrencyPair]) -> String {
    pairs
        .iter()
        .map(|pair| format.format(pair))
        .collect::<Vec<_>>()
        .join(",")
}

/// Result of dropping enabled pairs that are not available
#[derive(Debug, Default)]
struct Repair {
    removed: Vec<CurrencyPair>,
    fallback: Option<CurrencyPair>,
}

/// Drops enabled pairs missing from available. Falls back to one random
/// available pair rather than leaving nothing enabled.
fn repair_enabled(set: &mut PairSet) -> Repair {
    let enabled = std::mem::take(&mut set.enabled);
    let (kept, removed): (Vec<_>, Vec<_>) = enabled
        .into_iter()
        .partition(|pair| set.available.iter().any(|p| p.equal(pair, false)));
    set.enabled = kept;

    let mut fallback = None;
    if set.enabled.is_empty() && !removed.is_empty() {
        fallback = set.available.choose(&mut rand::thread_rng()).cloned();
        set.enabled.extend(fallback.clone());
    }
    Repair { removed, fallback }
}

/// Stored format wins only when it already matches the connector's.
fn reconcile_format(stored: &mut Option<PairFormat>, default: &PairFormat) -> (PairFormat, bool) {
    match stored {
        Some(format) if format == default => (format.clone(), false),
        _ => {
            *stored = Some(default.clone());
            (default.clone(), true)
        }
    }
}

/// Owns every exchange's enabled/available pair sets and keeps the config
/// store in step with them.
///
/// Mutations for one exchange are serialised behind that exchange's lock;
/// different exchanges never wait on each other.
pub struct PairSetManager {
    store: Arc<dyn ConfigStore>,
    exchanges: DashMap<String, Arc<Mutex<ExchangePairs>>>,
}

impl PairSetManager {
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self {
            store,
            exchanges: DashMap::new(),
        }
    }

    fn handle(&self, exchange: &str) -> Result<Arc<Mutex<ExchangePairs>>> {
        self.exchanges
            .get(exchange)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| NotFound::ExchangeConfig(exchange.to_string()).into())
    }

    async fn persist(&self, state: &ExchangePairs) -> Result<()> {
        self.store
            .update_exchange_config(&state.config)
            .await
            .map_err(Error::from)
    }

    /// Loads an exchange's formats and pair sets from the config store,
    /// filling in connector defaults where the stored config is missing or
    /// disagrees. Registering again replaces the previous state in place,
    /// holding the exchange's lock so in-flight updates land either before
    /// the reload or on the reloaded state.
    pub async fn register(&self, exchange: &str, defaults: &ExchangeDefaults) -> Result<()> {
        let existing = self.handle(exchange).ok();
        let mut current = match &existing {
            Some(handle) => Some(handle.lock().await),
            None => None,
        };

        let mut config = self
            .store
            .get_exchange_config(exchange)
            .await
            .map_err(Error::from)?;
        let mut dirty = false;

        let (request_format, changed) =
            reconcile_format(&mut config.request_format, &defaults.request_format);
        dirty |= changed;
        let (config_format, changed) =
            reconcile_format(&mut config.config_format, &defaults.config_format);
        dirty |= changed;

        if config.asset_classes.is_empty() {
            config.asset_classes = defaults.asset_classes.clone();
            dirty = true;
        }

        if defaults.supports_auto_pair_updates {
            if !config.supports_auto_pair_updates {
                config.supports_auto_pair_updates = true;
                config.pairs_last_updated = 0;
                dirty = true;
            }
        } else {
            if config.pairs_last_updated == 0 {
                config.pairs_last_updated = Utc::now().timestamp();
                dirty = true;
            }
            // stored timestamps are untrusted; clamp rather than overflow
            let stale_at = config
                .pairs_last_updated
                .saturating_add(Duration::days(PAIRS_STALE_AFTER_DAYS).num_seconds());
            if stale_at <= Utc::now().timestamp() {
                warn!(
                    exchange,
                    days = PAIRS_STALE_AFTER_DAYS,
                    "Available pairs were last updated over the threshold ago, manual update required"
                );
            }
        }

        let mut state = ExchangePairs {
            config,
            request_format,
            config_format,
            sets: HashMap::new(),
        };

        let assets = state.config.asset_classes.clone();
        let primary = assets.first().copied().unwrap_or(AssetClass::Spot);
        for asset in assets {
            let strings = state.config.pairs.get(&asset).cloned().unwrap_or_default();
            let (available, rejected_available) = state.config_format.parse_list(&strings.available);
            let (mut enabled, rejected_enabled) = state.config_format.parse_list(&strings.enabled);
            for entry in rejected_available.iter().chain(rejected_enabled.iter()) {
                warn!(exchange, asset = %asset, entry, "Skipping unparsable configured pair");
            }

            if asset == primary && enabled.is_empty() && available.is_empty() {
                let (defaults_enabled, _) = state
                    .config_format
                    .parse_list(&defaults.enabled_pairs.join(","));
                enabled = defaults_enabled;
            }

            let mut set = PairSet { available, enabled };
            // Nothing to check against until the first symbol fetch
            if !set.available.is_empty() {
                let repair = repair_enabled(&mut set);
                if !repair.removed.is_empty() {
                    debug!(
                        exchange,
                        asset = %asset,
                        removed = %join_pairs(&state.config_format, &repair.removed),
                        "Removed enabled pairs missing from available pairs"
                    );
                }
            }

            state.sets.insert(asset, set);
            let before = state.config.pairs.get(&asset).cloned().unwrap_or_default();
            state.sync_config(asset);
            if state.config.pairs.get(&asset) != Some(&before) {
                dirty = true;
            }
        }

        let persisted = if dirty { self.persist(&state).await } else { Ok(()) };

        info!(
            exchange,
            assets = state.sets.len(),
            auto_updates = state.config.supports_auto_pair_updates,
            "Registered exchange pairs"
        );
        match current.as_deref_mut() {
            Some(previous) => *previous = state,
            None => {
                self.exchanges
                    .insert(exchange.to_string(), Arc::new(Mutex::new(state)));
            }
        }
        persisted
    }

    /// Applies a freshly fetched symbol list to the enabled or available set.
    ///
    /// Symbols are uppercased and parsed with the config format; ones that
    /// cannot be parsed are skipped. Without `force`, an unchanged list is a
    /// no-op and an empty list is refused as a likely failed fetch. With
    /// `force`, the set is replaced (or cleared) unconditionally. If the
    /// config store rejects the write, the in-memory sets keep the new list
    /// and the persistence error is returned.
    pub async fn reconcile(
        &self,
        exchange: &str,
        asset: AssetClass,
        fetched: &[String],
        enabled: bool,
        force: bool,
    ) -> Result<PairDiff> {
        let handle = self.handle(exchange)?;
        let mut state = handle.lock().await;
        let format = state.config_format.clone();
        let update_type = if enabled { "enabled" } else { "available" };

        let mut seen = HashSet::new();
        let mut products = Vec::new();
        for raw in fetched {
            let symbol = raw.trim().to_uppercase();
            if symbol.is_empty() {
                continue;
            }
            match format.parse(&symbol) {
                Ok(pair) => {
                    if seen.insert(format.format(&pair)) {
                        products.push(pair);
                    }
                }
                Err(err) => {
                    warn!(exchange, asset = %asset, symbol, error = %err, "Skipping symbol");
                }
            }
        }

        if products.is_empty() && !force {
            return Err(Error::EmptyInput(format!(
                "{} {} {} pairs",
                exchange, asset, update_type
            )));
        }

        let current = state.sets.entry(asset).or_default().pairs(enabled).clone();
        let current_keys: HashSet<String> = current.iter().map(|p| format.format(p)).collect();

        let diff = PairDiff {
            new_pairs: products
                .iter()
                .filter(|p| !current_keys.contains(&format.format(p)))
                .cloned()
                .collect(),
            removed_pairs: current
                .into_iter()
                .filter(|p| !seen.contains(&format.format(p)))
                .collect(),
        };

        if !force && diff.is_empty() {
            return Ok(diff);
        }

        if force {
            debug!(exchange, asset = %asset, "Forced update of {} pairs", update_type);
        } else {
            if !diff.new_pairs.is_empty() {
                debug!(
                    exchange,
                    asset = %asset,
                    new = %join_pairs(&format, &diff.new_pairs),
                    "Updating {} pairs",
                    update_type
                );
            }
            if !diff.removed_pairs.is_empty() {
                debug!(
                    exchange,
                    asset = %asset,
                    removed = %join_pairs(&format, &diff.removed_pairs),
                    "Updating {} pairs",
                    update_type
                );
            }
        }

        *state.sets.entry(asset).or_default().pairs_mut(enabled) = products;
        state.sync_config(asset);
        state.config.pairs_last_updated = Utc::now().timestamp();
        self.persist(&state).await?;
        Ok(diff)
    }

    /// Removes enabled pairs that are no longer available, picking one
    /// available pair at random if that would leave nothing enabled.
    /// Returns the removed pairs.
    pub async fn check_pair_consistency(
        &self,
        exchange: &str,
        asset: AssetClass,
    ) -> Result<Vec<CurrencyPair>> {
        let handle = self.handle(exchange)?;
        let mut state = handle.lock().await;
        let repair = match state.sets.get_mut(&asset) {
            Some(set) => repair_enabled(set),
            None => {
                return Err(NotFound::PairSet {
                    exchange: exchange.to_string(),
                    asset: asset.to_string(),
                }
                .into())
            }
        };
        if repair.removed.is_empty() {
            return Ok(repair.removed);
        }

        match &repair.fallback {
            Some(pair) => debug!(
                exchange,
                asset = %asset,
                pair = %state.config_format.format(pair),
                "No enabled pairs found in available pairs, randomly enabled one"
            ),
            None => warn!(exchange, asset = %asset, "No available pairs to fall back to"),
        }
        debug!(
            exchange,
            asset = %asset,
            removed = %join_pairs(&state.config_format, &repair.removed),
            "Removing enabled pairs that aren't available pairs"
        );

        state.sync_config(asset);
        self.persist(&state).await?;
        Ok(repair.removed)
    }

    /// Replaces a set outright.
    pub async fn set_pairs(
        &self,
        exchange: &str,
        asset: AssetClass,
        pairs: Vec<CurrencyPair>,
        enabled: bool,
    ) -> Result<()> {
        if pairs.is_empty() {
            return Err(Error::EmptyInput(format!("{} {}", exchange, asset)));
        }
        let handle = self.handle(exchange)?;
        let mut state = handle.lock().await;
        *state.sets.entry(asset).or_default().pairs_mut(enabled) = pairs;
        state.sync_config(asset);
        self.persist(&state).await
    }

    async fn pairs(&self, exchange: &str, asset: AssetClass, enabled: bool) -> Result<Vec<CurrencyPair>> {
        let handle = self.handle(exchange)?;
        let state = handle.lock().await;
        Ok(state.set(exchange, asset)?.pairs(enabled).clone())
    }

    pub async fn enabled_pairs(&self, exchange: &str, asset: AssetClass) -> Result<Vec<CurrencyPair>> {
        self.pairs(exchange, asset, true).await
    }

    pub async fn available_pairs(&self, exchange: &str, asset: AssetClass) -> Result<Vec<CurrencyPair>> {
        self.pairs(exchange, asset, false).await
    }

    /// Whether the pair is in the exchange's enabled (or available) set.
    /// Unknown exchanges and asset classes support nothing.
    pub async fn supports_pair(
        &self,
        exchange: &str,
        asset: AssetClass,
        pair: &CurrencyPair,
        enabled: bool,
    ) -> bool {
        let Ok(handle) = self.handle(exchange) else {
            return false;
        };
        let state = handle.lock().await;
        state
            .sets
            .get(&asset)
            .map(|set| set.contains(pair, enabled))
            .unwrap_or(false)
    }

    pub async fn asset_classes(&self, exchange: &str) -> Result<Vec<AssetClass>> {
        let handle = self.handle(exchange)?;
        let state = handle.lock().await;
        Ok(state.config.asset_classes.clone())
    }

    pub async fn request_format(&self, exchange: &str) -> Result<PairFormat> {
        let handle = self.handle(exchange)?;
        let state = handle.lock().await;
        Ok(state.request_format.clone())
    }

    pub async fn config_format(&self, exchange: &str) -> Result<PairFormat> {
        let handle = self.handle(exchange)?;
        let state = handle.lock().await;
        Ok(state.config_format.clone())
    }

    /// Renders a pair the way the exchange expects it in requests
    pub async fn format_exchange_pair(&self, exchange: &str, pair: &CurrencyPair) -> Result<String> {
        Ok(self.request_format(exchange).await?.format(pair))
    }

    /// Renders several pairs as one request parameter
    pub async fn format_exchange_pairs(
        &self,
        exchange: &str,
        pairs: &[CurrencyPair],
    ) -> Result<String> {
        Ok(self.request_format(exchange).await?.format_pairs(pairs))
    }

    /// When the pair lists were last refreshed, if ever.
    pub async fn last_pairs_update(&self, exchange: &str) -> Result<Option<DateTime<Utc>>> {
        let handle = self.handle(exchange)?;
        let state = handle.lock().await;
        match state.config.pairs_last_updated {
            0 => Ok(None),
            secs => Ok(Utc.timestamp_opt(secs, 0).single()),
        }
    }

    pub fn exchanges(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .exchanges
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }
}
