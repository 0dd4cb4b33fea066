mod config;
mod service;

use common::models::ExchangeConfig;
use config::AggregatorConfig;
use connectors::ExchangeConnector;
use futures::future::join_all;
use service::AggregatorService;
use std::sync::Arc;
use std::time::Duration;
use store::MemoryConfigStore;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const SUMMARY_INTERVAL: Duration = Duration::from_secs(60);

/// Initial pair configuration for each exchange, with the operator's enabled
/// pairs on its primary asset class when given.
fn seed_configs(
    config: &AggregatorConfig,
    connectors: &[Arc<dyn ExchangeConnector>],
) -> Vec<ExchangeConfig> {
    connectors
        .iter()
        .map(|connector| {
            let name = connector.name();
            let seed = ExchangeConfig::new(name);
            let primary = connector.defaults().asset_classes.first().copied();
            match (config.enabled_pairs.get(name), primary) {
                (Some(pairs), Some(asset)) => seed.with_enabled_pairs(asset, pairs),
                _ => seed,
            }
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting market data aggregator");

    let config = Arc::new(
        AggregatorConfig::from_env().map_err(|e| format!("Failed to load configuration: {}", e))?,
    );

    let connectors = config
        .exchanges
        .iter()
        .map(|name| connectors::connector(name, config.http_timeout))
        .collect::<common::Result<Vec<_>>>()?;

    let store = MemoryConfigStore::with_exchanges(seed_configs(&config, &connectors));
    let service = Arc::new(AggregatorService::new(Arc::new(store)));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut tasks: Vec<_> = connectors
        .into_iter()
        .map(|connector| {
            tokio::spawn(Arc::clone(&service).run_exchange(
                connector,
                Arc::clone(&config),
                shutdown_rx.clone(),
            ))
        })
        .collect();

    let summary = Arc::clone(&service);
    let mut summary_shutdown = shutdown_rx;
    tasks.push(tokio::spawn(async move {
        let mut tick = tokio::time::interval(SUMMARY_INTERVAL);
        tick.tick().await;
        loop {
            tokio::select! {
                _ = tick.tick() => summary.log_depth_summary(),
                _ = summary_shutdown.changed() => break,
            }
        }
    }));

    info!(exchanges = ?config.exchanges, "Aggregator running, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    shutdown_tx.send(true)?;

    for result in join_all(tasks).await {
        if let Err(e) = result {
            error!("Task failed: {}", e);
        }
    }

    Ok(())
}
