//! Ledger node binary

use anyhow::Context;
use curve_ledger::{Config, Ledger};
use tracing_subscriber::EnvFilter;

fn load_config() -> anyhow::Result<Config> {
    match std::env::var("LEDGER_CONFIG") {
        Ok(path) => Config::from_file(&path)
            .with_context(|| format!("Failed to load config from {}", path)),
        Err(_) => Config::from_env().context("Failed to load config from environment"),
    }
}

fn init_tracing(config: &Config) {
    // RUST_LOG wins over the configured default
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config()?;
    init_tracing(&config);

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        data_dir = ?config.data_dir,
        "Starting ledger node"
    );

    let ledger = Ledger::open(config).await.context("Failed to open ledger")?;
    let genesis = ledger.init().await.context("Failed to initialize ledger")?;
    tracing::info!(hash = %genesis.hash, timestamp = genesis.timestamp, "Genesis ready");

    let snapshot = ledger.current_market_snapshot()?;
    let height = ledger.latest_block()?.map(|b| b.index).unwrap_or(0);
    tracing::info!(
        height,
        total_supply = %snapshot.total_supply,
        buy_price = %snapshot.buy_price,
        sell_price = %snapshot.sell_price,
        "Market state"
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    tracing::info!("Shutting down ledger node");
    ledger.shutdown().await?;
    Ok(())
}
