use dgb_sync_bootstrap::{
    BootstrapConfig, EventBus, FileCheckpointStore, IndexResolver, Preferences, StartBlock,
    SyncBootstrapDecider, SyncEngine, WalletAddressSet,
};
use std::env;
use std::sync::Arc;

/// Stands in for the native sync engine: logs what it would be asked to do
struct LoggingEngine;

impl SyncEngine for LoggingEngine {
    fn set_start_block(&self, block: Option<StartBlock>) {
        match block {
            Some(block) => log::info!("Engine start block: {}", block),
            None => log::info!("Engine start block: from persisted chain state or genesis"),
        }
    }

    fn connect(&self) {
        log::info!("Engine connect requested");
    }

    fn disconnect(&self) {
        log::info!("Engine disconnect requested");
    }

    fn last_block_height(&self) -> u32 {
        0
    }

    fn sync_progress(&self, _from_height: u32) -> f64 {
        0.0
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    // Initialize logger (set RUST_LOG=debug for verbose output, RUST_LOG=info for normal)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = BootstrapConfig::from_env();
    let addresses = WalletAddressSet::with_limit(env::args().skip(1), config.address_limit);
    log::info!("Bootstrapping with {} wallet addresses", addresses.len());

    let store = Arc::new(FileCheckpointStore::open(&config.data_dir)?);
    let mode = Preferences::load(&config.data_dir)?.sync_mode();

    let decider = SyncBootstrapDecider::new(
        store,
        Arc::new(IndexResolver::new(config.index_url.clone())),
        Arc::new(LoggingEngine),
        EventBus::new(),
        config.resolution_timeout,
    );

    match decider.run(addresses, mode).await {
        Some(decision) => println!("{}", serde_json::to_string_pretty(&decision)?),
        None => anyhow::bail!("bootstrap did not reach a decision"),
    }
    Ok(())
}
