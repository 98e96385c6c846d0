//! Application lifecycle glue around the bootstrap decider
//!
//! Maps launch, wallet creation/recovery, foreground/background transitions
//! and background fetches onto the decider, the sync engine and the data
//! fetchers.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::bootstrap::SyncBootstrapDecider;
use crate::config::BootstrapConfig;
use crate::engine::SyncEngine;
use crate::error::StorageError;
use crate::events::{EventBus, SyncingState, WalletEvent};
use crate::fees::FeeUpdater;
use crate::rates::RateUpdater;
use crate::resolver::StartBlockResolver;
use crate::storage::{FileCheckpointStore, Preferences};
use crate::types::{Decision, SyncMode, WalletAddressSet};

/// Read access to the wallet the bootstrap runs for
pub trait WalletSource: Send + Sync {
    fn has_wallet(&self) -> bool;

    /// Receive and change addresses known right now, at most `limit`
    fn addresses(&self, limit: usize) -> Vec<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundFetchResult {
    NewData,
    Failed,
}

pub struct WalletController {
    config: BootstrapConfig,
    wallet: Arc<dyn WalletSource>,
    store: Arc<FileCheckpointStore>,
    engine: Arc<dyn SyncEngine>,
    decider: SyncBootstrapDecider,
    fees: Arc<FeeUpdater>,
    rates: RateUpdater,
    events: EventBus,
    fee_task: Mutex<Option<JoinHandle<()>>>,
}

impl WalletController {
    pub fn new(
        config: BootstrapConfig,
        wallet: Arc<dyn WalletSource>,
        store: Arc<FileCheckpointStore>,
        resolver: Arc<dyn StartBlockResolver>,
        engine: Arc<dyn SyncEngine>,
        events: EventBus,
    ) -> Self {
        let decider = SyncBootstrapDecider::new(
            store.clone(),
            resolver,
            engine.clone(),
            events.clone(),
            config.resolution_timeout,
        );
        let fees = Arc::new(FeeUpdater::new(config.fee_url.clone(), events.clone()));
        let rates = RateUpdater::new(
            config.rates_url.clone(),
            config.rates_fallback_url.clone(),
            config.data_dir.clone(),
            events.clone(),
        );

        Self {
            config,
            wallet,
            store,
            engine,
            decider,
            fees,
            rates,
            events,
            fee_task: Mutex::new(None),
        }
    }

    pub fn decider(&self) -> &SyncBootstrapDecider {
        &self.decider
    }

    pub fn fees(&self) -> &FeeUpdater {
        &self.fees
    }

    pub fn rates(&self) -> &RateUpdater {
        &self.rates
    }

    /// Cold start. Without a wallet nothing happens until `wallet_created`.
    pub async fn launch(&self) -> Option<Decision> {
        if !self.wallet.has_wallet() {
            log::info!("No wallet yet, waiting for creation or recovery");
            return None;
        }
        self.bootstrap().await
    }

    /// A wallet was created or recovered: new lifecycle event
    pub async fn wallet_created(&self) -> Option<Decision> {
        self.decider.wallet_created_or_recovered();
        self.bootstrap().await
    }

    pub async fn enter_foreground(&self) {
        self.reconnect("foreground").await;
    }

    pub async fn network_reachable(&self) {
        self.reconnect("network reachable").await;
    }

    /// Disconnect once sync is complete, keep syncing otherwise
    pub fn enter_background(&self) {
        if self.decider.is_handed_off() && self.engine.is_synced() {
            log::debug!("Entering background with sync complete, disconnecting");
            self.engine.disconnect();
        }
    }

    /// Wipe chain state; any resolution in flight will not reach the engine
    pub fn reset_wallet(&self) -> Result<(), StorageError> {
        self.decider.reset();
        self.stop_fee_task();
        self.engine.disconnect();
        self.store.clear()
    }

    /// Refresh fees and rates within the background fetch budget
    pub async fn perform_background_fetch(&self) -> BackgroundFetchResult {
        let budget = self.config.background_fetch_budget;
        let refreshes = async { futures::join!(self.fees.refresh(), self.rates.refresh()) };

        match tokio::time::timeout(budget, refreshes).await {
            Ok((fees, rates)) => {
                if let Err(e) = fees {
                    log::debug!("Background fee refresh failed: {}", e);
                }
                if let Err(e) = rates {
                    log::debug!("Background rates refresh failed: {}", e);
                }
                BackgroundFetchResult::NewData
            }
            Err(_) => {
                log::warn!("Background fetch exceeded {:?}", budget);
                BackgroundFetchResult::Failed
            }
        }
    }

    async fn bootstrap(&self) -> Option<Decision> {
        let mode = match Preferences::load(&self.config.data_dir) {
            Ok(prefs) => prefs.sync_mode(),
            Err(e) => {
                log::warn!("Preferences unreadable ({}), assuming full sync", e);
                SyncMode::FullSync
            }
        };
        let limit = self.config.address_limit;
        let addresses = WalletAddressSet::with_limit(self.wallet.addresses(limit), limit);

        let decision = self.decider.run(addresses, mode).await?;
        self.start_data_fetchers().await;
        Some(decision)
    }

    async fn start_data_fetchers(&self) {
        self.refresh_fetchers().await;

        let mut task = self.fee_task.lock();
        if task.is_none() {
            let interval = self.config.fee_refresh_interval;
            *task = Some(self.fees.clone().spawn_periodic(interval));
        }
    }

    async fn refresh_fetchers(&self) {
        let (fees, rates) = futures::join!(self.fees.refresh(), self.rates.refresh());
        if let Err(e) = fees {
            log::warn!("Fee refresh failed: {}", e);
        }
        if let Err(e) = rates {
            log::warn!("Rates refresh failed: {}", e);
        }
    }

    async fn reconnect(&self, trigger: &str) {
        if !self.wallet.has_wallet() {
            return;
        }
        // Connecting before the handoff could start the engine ahead of the
        // checkpoint it depends on.
        if !self.decider.is_handed_off() {
            log::debug!("Ignoring {} before bootstrap handoff", trigger);
            return;
        }
        log::debug!("Reconnecting sync engine ({})", trigger);
        self.events
            .publish(WalletEvent::SyncingState(SyncingState::Connecting));
        self.engine.connect();
        self.refresh_fetchers().await;
    }

    fn stop_fee_task(&self) {
        if let Some(task) = self.fee_task.lock().take() {
            task.abort();
        }
    }
}

impl Drop for WalletController {
    fn drop(&mut self) {
        self.stop_fee_task();
    }
}
