//! Common test utilities for bootstrap integration tests
//!
//! This module provides shared test infrastructure including:
//! - In-memory checkpoint store with injectable save failures and latency
//! - Scripted start-block resolver that counts calls
//! - Recording sync engine that checks persist-before-connect
//! - Index mock startup against a temp data directory

#![allow(dead_code)]

use async_trait::async_trait;
use dgb_sync_bootstrap::{
    BlockHash, CheckpointStore, ResolutionOutcome, StartBlock, StartBlockResolver, StorageError,
    SyncEngine, WalletAddressSet, WalletSource,
};
use index_mock::{BlockRef, Fixture, MockState};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

// ============================================================================
// Test Helpers
// ============================================================================

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn hash(n: u8) -> BlockHash {
    BlockHash::from_byte_array([n; 32])
}

pub fn block(height: u32, timestamp: u32) -> StartBlock {
    StartBlock::new(hash((height % 251) as u8), timestamp, height)
}

pub fn block_ref(height: u32, time: u32) -> BlockRef {
    BlockRef {
        hash: format!("{:064x}", height),
        height,
        time,
    }
}

pub fn addresses(list: &[&str]) -> WalletAddressSet {
    WalletAddressSet::new(list.iter().copied())
}

// ============================================================================
// Checkpoint store
// ============================================================================

#[derive(Default)]
pub struct MemoryCheckpointStore {
    checkpoint: Mutex<Option<StartBlock>>,
    blocks: Mutex<Vec<StartBlock>>,
    fail_saves: AtomicBool,
    saves: AtomicUsize,
    save_delay: Duration,
    save_started: AtomicBool,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose block database already holds chain state
    pub fn populated() -> Self {
        let store = Self::default();
        store.blocks.lock().push(block(1_000, 1_500_000_000));
        store
    }

    pub fn failing() -> Self {
        let store = Self::default();
        store.fail_saves.store(true, Ordering::SeqCst);
        store
    }

    /// Store whose `save` blocks the calling thread for `delay`
    pub fn slow(delay: Duration) -> Self {
        Self {
            save_delay: delay,
            ..Self::default()
        }
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn save_started(&self) -> bool {
        self.save_started.load(Ordering::SeqCst)
    }

    /// Wallet reset: forget checkpoint and blocks
    pub fn clear(&self) {
        *self.checkpoint.lock() = None;
        self.blocks.lock().clear();
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn load(&self) -> Option<StartBlock> {
        *self.checkpoint.lock()
    }

    fn save(&self, block: &StartBlock) -> Result<(), StorageError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.save_started.store(true, Ordering::SeqCst);
        if !self.save_delay.is_zero() {
            std::thread::sleep(self.save_delay);
        }
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StorageError::DirectoryNotFound("/unwritable".to_string()));
        }
        *self.checkpoint.lock() = Some(*block);
        let mut blocks = self.blocks.lock();
        if blocks.is_empty() {
            blocks.push(*block);
        }
        Ok(())
    }

    fn is_local_block_database_empty(&self) -> bool {
        self.blocks.lock().is_empty()
    }
}

// ============================================================================
// Resolver
// ============================================================================

pub struct ScriptedResolver {
    outcome: ResolutionOutcome,
    delay: Duration,
    calls: AtomicUsize,
    last_fallback: Mutex<Option<bool>>,
}

impl ScriptedResolver {
    pub fn new(outcome: ResolutionOutcome) -> Self {
        Self::delayed(outcome, Duration::ZERO)
    }

    pub fn delayed(outcome: ResolutionOutcome, delay: Duration) -> Self {
        Self {
            outcome,
            delay,
            calls: AtomicUsize::new(0),
            last_fallback: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_fallback(&self) -> Option<bool> {
        *self.last_fallback.lock()
    }
}

#[async_trait]
impl StartBlockResolver for ScriptedResolver {
    async fn resolve(
        &self,
        _addresses: WalletAddressSet,
        allow_best_block_fallback: bool,
        _timeout: Duration,
    ) -> ResolutionOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_fallback.lock() = Some(allow_best_block_fallback);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.outcome.clone()
    }
}

// ============================================================================
// Sync engine
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    SetStartBlock(Option<StartBlock>),
    Connect { checkpoint_saved: bool },
    Disconnect,
}

/// Records calls; `connect` notes whether the store held a checkpoint
pub struct RecordingEngine {
    store: Option<Arc<dyn CheckpointStore>>,
    calls: Mutex<Vec<EngineCall>>,
    synced: AtomicBool,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self {
            store: None,
            calls: Mutex::new(Vec::new()),
            synced: AtomicBool::new(false),
        }
    }

    pub fn watching(store: Arc<dyn CheckpointStore>) -> Self {
        Self {
            store: Some(store),
            ..Self::new()
        }
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().clone()
    }

    pub fn connects(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, EngineCall::Connect { .. }))
            .count()
    }

    pub fn set_synced(&self, synced: bool) {
        self.synced.store(synced, Ordering::SeqCst);
    }
}

impl SyncEngine for RecordingEngine {
    fn set_start_block(&self, block: Option<StartBlock>) {
        self.calls.lock().push(EngineCall::SetStartBlock(block));
    }

    fn connect(&self) {
        let checkpoint_saved = self
            .store
            .as_ref()
            .map(|store| store.load().is_some())
            .unwrap_or(false);
        self.calls.lock().push(EngineCall::Connect { checkpoint_saved });
    }

    fn disconnect(&self) {
        self.calls.lock().push(EngineCall::Disconnect);
    }

    fn last_block_height(&self) -> u32 {
        100
    }

    fn sync_progress(&self, _from_height: u32) -> f64 {
        if self.synced.load(Ordering::SeqCst) {
            1.0
        } else {
            0.5
        }
    }
}

// ============================================================================
// Wallet
// ============================================================================

pub struct StaticWallet {
    has_wallet: AtomicBool,
    addresses: Vec<String>,
}

impl StaticWallet {
    pub fn new(addresses: &[&str]) -> Self {
        Self {
            has_wallet: AtomicBool::new(true),
            addresses: addresses.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Wallet that exists only after `create`
    pub fn pending(addresses: &[&str]) -> Self {
        Self {
            has_wallet: AtomicBool::new(false),
            addresses: addresses.iter().map(|a| a.to_string()).collect(),
        }
    }

    pub fn create(&self) {
        self.has_wallet.store(true, Ordering::SeqCst);
    }
}

impl WalletSource for StaticWallet {
    fn has_wallet(&self) -> bool {
        self.has_wallet.load(Ordering::SeqCst)
    }

    fn addresses(&self, limit: usize) -> Vec<String> {
        if !self.has_wallet() {
            return Vec::new();
        }
        self.addresses.iter().take(limit).cloned().collect()
    }
}

// ============================================================================
// Index mock
// ============================================================================

/// Running index mock plus a temp data directory, cleaned up on drop
pub struct MockEnvironment {
    pub temp_dir: TempDir,
    pub state: Arc<MockState>,
    pub base_url: String,
}

impl MockEnvironment {
    pub async fn start(fixture: Fixture) -> anyhow::Result<Self> {
        init_logging();
        let temp_dir = TempDir::new()?;
        let state = Arc::new(MockState::new(fixture));
        let addr = index_mock::spawn_server(state.clone()).await?;
        log::info!("📁 Test directory: {:?}", temp_dir.path());

        Ok(Self {
            temp_dir,
            state,
            base_url: format!("http://{}", addr),
        })
    }
}
