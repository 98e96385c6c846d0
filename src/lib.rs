//! DigiByte SPV sync bootstrap
//!
//! Decides, on every launch or wallet creation/recovery, where SPV
//! synchronization starts, persists that choice, and hands off to the
//! peer-to-peer sync engine.
//!
//! # Architecture
//!
//! - **Checkpoint store**: persisted start block and local block log
//! - **Resolver**: asks a block index for the earliest block touching the
//!   wallet's addresses, or the chain tip for a wallet without history
//! - **Decider**: one-shot state machine choosing resume, fast sync or full
//!   sync, persisting before it connects the engine
//! - **Controller**: application lifecycle glue and data fetchers
//!
//! # Example
//!
//! ```ignore
//! use dgb_sync_bootstrap::{IndexResolver, SyncBootstrapDecider, SyncMode, WalletAddressSet};
//!
//! let resolver = Arc::new(IndexResolver::new(url));
//! let decider = SyncBootstrapDecider::new(store, resolver, engine, events, timeout);
//! let addresses = WalletAddressSet::new(wallet.receive_addresses());
//! if let Some(decision) = decider.run(addresses, SyncMode::FastSync).await {
//!     println!("syncing from {:?}", decision.start_block);
//! }
//! ```

pub mod bootstrap;
pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod events;
pub mod fees;
pub mod rates;
pub mod resolver;
pub mod storage;
pub mod types;

// Re-exports for convenience
pub use bootstrap::{BootstrapState, SyncBootstrapDecider};
pub use config::BootstrapConfig;
pub use controller::{BackgroundFetchResult, WalletController, WalletSource};
pub use engine::SyncEngine;
pub use error::{BootstrapError, FetchError, ResolutionError, StorageError};
pub use events::{EventBus, SyncingState, WalletEvent};
pub use fees::{FeeUpdater, Fees};
pub use rates::{Rate, RateUpdater};
pub use resolver::{IndexResolver, StartBlockResolver};
pub use storage::{CheckpointStore, FileCheckpointStore, Preferences};
pub use types::{
    BlockHash, Decision, DecisionReason, ResolutionOutcome, StartBlock, SyncMode,
    WalletAddressSet,
};
