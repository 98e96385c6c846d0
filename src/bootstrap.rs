//! Sync bootstrap decider
//!
//! Decides, once per wallet lifecycle event, where SPV sync starts:
//!
//! - local block database populated: resume, never resolve
//! - empty database, fast sync enabled: resolve via the index, persist the
//!   block, fall back to full sync on any failure
//! - empty database, fast sync disabled: full sync
//!
//! The checkpoint is always written (or its write has failed) before the
//! sync engine is connected.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::engine::SyncEngine;
use crate::error::BootstrapError;
use crate::events::{EventBus, SyncingState, WalletEvent};
use crate::resolver::StartBlockResolver;
use crate::storage::CheckpointStore;
use crate::types::{Decision, DecisionReason, ResolutionOutcome, SyncMode, WalletAddressSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapState {
    Idle,
    ResolvingFastSync,
    Decided(Decision),
    HandedOff(Decision),
}

impl fmt::Display for BootstrapState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::ResolvingFastSync => f.write_str("resolving"),
            Self::Decided(d) => write!(f, "decided ({:?})", d.mode),
            Self::HandedOff(d) => write!(f, "handed off ({:?})", d.mode),
        }
    }
}

struct Inner {
    state: BootstrapState,
    /// Bumped by `reset`; decisions from an older epoch are never handed off
    epoch: u64,
}

pub struct SyncBootstrapDecider {
    store: Arc<dyn CheckpointStore>,
    resolver: Arc<dyn StartBlockResolver>,
    engine: Arc<dyn SyncEngine>,
    events: EventBus,
    resolution_timeout: Duration,
    inner: Mutex<Inner>,
    /// Held across the epoch check and the checkpoint write, and by `reset`,
    /// so a reset never lands between the two
    persist: Mutex<()>,
}

impl SyncBootstrapDecider {
    pub fn new(
        store: Arc<dyn CheckpointStore>,
        resolver: Arc<dyn StartBlockResolver>,
        engine: Arc<dyn SyncEngine>,
        events: EventBus,
        resolution_timeout: Duration,
    ) -> Self {
        Self {
            store,
            resolver,
            engine,
            events,
            resolution_timeout,
            inner: Mutex::new(Inner {
                state: BootstrapState::Idle,
                epoch: 0,
            }),
            persist: Mutex::new(()),
        }
    }

    pub fn state(&self) -> BootstrapState {
        self.inner.lock().state
    }

    pub fn is_handed_off(&self) -> bool {
        matches!(self.state(), BootstrapState::HandedOff(_))
    }

    /// Decide the sync start for the current lifecycle event.
    ///
    /// Returns `None` without doing anything if a bootstrap is already in
    /// progress or decided, and `None` if the lifecycle was reset while the
    /// resolution was in flight.
    pub async fn decide(&self, addresses: WalletAddressSet, mode: SyncMode) -> Option<Decision> {
        self.decide_in_epoch(addresses, mode)
            .await
            .map(|(decision, _)| decision)
    }

    /// Connect the sync engine with the decided start block
    pub fn hand_off(&self) -> Result<Decision, BootstrapError> {
        self.hand_off_in_epoch(None)
    }

    /// `decide` then `hand_off`
    pub async fn run(&self, addresses: WalletAddressSet, mode: SyncMode) -> Option<Decision> {
        let (_, epoch) = self.decide_in_epoch(addresses, mode).await?;
        match self.hand_off_in_epoch(Some(epoch)) {
            Ok(decision) => Some(decision),
            Err(e) => {
                log::warn!("Bootstrap handoff skipped: {}", e);
                None
            }
        }
    }

    /// Start a new wallet lifecycle event (reset, teardown).
    ///
    /// A resolution still in flight is discarded when it completes: nothing
    /// is persisted and nothing is handed off. A checkpoint write already
    /// under way finishes first, so a store cleared after `reset` stays empty.
    pub fn reset(&self) {
        let _persist = self.persist.lock();
        let mut inner = self.inner.lock();
        inner.epoch += 1;
        log::info!(
            "Bootstrap reset from {} (lifecycle epoch {})",
            inner.state,
            inner.epoch
        );
        inner.state = BootstrapState::Idle;
    }

    /// New wallet created or recovered: fresh lifecycle event plus UI signal
    pub fn wallet_created_or_recovered(&self) {
        self.reset();
        self.events.publish(WalletEvent::WalletCreatedOrRecovered);
    }

    async fn decide_in_epoch(
        &self,
        addresses: WalletAddressSet,
        mode: SyncMode,
    ) -> Option<(Decision, u64)> {
        let epoch = {
            let mut inner = self.inner.lock();
            if inner.state != BootstrapState::Idle {
                log::debug!("Bootstrap trigger ignored, already {}", inner.state);
                return None;
            }

            let immediate = if !self.store.is_local_block_database_empty() {
                log::info!("Local block database populated, resuming sync");
                Some(Decision::full_sync(DecisionReason::Resumed))
            } else if mode == SyncMode::FullSync {
                log::info!("No blocks in database, fast sync disabled: full sync");
                Some(Decision::full_sync(DecisionReason::FullSyncPreferred))
            } else {
                None
            };

            if let Some(decision) = immediate {
                inner.state = BootstrapState::Decided(decision);
                return Some((decision, inner.epoch));
            }

            inner.state = BootstrapState::ResolvingFastSync;
            inner.epoch
        };

        log::info!("No blocks in database, resolving first block of interest");
        let mut guard = ResolvingGuard {
            inner: &self.inner,
            epoch,
            armed: true,
        };

        let outcome = self
            .resolver
            .resolve(addresses, true, self.resolution_timeout)
            .await;
        guard.armed = false;

        let decision = {
            let _persist = self.persist.lock();
            let current = self.inner.lock().epoch;
            if current != epoch {
                log::warn!(
                    "Discarding resolution from lifecycle epoch {} (now {})",
                    epoch,
                    current
                );
                return None;
            }
            self.apply_outcome(outcome)
        };

        let mut inner = self.inner.lock();
        if inner.epoch != epoch {
            log::warn!(
                "Discarding {:?} decision from lifecycle epoch {} (now {})",
                decision.mode,
                epoch,
                inner.epoch
            );
            return None;
        }
        inner.state = BootstrapState::Decided(decision);
        Some((decision, epoch))
    }

    fn apply_outcome(&self, outcome: ResolutionOutcome) -> Decision {
        match outcome {
            ResolutionOutcome::Resolved(block) if block.is_usable() => {
                match self.store.save(&block) {
                    Ok(()) => {
                        log::info!("Fast sync from {}", block);
                        Decision::fast_sync(block, true)
                    }
                    Err(e) => {
                        log::error!(
                            "Could not persist checkpoint {}: {}. Using it for this session only",
                            block,
                            e
                        );
                        Decision::fast_sync(block, false)
                    }
                }
            }
            ResolutionOutcome::Resolved(block) => {
                log::warn!("Rejecting unusable start block {}, full sync", block);
                Decision::full_sync(DecisionReason::RejectedBlock)
            }
            ResolutionOutcome::NotFound => {
                log::info!("Index has no history and no tip for this wallet, full sync");
                Decision::full_sync(DecisionReason::NoHistory)
            }
            ResolutionOutcome::Failed(e) if e.is_timeout() => {
                log::warn!("Start block resolution timed out ({}), full sync", e);
                Decision::full_sync(DecisionReason::ResolutionFailed)
            }
            ResolutionOutcome::Failed(e) => {
                log::warn!("Start block resolution failed ({}), full sync", e);
                Decision::full_sync(DecisionReason::ResolutionFailed)
            }
        }
    }

    fn hand_off_in_epoch(&self, expected_epoch: Option<u64>) -> Result<Decision, BootstrapError> {
        let decision = {
            let mut inner = self.inner.lock();
            if let Some(expected) = expected_epoch {
                if expected != inner.epoch {
                    return Err(BootstrapError::Stale {
                        decided: expected,
                        current: inner.epoch,
                    });
                }
            }
            match inner.state {
                BootstrapState::Decided(decision) => {
                    inner.state = BootstrapState::HandedOff(decision);
                    decision
                }
                other => {
                    let msg = format!("sync engine handoff attempted while {}", other);
                    debug_assert!(false, "{}", msg);
                    log::error!("{}", msg);
                    return Err(BootstrapError::InvariantViolation(msg));
                }
            }
        };

        self.events
            .publish(WalletEvent::SyncingState(SyncingState::Connecting));
        self.engine.set_start_block(decision.start_block);
        self.engine.connect();
        self.events.publish(WalletEvent::ReadyForDataFetchers);
        log::info!("Sync engine connected ({:?}, {:?})", decision.mode, decision.reason);
        Ok(decision)
    }
}

/// Returns the decider to `Idle` if a resolution future is dropped before
/// completing, so a cancelled caller does not wedge the bootstrap.
struct ResolvingGuard<'a> {
    inner: &'a Mutex<Inner>,
    epoch: u64,
    armed: bool,
}

impl Drop for ResolvingGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut inner = self.inner.lock();
        if inner.epoch == self.epoch && inner.state == BootstrapState::ResolvingFastSync {
            log::warn!("Start block resolution abandoned, bootstrap back to idle");
            inner.state = BootstrapState::Idle;
        }
    }
}
