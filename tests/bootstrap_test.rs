/// Bootstrap decider integration tests
///
/// Drives the decider with scripted resolvers and in-memory stores, covering
/// resume, full sync, fast sync, every fallback path and the lifecycle
/// guarantees (single resolution, persist before connect, reset).

mod common;

use common::*;
use dgb_sync_bootstrap::{
    BootstrapState, CheckpointStore, DecisionReason, EventBus, ResolutionError,
    ResolutionOutcome, StartBlockResolver, SyncBootstrapDecider, SyncEngine, SyncMode,
    SyncingState, WalletEvent,
};
use std::sync::Arc;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(25);

struct Harness {
    store: Arc<MemoryCheckpointStore>,
    resolver: Arc<ScriptedResolver>,
    engine: Arc<RecordingEngine>,
    events: EventBus,
    decider: SyncBootstrapDecider,
}

impl Harness {
    fn new(store: MemoryCheckpointStore, resolver: ScriptedResolver) -> Self {
        init_logging();
        let store = Arc::new(store);
        let resolver = Arc::new(resolver);
        let engine = Arc::new(RecordingEngine::watching(
            store.clone() as Arc<dyn CheckpointStore>
        ));
        let events = EventBus::new();
        let decider = SyncBootstrapDecider::new(
            store.clone(),
            resolver.clone() as Arc<dyn StartBlockResolver>,
            engine.clone() as Arc<dyn SyncEngine>,
            events.clone(),
            TIMEOUT,
        );
        Self {
            store,
            resolver,
            engine,
            events,
            decider,
        }
    }
}

fn wallet() -> dgb_sync_bootstrap::WalletAddressSet {
    addresses(&["DQaB9nqZ9Rky4Q7Tq8Hk5bUwbfmUv3Jj5v", "DHm2YmfBb9qG2R6y8GZHfFvxXCUEHqVtwV"])
}

// ============================================================================
// Decision paths
// ============================================================================

#[tokio::test]
async fn test_populated_database_resumes_without_resolving() {
    let h = Harness::new(
        MemoryCheckpointStore::populated(),
        ScriptedResolver::new(ResolutionOutcome::Resolved(block(15_000_000, 1_650_000_000))),
    );

    let decision = h.decider.run(wallet(), SyncMode::FastSync).await.unwrap();

    assert_eq!(decision.mode, SyncMode::FullSync);
    assert_eq!(decision.reason, DecisionReason::Resumed);
    assert_eq!(decision.start_block, None);
    assert_eq!(h.resolver.calls(), 0);
    assert_eq!(h.store.saves(), 0);
    assert_eq!(
        h.engine.calls()[0],
        EngineCall::SetStartBlock(None),
        "resume hands no start block to the engine"
    );
    assert_eq!(h.engine.connects(), 1);
}

#[tokio::test]
async fn test_fast_sync_disabled_goes_full_sync() {
    let h = Harness::new(
        MemoryCheckpointStore::new(),
        ScriptedResolver::new(ResolutionOutcome::Resolved(block(15_000_000, 1_650_000_000))),
    );

    let decision = h.decider.run(wallet(), SyncMode::FullSync).await.unwrap();

    assert_eq!(decision.mode, SyncMode::FullSync);
    assert_eq!(decision.reason, DecisionReason::FullSyncPreferred);
    assert_eq!(h.resolver.calls(), 0);
    assert_eq!(h.store.saves(), 0);
    assert!(h.decider.is_handed_off());
}

#[tokio::test]
async fn test_resolved_block_is_persisted_and_handed_off() {
    let start = block(15_234_567, 1_650_000_000);
    let h = Harness::new(
        MemoryCheckpointStore::new(),
        ScriptedResolver::new(ResolutionOutcome::Resolved(start)),
    );

    let decision = h.decider.run(wallet(), SyncMode::FastSync).await.unwrap();

    assert_eq!(decision.mode, SyncMode::FastSync);
    assert_eq!(decision.reason, DecisionReason::Resolved);
    assert_eq!(decision.start_block, Some(start));
    assert!(decision.persisted);
    assert_eq!(h.store.load(), Some(start));
    assert!(!h.store.is_local_block_database_empty());
    assert_eq!(h.resolver.last_fallback(), Some(true));
    assert_eq!(
        h.engine.calls(),
        vec![
            EngineCall::SetStartBlock(Some(start)),
            EngineCall::Connect {
                checkpoint_saved: true
            },
        ]
    );
}

#[tokio::test]
async fn test_resolution_failure_falls_back_to_full_sync() {
    let h = Harness::new(
        MemoryCheckpointStore::new(),
        ScriptedResolver::new(ResolutionOutcome::Failed(ResolutionError::Network(
            "connection refused".to_string(),
        ))),
    );

    let decision = h.decider.run(wallet(), SyncMode::FastSync).await.unwrap();

    assert_eq!(decision.mode, SyncMode::FullSync);
    assert_eq!(decision.reason, DecisionReason::ResolutionFailed);
    assert_eq!(h.store.saves(), 0, "failed resolution writes nothing");
    assert_eq!(h.engine.connects(), 1);
}

#[tokio::test]
async fn test_timeout_falls_back_to_full_sync() {
    let h = Harness::new(
        MemoryCheckpointStore::new(),
        ScriptedResolver::new(ResolutionOutcome::Failed(ResolutionError::Timeout(TIMEOUT))),
    );

    let decision = h.decider.run(wallet(), SyncMode::FastSync).await.unwrap();

    assert_eq!(decision.mode, SyncMode::FullSync);
    assert_eq!(decision.reason, DecisionReason::ResolutionFailed);
    assert_eq!(h.store.saves(), 0);
}

#[tokio::test]
async fn test_not_found_falls_back_to_full_sync() {
    let h = Harness::new(
        MemoryCheckpointStore::new(),
        ScriptedResolver::new(ResolutionOutcome::NotFound),
    );

    let decision = h.decider.run(wallet(), SyncMode::FastSync).await.unwrap();

    assert_eq!(decision.mode, SyncMode::FullSync);
    assert_eq!(decision.reason, DecisionReason::NoHistory);
    assert_eq!(h.store.saves(), 0);
}

#[tokio::test]
async fn test_zero_height_block_is_rejected() {
    let h = Harness::new(
        MemoryCheckpointStore::new(),
        ScriptedResolver::new(ResolutionOutcome::Resolved(block(0, 1_650_000_000))),
    );

    let decision = h.decider.run(wallet(), SyncMode::FastSync).await.unwrap();

    assert_eq!(decision.mode, SyncMode::FullSync);
    assert_eq!(decision.reason, DecisionReason::RejectedBlock);
    assert_eq!(h.store.saves(), 0);
    assert_eq!(h.store.load(), None);
}

#[tokio::test]
async fn test_zero_timestamp_block_is_rejected() {
    let h = Harness::new(
        MemoryCheckpointStore::new(),
        ScriptedResolver::new(ResolutionOutcome::Resolved(block(15_000_000, 0))),
    );

    let decision = h.decider.run(wallet(), SyncMode::FastSync).await.unwrap();

    assert_eq!(decision.reason, DecisionReason::RejectedBlock);
    assert_eq!(h.store.saves(), 0);
}

#[tokio::test]
async fn test_persistence_failure_keeps_block_for_session() {
    let start = block(15_234_567, 1_650_000_000);
    let h = Harness::new(
        MemoryCheckpointStore::failing(),
        ScriptedResolver::new(ResolutionOutcome::Resolved(start)),
    );

    let decision = h.decider.run(wallet(), SyncMode::FastSync).await.unwrap();

    assert_eq!(decision.mode, SyncMode::FastSync);
    assert_eq!(decision.start_block, Some(start));
    assert!(!decision.persisted);
    assert_eq!(h.store.saves(), 1);
    assert_eq!(h.store.load(), None);
    assert_eq!(h.engine.calls()[0], EngineCall::SetStartBlock(Some(start)));
}

// ============================================================================
// Lifecycle guarantees
// ============================================================================

#[tokio::test]
async fn test_concurrent_triggers_resolve_once() {
    let h = Harness::new(
        MemoryCheckpointStore::new(),
        ScriptedResolver::delayed(
            ResolutionOutcome::Resolved(block(15_000_000, 1_650_000_000)),
            Duration::from_millis(100),
        ),
    );

    let (first, second) = tokio::join!(
        h.decider.run(wallet(), SyncMode::FastSync),
        h.decider.run(wallet(), SyncMode::FastSync),
    );

    assert_eq!(
        first.is_some() as u8 + second.is_some() as u8,
        1,
        "exactly one trigger decides"
    );
    assert_eq!(h.resolver.calls(), 1);
    assert_eq!(h.store.saves(), 1);
    assert_eq!(h.engine.connects(), 1);
}

#[tokio::test]
async fn test_second_trigger_after_handoff_is_ignored() {
    let h = Harness::new(
        MemoryCheckpointStore::new(),
        ScriptedResolver::new(ResolutionOutcome::NotFound),
    );

    assert!(h.decider.run(wallet(), SyncMode::FastSync).await.is_some());
    assert!(h.decider.run(wallet(), SyncMode::FastSync).await.is_none());
    assert_eq!(h.resolver.calls(), 1);
    assert_eq!(h.engine.connects(), 1);
}

#[tokio::test]
async fn test_decide_then_hand_off() {
    let start = block(15_000_000, 1_650_000_000);
    let h = Harness::new(
        MemoryCheckpointStore::new(),
        ScriptedResolver::new(ResolutionOutcome::Resolved(start)),
    );

    let decision = h.decider.decide(wallet(), SyncMode::FastSync).await.unwrap();
    assert_eq!(h.decider.state(), BootstrapState::Decided(decision));
    assert!(h.engine.calls().is_empty(), "deciding alone never connects");

    let handed = h.decider.hand_off().unwrap();
    assert_eq!(handed, decision);
    assert_eq!(h.decider.state(), BootstrapState::HandedOff(decision));
    assert_eq!(h.engine.connects(), 1);
}

#[tokio::test]
async fn test_reset_while_resolving_drops_decision() {
    let h = Harness::new(
        MemoryCheckpointStore::new(),
        ScriptedResolver::delayed(
            ResolutionOutcome::Resolved(block(15_000_000, 1_650_000_000)),
            Duration::from_millis(200),
        ),
    );

    let (outcome, _) = tokio::join!(h.decider.run(wallet(), SyncMode::FastSync), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(h.decider.state(), BootstrapState::ResolvingFastSync);
        h.decider.reset();
    });

    assert!(outcome.is_none());
    assert_eq!(h.decider.state(), BootstrapState::Idle);
    assert_eq!(h.store.saves(), 0, "stale resolution must not persist");
    assert!(h.engine.calls().is_empty(), "stale resolution must not connect");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_reset_during_checkpoint_write_leaves_store_empty() {
    init_logging();
    let store = Arc::new(MemoryCheckpointStore::slow(Duration::from_millis(300)));
    let engine = Arc::new(RecordingEngine::new());
    let decider = Arc::new(SyncBootstrapDecider::new(
        store.clone(),
        Arc::new(ScriptedResolver::new(ResolutionOutcome::Resolved(block(
            15_000_000,
            1_650_000_000,
        )))),
        engine.clone(),
        EventBus::new(),
        TIMEOUT,
    ));

    let run = tokio::spawn({
        let decider = decider.clone();
        async move { decider.run(wallet(), SyncMode::FastSync).await }
    });
    while !store.save_started() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    // Wallet reset order: decider first, then the store
    tokio::task::spawn_blocking({
        let decider = decider.clone();
        let store = store.clone();
        move || {
            decider.reset();
            store.clear();
        }
    })
    .await
    .unwrap();
    run.await.unwrap();

    assert_eq!(store.load(), None, "old wallet's checkpoint survived the reset");
    assert!(store.is_local_block_database_empty());
    assert_eq!(decider.state(), BootstrapState::Idle);
}

#[tokio::test]
async fn test_reset_after_handoff_allows_new_bootstrap() {
    let h = Harness::new(
        MemoryCheckpointStore::new(),
        ScriptedResolver::new(ResolutionOutcome::NotFound),
    );

    assert!(h.decider.run(wallet(), SyncMode::FastSync).await.is_some());
    h.decider.reset();
    assert_eq!(h.decider.state(), BootstrapState::Idle);

    assert!(h.decider.run(wallet(), SyncMode::FastSync).await.is_some());
    assert_eq!(h.resolver.calls(), 2);
    assert_eq!(h.engine.connects(), 2);
}

#[tokio::test]
async fn test_cancelled_resolution_returns_to_idle() {
    let h = Harness::new(
        MemoryCheckpointStore::new(),
        ScriptedResolver::delayed(ResolutionOutcome::NotFound, Duration::from_millis(500)),
    );

    let cancelled = tokio::time::timeout(
        Duration::from_millis(20),
        h.decider.decide(wallet(), SyncMode::FastSync),
    )
    .await;
    assert!(cancelled.is_err());
    assert_eq!(h.decider.state(), BootstrapState::Idle);

    let decision = h.decider.run(wallet(), SyncMode::FullSync).await.unwrap();
    assert_eq!(decision.reason, DecisionReason::FullSyncPreferred);
}

#[cfg(debug_assertions)]
#[tokio::test]
#[should_panic(expected = "handoff attempted while idle")]
async fn test_hand_off_without_decision_is_a_sequencing_bug() {
    let h = Harness::new(
        MemoryCheckpointStore::new(),
        ScriptedResolver::new(ResolutionOutcome::NotFound),
    );

    h.decider.decide(wallet(), SyncMode::FastSync).await.unwrap();
    // Reset discards the decision; nothing is left to hand off
    h.decider.reset();
    let _ = h.decider.hand_off();
}

#[cfg(not(debug_assertions))]
#[tokio::test]
async fn test_hand_off_without_decision_is_rejected() {
    let h = Harness::new(
        MemoryCheckpointStore::new(),
        ScriptedResolver::new(ResolutionOutcome::NotFound),
    );

    let result = h.decider.hand_off();
    assert!(matches!(result, Err(dgb_sync_bootstrap::BootstrapError::InvariantViolation(_))));
    assert!(h.engine.calls().is_empty());
}

#[tokio::test]
async fn test_handoff_publishes_events() {
    let h = Harness::new(
        MemoryCheckpointStore::new(),
        ScriptedResolver::new(ResolutionOutcome::Resolved(block(15_000_000, 1_650_000_000))),
    );
    let mut rx = h.events.subscribe();

    h.decider.run(wallet(), SyncMode::FastSync).await.unwrap();

    assert_eq!(
        rx.try_recv().unwrap(),
        WalletEvent::SyncingState(SyncingState::Connecting)
    );
    assert_eq!(rx.try_recv().unwrap(), WalletEvent::ReadyForDataFetchers);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_wallet_created_resets_and_notifies() {
    let h = Harness::new(
        MemoryCheckpointStore::new(),
        ScriptedResolver::new(ResolutionOutcome::NotFound),
    );
    let mut rx = h.events.subscribe();

    h.decider.decide(wallet(), SyncMode::FastSync).await.unwrap();
    h.decider.wallet_created_or_recovered();

    assert_eq!(h.decider.state(), BootstrapState::Idle);
    assert_eq!(rx.try_recv().unwrap(), WalletEvent::WalletCreatedOrRecovered);
}
