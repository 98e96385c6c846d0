//! UI event bus
//!
//! Events are fire-and-forget: publishing with no subscriber is not an error.

use tokio::sync::broadcast;

use crate::fees::Fees;

const EVENT_BUS_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncingState {
    Connecting,
    Syncing,
    Success,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WalletEvent {
    SyncingState(SyncingState),
    WalletCreatedOrRecovered,
    ReadyForDataFetchers,
    FeesUpdated(Fees),
    RatesUpdated { count: usize },
}

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<WalletEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: WalletEvent) {
        log::debug!("event: {:?}", event);
        // Err only means nobody is listening
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
