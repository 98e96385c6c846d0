//! Fee level refresh
//!
//! Fetched after the sync engine handoff and then periodically. Values
//! outside the sanity bounds are ignored and the current fees are kept.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::error::FetchError;
use crate::events::{EventBus, WalletEvent};

/// Fee used until the first successful refresh, sat/kB
pub const DEFAULT_FEE_PER_KB: u64 = 50_000;
/// Accepted regular fee must be strictly below this, sat/kB
pub const MAX_FEE_PER_KB: u64 = 10_000_000;
const TX_FEE_PER_KB: u64 = 1_000;
/// Minimum relay fee on a 191 byte transaction, sat/kB
pub const MIN_FEE_PER_KB: u64 = (TX_FEE_PER_KB * 1_000 + 190) / 191;

// Used when the service answers but the body doesn't carry fee levels
const FALLBACK_REGULAR_FEE_PER_KB: u64 = 80_000;
const FALLBACK_ECONOMY_FEE_PER_KB: u64 = 50_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fees {
    pub regular: u64,
    pub economy: u64,
}

impl Default for Fees {
    fn default() -> Self {
        Self {
            regular: DEFAULT_FEE_PER_KB,
            economy: DEFAULT_FEE_PER_KB,
        }
    }
}

impl Fees {
    pub fn within_bounds(&self) -> bool {
        self.regular < MAX_FEE_PER_KB && self.economy > MIN_FEE_PER_KB
    }
}

#[derive(Deserialize)]
struct FeeLevel {
    #[serde(rename = "feePerKb")]
    fee_per_kb: u64,
}

/// Parse a fee-levels body: regular fee at index 2, economy at index 3.
///
/// Bodies without those entries yield the fallback levels; zero values are
/// an invalid response.
pub fn parse_fee_levels(body: &[u8]) -> Result<Fees, FetchError> {
    let levels = serde_json::from_slice::<Vec<serde_json::Value>>(body)
        .ok()
        .and_then(|levels| {
            let regular = serde_json::from_value::<FeeLevel>(levels.get(2)?.clone()).ok()?;
            let economy = serde_json::from_value::<FeeLevel>(levels.get(3)?.clone()).ok()?;
            Some(Fees {
                regular: regular.fee_per_kb,
                economy: economy.fee_per_kb,
            })
        });

    let fees = levels.unwrap_or_else(|| {
        log::warn!("fee-per-kb: could not parse fee levels, using fallback levels");
        Fees {
            regular: FALLBACK_REGULAR_FEE_PER_KB,
            economy: FALLBACK_ECONOMY_FEE_PER_KB,
        }
    });

    if fees.regular == 0 || fees.economy == 0 {
        return Err(FetchError::InvalidResponse("zero fee level".to_string()));
    }
    Ok(fees)
}

pub struct FeeUpdater {
    client: reqwest::Client,
    url: String,
    events: EventBus,
    fees: RwLock<Fees>,
}

impl FeeUpdater {
    pub fn new(url: impl Into<String>, events: EventBus) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            events,
            fees: RwLock::new(Fees::default()),
        }
    }

    pub fn current(&self) -> Fees {
        *self.fees.read()
    }

    /// Fetch fee levels and adopt them if they pass the sanity bounds.
    /// Returns the fees in effect afterwards.
    pub async fn refresh(&self) -> Result<Fees, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                log::warn!("fee-per-kb network error: {}", e);
                FetchError::Network(e)
            })?;
        let body = response.bytes().await?;
        let fees = parse_fee_levels(&body)?;

        if !fees.within_bounds() {
            log::warn!(
                "Ignoring out-of-bounds fees (regular {}, economy {}), keeping current",
                fees.regular,
                fees.economy
            );
            return Ok(self.current());
        }

        *self.fees.write() = fees;
        log::debug!("Fees updated: regular {} economy {}", fees.regular, fees.economy);
        self.events.publish(WalletEvent::FeesUpdated(fees));
        Ok(fees)
    }

    /// Refresh every `interval`, first tick one interval from now, until the
    /// handle is aborted
    pub fn spawn_periodic(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = self.refresh().await {
                    log::debug!("Periodic fee refresh failed: {}", e);
                }
            }
        })
    }
}
