//! Earliest-relevant-block resolution
//!
//! Answers "from which block do I need to scan, given these addresses?"
//! without a chain scan, by asking an external block index.

mod index;
pub mod wire;

pub use index::IndexResolver;

use async_trait::async_trait;
use std::time::Duration;

use crate::types::{ResolutionOutcome, WalletAddressSet};

#[async_trait]
pub trait StartBlockResolver: Send + Sync {
    /// Resolve the start block for `addresses`.
    ///
    /// Completes exactly once within `timeout`. Never retries; failures are
    /// reported as `ResolutionOutcome::Failed`.
    async fn resolve(
        &self,
        addresses: WalletAddressSet,
        allow_best_block_fallback: bool,
        timeout: Duration,
    ) -> ResolutionOutcome;
}
