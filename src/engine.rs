//! Contract of the peer-to-peer SPV sync engine
//!
//! The engine itself lives in the native wallet core; this crate only
//! decides when and from where it starts.

use crate::types::StartBlock;

pub trait SyncEngine: Send + Sync {
    /// Start block to use if the engine has no chain state of its own.
    /// Called before `connect` on every handoff.
    fn set_start_block(&self, block: Option<StartBlock>);

    fn connect(&self);

    fn disconnect(&self);

    /// Height of the last block the engine has processed
    fn last_block_height(&self) -> u32;

    /// Sync progress in `[0, 1]` measured from `from_height`
    fn sync_progress(&self, from_height: u32) -> f64;

    fn is_synced(&self) -> bool {
        self.sync_progress(self.last_block_height()) >= 1.0
    }
}
