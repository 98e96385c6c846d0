//! Index service request/response bodies

use serde::{Deserialize, Serialize};

use crate::error::ResolutionError;
use crate::types::{BlockHash, StartBlock};

/// Body of `POST /wallet/first-block`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirstBlockRequest {
    pub addresses: Vec<String>,
    pub best_block_fallback: bool,
}

/// Response of `POST /wallet/first-block`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FirstBlockResponse {
    /// Blocks holding transactions that touch any requested address
    #[serde(default)]
    pub blocks: Vec<BlockRef>,
    /// Current chain tip, present when requested and no history exists
    #[serde(default)]
    pub best_block: Option<BlockRef>,
}

/// Block reference as reported by the index (`GET /blocks/tip` too)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRef {
    pub hash: String,
    pub height: u32,
    pub time: u32,
}

impl BlockRef {
    /// Validate into a start block.
    ///
    /// `Ok(None)` means the reference carries no timestamp and must be
    /// treated as absent. Height 0 with a timestamp is a contradiction the
    /// index should never assert, so the whole response is rejected.
    pub fn to_start_block(&self) -> Result<Option<StartBlock>, ResolutionError> {
        if self.time == 0 {
            return Ok(None);
        }
        if self.height == 0 {
            return Err(ResolutionError::Malformed(format!(
                "block {} claims height 0 with timestamp {}",
                self.hash, self.time
            )));
        }
        let hash: BlockHash = self.hash.parse().map_err(|e| {
            ResolutionError::Malformed(format!("invalid block hash '{}': {}", self.hash, e))
        })?;
        Ok(Some(StartBlock::new(hash, self.time, self.height)))
    }
}

impl FirstBlockResponse {
    /// Earliest usable block among `blocks`, by height then timestamp
    pub fn earliest(&self) -> Result<Option<StartBlock>, ResolutionError> {
        let mut earliest: Option<StartBlock> = None;
        for block_ref in &self.blocks {
            let Some(block) = block_ref.to_start_block()? else {
                log::debug!("Skipping block {} without timestamp", block_ref.hash);
                continue;
            };
            let is_earlier = match earliest {
                Some(current) => {
                    (block.height, block.timestamp) < (current.height, current.timestamp)
                }
                None => true,
            };
            if is_earlier {
                earliest = Some(block);
            }
        }
        Ok(earliest)
    }
}
