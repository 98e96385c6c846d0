/// Index API request/response types and the mock fixture
///
/// Wire types match what a wallet bootstrap sends and expects.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Block reference returned by /wallet/first-block and /blocks/tip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRef {
    pub hash: String,
    pub height: u32,
    pub time: u32,
}

/// Request body of POST /wallet/first-block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirstBlockRequest {
    pub addresses: Vec<String>,
    #[serde(default)]
    pub best_block_fallback: bool,
}

/// Response of POST /wallet/first-block
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FirstBlockResponse {
    pub blocks: Vec<BlockRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_block: Option<BlockRef>,
}

/// Everything the mock serves
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixture {
    /// Blocks holding transactions per address
    #[serde(default)]
    pub history: HashMap<String, Vec<BlockRef>>,
    /// Chain tip served by /blocks/tip
    #[serde(default)]
    pub tip: Option<BlockRef>,
    /// Put the tip into /wallet/first-block responses when requested and no
    /// history matched. When false the client must call /blocks/tip itself.
    #[serde(default)]
    pub inline_best_block: bool,
    /// Artificial latency applied to every endpoint except /health
    #[serde(default)]
    pub delay_ms: u64,
    /// Make /wallet/first-block answer 500
    #[serde(default)]
    pub fail_first_block: bool,
    #[serde(default)]
    pub fee_levels: Option<serde_json::Value>,
    #[serde(default)]
    pub rates: Option<serde_json::Value>,
    #[serde(default)]
    pub fallback_rates: Option<serde_json::Value>,
}

impl Fixture {
    /// Blocks touching any of `addresses`, in request order
    pub fn blocks_for(&self, addresses: &[String]) -> Vec<BlockRef> {
        addresses
            .iter()
            .filter_map(|address| self.history.get(address))
            .flatten()
            .cloned()
            .collect()
    }
}
