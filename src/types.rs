//! Core value types shared by the store, the resolver and the decider

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::ResolutionError;

/// Default cap on the number of addresses sent to the index
pub const DEFAULT_ADDRESS_LIMIT: usize = 20;

/// 32-byte block digest, displayed and serialized as lowercase hex
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockHash([u8; 32]);

impl BlockHash {
    pub const fn from_byte_array(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl FromStr for BlockHash {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockHash({})", self)
    }
}

impl Serialize for BlockHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for BlockHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Point in the chain from which SPV scanning begins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartBlock {
    pub hash: BlockHash,
    pub timestamp: u32,
    pub height: u32,
}

impl StartBlock {
    pub fn new(hash: BlockHash, timestamp: u32, height: u32) -> Self {
        Self {
            hash,
            timestamp,
            height,
        }
    }

    /// A block is only usable as a sync start when both height and time are set
    pub fn is_usable(&self) -> bool {
        self.timestamp != 0 && self.height > 0
    }

    pub fn time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(i64::from(self.timestamp), 0)
    }
}

impl fmt::Display for StartBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.time() {
            Some(time) => write!(f, "#{} {} ({})", self.height, self.hash, time.to_rfc3339()),
            None => write!(f, "#{} {}", self.height, self.hash),
        }
    }
}

/// Bounded, ordered, duplicate-free snapshot of wallet addresses
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalletAddressSet {
    addresses: Vec<String>,
}

impl WalletAddressSet {
    /// Build a set capped at `limit` entries. Duplicates are dropped before
    /// the cap is applied so that repeats never crowd out distinct addresses.
    pub fn with_limit<I, S>(addresses: I, limit: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for address in addresses {
            if unique.len() == limit {
                break;
            }
            let owned: String = address.into();
            let trimmed = owned.trim();
            if trimmed.is_empty() || unique.iter().any(|a| a == trimmed) {
                continue;
            }
            unique.push(trimmed.to_string());
        }
        Self { addresses: unique }
    }

    pub fn new<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_limit(addresses, DEFAULT_ADDRESS_LIMIT)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.addresses
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

/// Result of exactly one resolution attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionOutcome {
    Resolved(StartBlock),
    NotFound,
    Failed(ResolutionError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Start from the resolved earliest-relevant block or the best tip
    FastSync,
    /// Start from genesis or from the persisted chain state
    FullSync,
}

impl SyncMode {
    pub fn from_fast_sync_flag(enabled: bool) -> Self {
        if enabled {
            Self::FastSync
        } else {
            Self::FullSync
        }
    }
}

/// Why the decider settled on its mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    /// Local block database already populated
    Resumed,
    /// Fast sync disabled by preference
    FullSyncPreferred,
    /// Index resolved a usable start block
    Resolved,
    /// Index reported no history and no usable tip
    NoHistory,
    /// Index unreachable, slow or malformed
    ResolutionFailed,
    /// Index returned a block with zero height or zero timestamp
    RejectedBlock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub mode: SyncMode,
    pub start_block: Option<StartBlock>,
    pub reason: DecisionReason,
    /// False when the checkpoint write failed; the block then only lives in
    /// memory for this session.
    pub persisted: bool,
}

impl Decision {
    pub fn full_sync(reason: DecisionReason) -> Self {
        Self {
            mode: SyncMode::FullSync,
            start_block: None,
            reason,
            persisted: false,
        }
    }

    pub fn fast_sync(block: StartBlock, persisted: bool) -> Self {
        Self {
            mode: SyncMode::FastSync,
            start_block: Some(block),
            reason: DecisionReason::Resolved,
            persisted,
        }
    }
}
