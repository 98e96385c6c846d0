//! Error types for the sync bootstrap
//!
//! Resolver failures never escape the decider: they are absorbed and turned
//! into a full-sync fallback. The enums below exist so that the reason is
//! still visible in logs and in `DecisionReason`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Data directory not found: {0}")]
    DirectoryNotFound(String),
}

/// Why a start-block resolution did not produce a block
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("Resolution timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Index network error: {0}")]
    Network(String),

    #[error("Index returned HTTP {0}")]
    Status(u16),

    #[error("Malformed index response: {0}")]
    Malformed(String),
}

impl ResolutionError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

impl From<reqwest::Error> for ResolutionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Malformed(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Status(status.as_u16())
        } else {
            Self::Network(err.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum BootstrapError {
    /// Handoff attempted without a decision for the current lifecycle event.
    /// This is a caller sequencing bug, not a runtime condition.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// The wallet lifecycle was reset between decision and handoff
    #[error("Decision from lifecycle epoch {decided} is stale (current epoch {current})")]
    Stale { decided: u64, current: u64 },
}

/// Fee and exchange-rate refresh failures
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}
