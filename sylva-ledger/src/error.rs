//! Error types for the ledger

use thiserror::Error;

/// Result type for ledger operations
pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Chain integrity violated at block {index}: {reason}")]
    ChainIntegrity { index: u64, reason: String },

    #[error("Ledger halted after integrity failure: {0}")]
    Halted(String),

    #[error("Block not found: {0}")]
    BlockNotFound(u64),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl LedgerError {
    /// Whether the error reflects a broken chain rather than an operational failure
    pub fn is_integrity_failure(&self) -> bool {
        matches!(self, LedgerError::ChainIntegrity { .. } | LedgerError::Halted(_))
    }
}
