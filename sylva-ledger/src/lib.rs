//! Sylva Ledger - append-only verification ledger
//!
//! Every sentinel verification and every completed credit trade is recorded as a
//! block whose hash covers its own fields and the previous block's hash. The
//! ledger re-verifies the stored chain before appending and before serving
//! verified reads; a detected mismatch halts it until [`Ledger::recover`] runs.

pub mod audit;
pub mod chain;
pub mod error;
pub mod storage;

pub use audit::AuditEntry;
pub use chain::{Block, BlockData, Ledger, TradeRecord};
pub use error::{LedgerError, LedgerResult};
pub use storage::BlockStore;

/// Ledger format version
pub const LEDGER_VERSION: &str = "0.1.0";

/// `previous_hash` of the genesis block
pub const GENESIS_PREVIOUS_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_constant() {
        assert!(!LEDGER_VERSION.is_empty());
    }

    #[test]
    fn test_genesis_previous_hash_is_digest_sized() {
        assert_eq!(GENESIS_PREVIOUS_HASH.len(), 64);
        assert!(GENESIS_PREVIOUS_HASH.chars().all(|c| c == '0'));
    }
}
