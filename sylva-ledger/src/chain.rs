//! Hash-chained blocks and the ledger that owns them

use crate::{LedgerError, LedgerResult, GENESIS_PREVIOUS_HASH};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use sylva_sentinel::VerificationRecord;
use tracing::{error, info, warn};

/// A completed credit trade as recorded on the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub transaction_id: String,
    pub buyer: String,
    pub seller: String,
    pub amount: f64,
    pub price: f64,
    pub total_value: f64,
}

/// Payload carried by a block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockData {
    Genesis,
    Verification(VerificationRecord),
    CarbonCreditTrade(TradeRecord),
}

/// A block in the verification ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Position in the chain (0 for genesis)
    pub index: u64,

    /// Block timestamp, unix seconds
    pub timestamp: i64,

    /// Recorded payload
    pub data: BlockData,

    /// Hash of the previous block
    pub previous_hash: String,

    /// SHA3-256 hex over index, timestamp, data and previous hash
    pub hash: String,
}

impl Block {
    /// Create a new block and seal it with its hash
    pub fn new(index: u64, data: BlockData, previous_hash: String) -> LedgerResult<Self> {
        let mut block = Block {
            index,
            timestamp: Utc::now().timestamp(),
            data,
            previous_hash,
            hash: String::new(),
        };
        block.hash = block.compute_hash()?;
        Ok(block)
    }

    /// Create the genesis block
    pub fn genesis() -> LedgerResult<Self> {
        Block::new(0, BlockData::Genesis, GENESIS_PREVIOUS_HASH.to_string())
    }

    /// Recompute the hash from the block's own fields
    pub fn compute_hash(&self) -> LedgerResult<String> {
        let data_bytes = serde_json::to_vec(&self.data)?;

        let mut hasher = Sha3_256::new();
        hasher.update(self.index.to_le_bytes());
        hasher.update(self.timestamp.to_le_bytes());
        hasher.update(&data_bytes);
        hasher.update(self.previous_hash.as_bytes());
        Ok(hex::encode(hasher.finalize()))
    }

    pub fn verification(&self) -> Option<&VerificationRecord> {
        match &self.data {
            BlockData::Verification(record) => Some(record),
            _ => None,
        }
    }
}

/// The verification ledger
#[derive(Debug, Clone)]
pub struct Ledger {
    /// All blocks in order
    blocks: Vec<Block>,

    /// Reason the ledger stopped accepting appends, if it has
    halted: Option<String>,
}

impl Ledger {
    /// Create a ledger holding only the genesis block
    pub fn new() -> LedgerResult<Self> {
        Ok(Ledger {
            blocks: vec![Block::genesis()?],
            halted: None,
        })
    }

    /// Adopt previously persisted blocks
    ///
    /// An empty list starts a fresh chain. A list that fails verification is kept
    /// as-is but the ledger starts halted.
    pub fn from_blocks(blocks: Vec<Block>) -> LedgerResult<Self> {
        if blocks.is_empty() {
            return Self::new();
        }

        let mut ledger = Ledger {
            blocks,
            halted: None,
        };

        if let Err(e) = ledger.check_integrity() {
            error!("Loaded chain failed verification: {}", e);
            ledger.halted = Some(e.to_string());
        }

        Ok(ledger)
    }

    /// Append a payload as a new block
    pub fn append(&mut self, data: BlockData) -> LedgerResult<Block> {
        self.ensure_writable()?;

        let previous = self.blocks.last().ok_or_else(|| LedgerError::ChainIntegrity {
            index: 0,
            reason: "chain has no genesis block".to_string(),
        })?;

        let block = Block::new(previous.index + 1, data, previous.hash.clone())?;
        self.blocks.push(block.clone());

        info!("Appended block {} ({}...)", block.index, &block.hash[..16]);
        Ok(block)
    }

    /// Fail unless the ledger can accept appends, halting it on a fresh failure
    pub fn ensure_writable(&mut self) -> LedgerResult<()> {
        if let Some(reason) = &self.halted {
            return Err(LedgerError::Halted(reason.clone()));
        }

        if let Err(e) = self.check_integrity() {
            if e.is_integrity_failure() {
                error!("Halting ledger: {}", e);
                self.halted = Some(e.to_string());
            }
            return Err(e);
        }

        Ok(())
    }

    /// Recompute every hash from genesis and confirm linkage
    pub fn verify_chain(&self) -> bool {
        self.check_integrity().is_ok()
    }

    /// Like [`Ledger::verify_chain`] but reports the first failing block
    pub fn check_integrity(&self) -> LedgerResult<()> {
        match self.first_invalid()? {
            None => Ok(()),
            Some((position, reason)) => Err(LedgerError::ChainIntegrity {
                index: position as u64,
                reason,
            }),
        }
    }

    /// The verified chain
    pub fn chain(&self) -> LedgerResult<&[Block]> {
        if let Some(reason) = &self.halted {
            return Err(LedgerError::Halted(reason.clone()));
        }
        self.check_integrity()?;
        Ok(&self.blocks)
    }

    /// Truncate to the longest valid prefix and resume accepting appends
    ///
    /// Returns the number of blocks dropped.
    pub fn recover(&mut self) -> LedgerResult<usize> {
        let keep = match self.first_invalid()? {
            None => self.blocks.len(),
            Some((position, _)) => position,
        };

        let dropped = self.blocks.len() - keep;
        self.blocks.truncate(keep);
        if self.blocks.is_empty() {
            self.blocks.push(Block::genesis()?);
        }

        if dropped > 0 || self.halted.is_some() {
            warn!("Ledger recovered, dropped {} block(s)", dropped);
        }
        self.halted = None;
        Ok(dropped)
    }

    /// Refuse further appends and reads until [`Ledger::recover`] runs
    ///
    /// Used when the chain in memory can no longer be trusted to match what
    /// was persisted. The first reason given is kept.
    pub fn halt(&mut self, reason: impl Into<String>) {
        if self.halted.is_none() {
            let reason = reason.into();
            error!("Halting ledger: {}", reason);
            self.halted = Some(reason);
        }
    }

    pub fn is_halted(&self) -> bool {
        self.halted.is_some()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Get block by index, unverified
    pub fn block(&self, index: u64) -> LedgerResult<&Block> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.blocks.get(i))
            .ok_or(LedgerError::BlockNotFound(index))
    }

    pub fn last_block(&self) -> Option<&Block> {
        self.blocks.last()
    }

    /// Verification records in chain order, unverified
    pub fn verification_records(&self) -> impl Iterator<Item = &VerificationRecord> {
        self.blocks.iter().filter_map(Block::verification)
    }

    /// Position and reason of the first block that breaks the chain
    fn first_invalid(&self) -> LedgerResult<Option<(usize, String)>> {
        for (position, block) in self.blocks.iter().enumerate() {
            if block.index != position as u64 {
                return Ok(Some((
                    position,
                    format!("index {} out of sequence", block.index),
                )));
            }

            if block.compute_hash()? != block.hash {
                return Ok(Some((
                    position,
                    "stored hash does not match block contents".to_string(),
                )));
            }

            let expected_previous = match position {
                0 => GENESIS_PREVIOUS_HASH,
                _ => self.blocks[position - 1].hash.as_str(),
            };
            if block.previous_hash != expected_previous {
                return Ok(Some((
                    position,
                    "previous_hash does not link to the preceding block".to_string(),
                )));
            }
        }

        if self.blocks.is_empty() {
            return Ok(Some((0, "chain has no genesis block".to_string())));
        }

        Ok(None)
    }

    #[cfg(test)]
    pub(crate) fn blocks_mut(&mut self) -> &mut Vec<Block> {
        &mut self.blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sylva_sentinel::Sentinel;

    fn record() -> VerificationRecord {
        Sentinel::default().estimate(11.4102, 76.6950).unwrap()
    }

    fn trade(id: &str) -> BlockData {
        BlockData::CarbonCreditTrade(TradeRecord {
            transaction_id: id.to_string(),
            buyer: "Acme Steel".to_string(),
            seller: "Green Forge".to_string(),
            amount: 10.0,
            price: 5.0,
            total_value: 50.0,
        })
    }

    #[test]
    fn test_genesis_block_creation() {
        let genesis = Block::genesis().unwrap();

        assert_eq!(genesis.index, 0);
        assert_eq!(genesis.previous_hash, GENESIS_PREVIOUS_HASH);
        assert_eq!(genesis.hash, genesis.compute_hash().unwrap());
        assert_eq!(genesis.hash.len(), 64);
    }

    #[test]
    fn test_append_links_blocks() {
        let mut ledger = Ledger::new().unwrap();
        let first = ledger.append(BlockData::Verification(record())).unwrap();
        let second = ledger.append(trade("TXN-3000")).unwrap();

        assert_eq!(first.index, 1);
        assert_eq!(second.index, 2);
        assert_eq!(second.previous_hash, first.hash);
        assert_eq!(ledger.len(), 3);
        assert!(ledger.verify_chain());
    }

    #[test]
    fn test_hash_covers_payload() {
        let mut ledger = Ledger::new().unwrap();
        ledger.append(trade("TXN-3000")).unwrap();

        let mut block = ledger.block(1).unwrap().clone();
        block.data = trade("TXN-9999");
        assert_ne!(block.compute_hash().unwrap(), block.hash);
    }

    #[test]
    fn test_tampered_payload_halts_appends() {
        let mut ledger = Ledger::new().unwrap();
        ledger.append(trade("TXN-3000")).unwrap();
        ledger.append(trade("TXN-3001")).unwrap();

        ledger.blocks_mut()[1].data = trade("TXN-6666");
        assert!(!ledger.verify_chain());

        let err = ledger.append(trade("TXN-3002")).unwrap_err();
        assert!(matches!(err, LedgerError::ChainIntegrity { index: 1, .. }));
        assert!(ledger.is_halted());

        // stays halted even though nothing changed since
        assert!(matches!(
            ledger.append(trade("TXN-3002")),
            Err(LedgerError::Halted(_))
        ));
        assert!(ledger.chain().is_err());
    }

    #[test]
    fn test_rehashed_block_breaks_linkage() {
        let mut ledger = Ledger::new().unwrap();
        ledger.append(trade("TXN-3000")).unwrap();
        ledger.append(trade("TXN-3001")).unwrap();

        // a forger recomputes the tampered block's own hash
        let blocks = ledger.blocks_mut();
        blocks[1].data = trade("TXN-6666");
        blocks[1].hash = blocks[1].compute_hash().unwrap();

        let err = ledger.check_integrity().unwrap_err();
        assert!(matches!(err, LedgerError::ChainIntegrity { index: 2, .. }));
    }

    #[test]
    fn test_halt_blocks_appends_until_recover() {
        let mut ledger = Ledger::new().unwrap();
        ledger.halt("block 1 not persisted");
        ledger.halt("second reason is ignored");

        match ledger.append(BlockData::Verification(record())) {
            Err(LedgerError::Halted(reason)) => assert_eq!(reason, "block 1 not persisted"),
            other => panic!("expected halted ledger, got {other:?}"),
        }
        assert!(ledger.chain().is_err());

        assert_eq!(ledger.recover().unwrap(), 0);
        assert!(ledger.append(BlockData::Verification(record())).is_ok());
    }

    #[test]
    fn test_recover_truncates_to_valid_prefix() {
        let mut ledger = Ledger::new().unwrap();
        ledger.append(trade("TXN-3000")).unwrap();
        ledger.append(trade("TXN-3001")).unwrap();
        ledger.append(trade("TXN-3002")).unwrap();

        ledger.blocks_mut()[2].timestamp += 1;
        assert!(ledger.append(trade("TXN-3003")).is_err());

        let dropped = ledger.recover().unwrap();
        assert_eq!(dropped, 2);
        assert_eq!(ledger.len(), 2);
        assert!(!ledger.is_halted());

        let block = ledger.append(trade("TXN-3003")).unwrap();
        assert_eq!(block.index, 2);
        assert!(ledger.verify_chain());
    }

    #[test]
    fn test_recover_replaces_broken_genesis() {
        let mut ledger = Ledger::new().unwrap();
        ledger.blocks_mut()[0].previous_hash = "ff".to_string();

        assert_eq!(ledger.recover().unwrap(), 1);
        assert_eq!(ledger.len(), 1);
        assert!(ledger.verify_chain());
    }

    #[test]
    fn test_block_wire_format() {
        let mut ledger = Ledger::new().unwrap();
        let block = ledger.append(BlockData::Verification(record())).unwrap();

        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(value["data"]["type"], "VERIFICATION");
        assert_eq!(value["data"]["status"], "VERIFIED");
        assert_eq!(value["index"], 1);

        let parsed: Block = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.compute_hash().unwrap(), block.hash);
    }

    #[test]
    fn test_missing_block_lookup() {
        let ledger = Ledger::new().unwrap();
        assert!(matches!(ledger.block(7), Err(LedgerError::BlockNotFound(7))));
    }

    #[test]
    fn test_verification_records_projection() {
        let mut ledger = Ledger::new().unwrap();
        ledger.append(BlockData::Verification(record())).unwrap();
        ledger.append(trade("TXN-3000")).unwrap();

        assert_eq!(ledger.verification_records().count(), 1);
    }
}
