//! Audit log projection over the ledger

use serde::{Deserialize, Serialize};

use crate::chain::{Block, BlockData, Ledger};
use crate::LedgerResult;

/// One audit log line per recorded payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: i64,
    pub block_index: u64,
    /// Abbreviated block hash
    pub block_hash: String,
    pub kind: String,
    pub location: String,
    pub status: String,
    pub carbon_credits: f64,
    pub green_cover: Option<f64>,
}

impl AuditEntry {
    /// Build the entry for a block; genesis has none
    pub fn from_block(block: &Block) -> Option<Self> {
        let block_hash = format!("{}...", &block.hash[..block.hash.len().min(16)]);

        match &block.data {
            BlockData::Genesis => None,
            BlockData::Verification(record) => Some(AuditEntry {
                timestamp: block.timestamp,
                block_index: block.index,
                block_hash,
                kind: "VERIFICATION".to_string(),
                location: record.location(),
                status: if record.is_verified() { "VERIFIED" } else { "FLAGGED" }.to_string(),
                carbon_credits: record.carbon_credits,
                green_cover: Some(record.green_cover_percentage),
            }),
            BlockData::CarbonCreditTrade(trade) => Some(AuditEntry {
                timestamp: block.timestamp,
                block_index: block.index,
                block_hash,
                kind: "CARBON_CREDIT_TRADE".to_string(),
                location: "N/A".to_string(),
                status: "COMPLETED".to_string(),
                carbon_credits: trade.amount,
                green_cover: None,
            }),
        }
    }
}

impl Ledger {
    /// Audit log over the verified chain
    pub fn audit_log(&self) -> LedgerResult<Vec<AuditEntry>> {
        Ok(self
            .chain()?
            .iter()
            .filter_map(AuditEntry::from_block)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::TradeRecord;
    use sylva_sentinel::Sentinel;

    #[test]
    fn test_audit_log_skips_genesis() {
        let ledger = Ledger::new().unwrap();
        assert!(ledger.audit_log().unwrap().is_empty());
    }

    #[test]
    fn test_audit_entries() {
        let mut ledger = Ledger::new().unwrap();
        let record = Sentinel::default().estimate(11.4102, 76.6950).unwrap();
        let verification = ledger.append(BlockData::Verification(record)).unwrap();
        ledger
            .append(BlockData::CarbonCreditTrade(TradeRecord {
                transaction_id: "TXN-3000".to_string(),
                buyer: "Acme Steel".to_string(),
                seller: "Green Forge".to_string(),
                amount: 10.0,
                price: 5.0,
                total_value: 50.0,
            }))
            .unwrap();

        let entries = ledger.audit_log().unwrap();
        assert_eq!(entries.len(), 2);

        assert_eq!(entries[0].block_index, 1);
        assert_eq!(entries[0].location, "(11.4102, 76.695)");
        assert_eq!(entries[0].status, "VERIFIED");
        assert_eq!(entries[0].green_cover, Some(94.5));
        assert_eq!(entries[0].block_hash, format!("{}...", &verification.hash[..16]));

        assert_eq!(entries[1].kind, "CARBON_CREDIT_TRADE");
        assert_eq!(entries[1].location, "N/A");
        assert_eq!(entries[1].carbon_credits, 10.0);
        assert_eq!(entries[1].green_cover, None);
    }
}
