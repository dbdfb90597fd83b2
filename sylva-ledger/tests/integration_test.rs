//! Integration test covering the ledger lifecycle with on-disk persistence

use std::fs;

use sylva_ledger::*;
use sylva_sentinel::Sentinel;
use tempfile::tempdir;

#[test]
fn test_verifications_persist_and_reload() {
    let temp_dir = tempdir().unwrap();
    let store = BlockStore::open(temp_dir.path()).unwrap();

    let mut sentinel = Sentinel::default();
    let mut ledger = Ledger::new().unwrap();
    store.save_all(ledger.chain().unwrap()).unwrap();

    for (lat, lon) in [(11.4102, 76.6950), (48.85, 2.35), (-30.0, 80.0)] {
        let record = sentinel.verify(lat, lon).unwrap();
        let block = ledger.append(BlockData::Verification(record)).unwrap();
        store.save_block(&block).unwrap();
    }

    let reloaded = Ledger::from_blocks(store.load_blocks().unwrap()).unwrap();
    assert!(!reloaded.is_halted());
    assert_eq!(reloaded.len(), 4);
    assert_eq!(reloaded.verification_records().count(), 3);
    assert_eq!(reloaded.audit_log().unwrap().len(), 3);
    assert_eq!(
        reloaded.last_block().unwrap().hash,
        ledger.last_block().unwrap().hash
    );
}

#[test]
fn test_tampered_file_halts_reloaded_ledger() {
    let temp_dir = tempdir().unwrap();
    let store = BlockStore::open(temp_dir.path()).unwrap();

    let mut sentinel = Sentinel::default();
    let mut ledger = Ledger::new().unwrap();
    let record = sentinel.verify(11.4102, 76.6950).unwrap();
    ledger.append(BlockData::Verification(record)).unwrap();
    store.save_all(ledger.chain().unwrap()).unwrap();

    // inflate the credits recorded in block 1
    let path = temp_dir.path().join("block_1.json");
    let mut block: Block = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    if let BlockData::Verification(record) = &mut block.data {
        record.carbon_credits = 999.0;
    }
    fs::write(&path, serde_json::to_string_pretty(&block).unwrap()).unwrap();

    let mut reloaded = Ledger::from_blocks(store.load_blocks().unwrap()).unwrap();
    assert!(reloaded.is_halted());
    assert!(!reloaded.verify_chain());
    assert!(reloaded.audit_log().is_err());
    assert!(matches!(
        reloaded.append(BlockData::Genesis),
        Err(LedgerError::Halted(_))
    ));

    let dropped = reloaded.recover().unwrap();
    assert_eq!(dropped, 1);
    assert_eq!(store.truncate(reloaded.len()).unwrap(), 1);
    assert!(reloaded.verify_chain());
}

#[test]
fn test_empty_store_starts_fresh_chain() {
    let temp_dir = tempdir().unwrap();
    let store = BlockStore::open(temp_dir.path().join("ledger")).unwrap();

    let ledger = Ledger::from_blocks(store.load_blocks().unwrap()).unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger.chain().unwrap()[0].previous_hash, GENESIS_PREVIOUS_HASH);
}

#[test]
fn test_unreadable_trade_block_halts_until_repaired() {
    let temp_dir = tempdir().unwrap();
    let store = BlockStore::open(temp_dir.path()).unwrap();

    let mut ledger = Ledger::new().unwrap();
    let record = Sentinel::default().verify(11.4102, 76.6950).unwrap();
    ledger.append(BlockData::Verification(record)).unwrap();
    let trade = ledger
        .append(BlockData::CarbonCreditTrade(TradeRecord {
            transaction_id: "TXN-3000".to_string(),
            buyer: "Company B".to_string(),
            seller: "Company A".to_string(),
            amount: 10.0,
            price: 5.0,
            total_value: 50.0,
        }))
        .unwrap();
    store.save_all(ledger.chain().unwrap()).unwrap();

    // the newest block file is torn
    let path = temp_dir.path().join(format!("block_{}.json", trade.index));
    fs::write(&path, "{ \"index\": 2, \"timestamp\":").unwrap();

    let mut reloaded = store.load_ledger().unwrap();
    assert!(reloaded.is_halted());
    assert_eq!(reloaded.len(), 2);
    assert!(matches!(
        reloaded.append(BlockData::Genesis),
        Err(LedgerError::Halted(_))
    ));

    assert_eq!(reloaded.recover().unwrap(), 0);
    assert_eq!(store.truncate(reloaded.len()).unwrap(), 1);

    let repaired = store.load_ledger().unwrap();
    assert!(!repaired.is_halted());
    assert_eq!(repaired.len(), 2);
}
