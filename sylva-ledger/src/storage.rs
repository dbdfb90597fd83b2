//! Disk persistence for blocks (one JSON file per block)

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::chain::{Block, Ledger};
use crate::{LedgerError, LedgerResult};

/// Directory of `block_<index>.json` files
#[derive(Debug, Clone)]
pub struct BlockStore {
    dir: PathBuf,
}

/// Block files read from disk, split by whether they parsed
struct Scan {
    blocks: Vec<Block>,
    unreadable: Vec<(u64, String)>,
}

impl BlockStore {
    /// Open the store, creating the directory if needed
    pub fn open(dir: impl Into<PathBuf>) -> LedgerResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn block_path(&self, index: u64) -> PathBuf {
        self.dir.join(format!("block_{index}.json"))
    }

    /// Whether a file exists for the block at `index`
    pub fn has_block(&self, index: u64) -> bool {
        self.block_path(index).exists()
    }

    /// Write a block to disk, overwriting any file for the same index
    ///
    /// The file is staged next to its final name and renamed into place, so a
    /// crash mid-write never leaves a torn `block_<index>.json`.
    pub fn save_block(&self, block: &Block) -> LedgerResult<()> {
        let json = serde_json::to_string_pretty(block)?;
        let path = self.block_path(block.index);
        let staging = path.with_extension("json.tmp");

        fs::write(&staging, json)?;
        fs::rename(&staging, &path)?;

        debug!("Persisted block {} to {}", block.index, self.dir.display());
        Ok(())
    }

    /// Write every block of a chain
    pub fn save_all(&self, blocks: &[Block]) -> LedgerResult<()> {
        for block in blocks {
            self.save_block(block)?;
        }
        Ok(())
    }

    /// Load every block, sorted by index
    ///
    /// Fails with [`LedgerError::ChainIntegrity`] if any block file cannot be
    /// parsed.
    pub fn load_blocks(&self) -> LedgerResult<Vec<Block>> {
        let scan = self.scan()?;
        if let Some((index, reason)) = scan.unreadable.into_iter().next() {
            return Err(LedgerError::ChainIntegrity { index, reason });
        }
        Ok(scan.blocks)
    }

    /// Rebuild the ledger from disk
    ///
    /// Unreadable block files do not stop the load, but the ledger comes back
    /// halted so nothing is appended over a block that was committed earlier.
    pub fn load_ledger(&self) -> LedgerResult<Ledger> {
        let scan = self.scan()?;
        let mut ledger = Ledger::from_blocks(scan.blocks)?;

        if let Some((index, reason)) = scan.unreadable.first() {
            ledger.halt(format!("block {index}: {reason}"));
        }

        Ok(ledger)
    }

    fn scan(&self) -> LedgerResult<Scan> {
        let mut scan = Scan {
            blocks: Vec::new(),
            unreadable: Vec::new(),
        };

        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            let Some(index) = block_index(&path) else {
                debug!("Ignoring {}", path.display());
                continue;
            };

            let content = fs::read_to_string(&path)?;
            match serde_json::from_str::<Block>(&content) {
                Ok(block) => scan.blocks.push(block),
                Err(e) => {
                    warn!("Unreadable block file {}: {}", path.display(), e);
                    scan.unreadable
                        .push((index, format!("unreadable block file: {e}")));
                }
            }
        }

        scan.blocks.sort_by_key(|b| b.index);
        scan.unreadable.sort_by_key(|(index, _)| *index);
        Ok(scan)
    }

    /// Remove files for blocks at or beyond `len`
    pub fn truncate(&self, len: usize) -> LedgerResult<usize> {
        let mut removed = 0;

        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if let Some(index) = block_index(&path) {
                if index >= len as u64 {
                    fs::remove_file(&path)?;
                    removed += 1;
                }
            }
        }

        Ok(removed)
    }
}

/// Index encoded in a `block_<index>.json` file name
fn block_index(path: &Path) -> Option<u64> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .and_then(|s| s.strip_prefix("block_"))
        .and_then(|s| s.parse::<u64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{BlockData, TradeRecord};
    use tempfile::tempdir;

    fn trade_block(ledger: &mut Ledger, id: &str) -> Block {
        ledger
            .append(BlockData::CarbonCreditTrade(TradeRecord {
                transaction_id: id.to_string(),
                buyer: "Acme Steel".to_string(),
                seller: "Green Forge".to_string(),
                amount: 2.5,
                price: 7.25,
                total_value: 18.125,
            }))
            .unwrap()
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let temp_dir = tempdir().unwrap();
        let store = BlockStore::open(temp_dir.path()).unwrap();

        let mut ledger = Ledger::new().unwrap();
        trade_block(&mut ledger, "TXN-3000");
        trade_block(&mut ledger, "TXN-3001");
        store.save_all(ledger.chain().unwrap()).unwrap();

        let loaded = store.load_blocks().unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.as_slice(), ledger.chain().unwrap());

        let reloaded = Ledger::from_blocks(loaded).unwrap();
        assert!(!reloaded.is_halted());
        assert!(reloaded.verify_chain());
    }

    #[test]
    fn test_unreadable_block_file_fails_strict_load() {
        let temp_dir = tempdir().unwrap();
        let store = BlockStore::open(temp_dir.path()).unwrap();

        let ledger = Ledger::new().unwrap();
        store.save_all(ledger.chain().unwrap()).unwrap();
        fs::write(temp_dir.path().join("block_1.json"), "{ not json").unwrap();

        assert!(matches!(
            store.load_blocks(),
            Err(LedgerError::ChainIntegrity { index: 1, .. })
        ));
    }

    #[test]
    fn test_unreadable_last_block_halts_loaded_ledger() {
        let temp_dir = tempdir().unwrap();
        let store = BlockStore::open(temp_dir.path()).unwrap();

        let mut ledger = Ledger::new().unwrap();
        let block = trade_block(&mut ledger, "TXN-3000");
        store.save_all(ledger.chain().unwrap()).unwrap();
        fs::write(store.block_path(block.index), "{ \"index\": 1, \"data\": ").unwrap();

        let mut loaded = store.load_ledger().unwrap();
        assert!(loaded.is_halted());
        assert!(matches!(
            loaded.append(BlockData::Genesis),
            Err(LedgerError::Halted(_))
        ));
    }

    #[test]
    fn test_foreign_files_are_ignored() {
        let temp_dir = tempdir().unwrap();
        let store = BlockStore::open(temp_dir.path()).unwrap();

        let ledger = Ledger::new().unwrap();
        store.save_all(ledger.chain().unwrap()).unwrap();
        fs::write(temp_dir.path().join("notes.txt"), "ignored").unwrap();
        fs::write(temp_dir.path().join("manifest.json"), "{}").unwrap();
        fs::write(temp_dir.path().join("block_1.json.tmp"), "{ torn").unwrap();

        assert_eq!(store.load_blocks().unwrap().len(), 1);
        assert!(!store.load_ledger().unwrap().is_halted());
    }

    #[test]
    fn test_save_leaves_no_staging_file() {
        let temp_dir = tempdir().unwrap();
        let store = BlockStore::open(temp_dir.path()).unwrap();
        store.save_all(Ledger::new().unwrap().chain().unwrap()).unwrap();

        let names: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("block_0.json")]);
        assert!(store.has_block(0));
        assert!(!store.has_block(1));
    }

    #[test]
    fn test_truncate_removes_tail() {
        let temp_dir = tempdir().unwrap();
        let store = BlockStore::open(temp_dir.path()).unwrap();

        let mut ledger = Ledger::new().unwrap();
        trade_block(&mut ledger, "TXN-3000");
        trade_block(&mut ledger, "TXN-3001");
        store.save_all(ledger.chain().unwrap()).unwrap();

        assert_eq!(store.truncate(1).unwrap(), 2);
        assert_eq!(store.load_blocks().unwrap().len(), 1);
    }
}
