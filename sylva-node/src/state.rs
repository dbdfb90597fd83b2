//! Shared node state

use std::sync::Arc;

use anyhow::Context;
use sylva_ledger::{Block, BlockStore, Ledger, LedgerResult};
use sylva_market::Marketplace;
use sylva_sentinel::Sentinel;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::config::NodeConfig;

/// Everything a request can read or mutate
pub struct Platform {
    pub ledger: Ledger,
    pub sentinel: Sentinel,
    pub market: Marketplace,
}

impl Platform {
    /// Build the platform around a previously persisted ledger
    ///
    /// Verified sites already on the ledger are fed back to the sentinel so
    /// double counting is still caught after a restart.
    pub fn new(config: &NodeConfig, ledger: Ledger) -> Self {
        if ledger.is_halted() {
            warn!("Loaded ledger failed verification; writes are halted until repaired");
        }

        let mut sentinel = Sentinel::new(config.sentinel.clone());
        sentinel.restore_history(ledger.verification_records().cloned());

        Self {
            ledger,
            sentinel,
            market: Marketplace::new(config.market.clone()),
        }
    }
}

/// State handed to every axum handler
#[derive(Clone)]
pub struct AppState {
    pub platform: Arc<RwLock<Platform>>,
    pub store: Option<BlockStore>,
}

impl AppState {
    /// Open the configured block store (if any) and load the chain from it
    pub fn open(config: &NodeConfig) -> anyhow::Result<Self> {
        let store = match &config.ledger.data_dir {
            Some(dir) => Some(
                BlockStore::open(dir)
                    .with_context(|| format!("failed to open block store at {}", dir.display()))?,
            ),
            None => None,
        };

        let ledger = match &store {
            Some(store) => store.load_ledger().context("failed to load persisted blocks")?,
            None => Ledger::new()?,
        };

        let platform = Platform::new(config, ledger);
        info!(
            "Ledger ready with {} block(s), {} prior verification(s)",
            platform.ledger.len(),
            platform.sentinel.history().len()
        );

        // Fresh stores get the genesis block on disk straight away
        if let Some(store) = &store {
            if !platform.ledger.is_halted() && !store.has_block(0) {
                store.save_block(platform.ledger.block(0)?)?;
            }
        }

        Ok(Self {
            platform: Arc::new(RwLock::new(platform)),
            store,
        })
    }

    /// In-memory state with no persistence
    pub fn in_memory(config: &NodeConfig) -> LedgerResult<Self> {
        Ok(Self {
            platform: Arc::new(RwLock::new(Platform::new(config, Ledger::new()?))),
            store: None,
        })
    }

    /// Write a freshly appended block to the store, if there is one
    ///
    /// A failed write halts the ledger: the block is already visible in memory
    /// and later appends must not build on a chain the disk does not hold.
    pub fn persist(&self, ledger: &mut Ledger, block: &Block) -> LedgerResult<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };

        store.save_block(block).map_err(|e| {
            ledger.halt(format!("block {} was not persisted: {e}", block.index));
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sylva_ledger::BlockData;
    use tempfile::tempdir;

    fn persisted_config(dir: &std::path::Path) -> NodeConfig {
        let mut config = NodeConfig::default();
        config.ledger.data_dir = Some(dir.to_path_buf());
        config
    }

    #[tokio::test]
    async fn test_in_memory_state_starts_at_genesis() {
        let state = AppState::in_memory(&NodeConfig::default()).unwrap();
        let platform = state.platform.read().await;
        assert_eq!(platform.ledger.len(), 1);
        assert!(platform.sentinel.history().is_empty());
        assert!(state.store.is_none());
    }

    #[tokio::test]
    async fn test_fresh_store_persists_genesis() {
        let dir = tempdir().unwrap();
        let state = AppState::open(&persisted_config(dir.path())).unwrap();

        let store = state.store.as_ref().unwrap();
        assert_eq!(store.load_blocks().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_restart_restores_sentinel_history() {
        let dir = tempdir().unwrap();
        let config = persisted_config(dir.path());

        {
            let state = AppState::open(&config).unwrap();
            let mut platform = state.platform.write().await;
            let record = platform.sentinel.verify(11.4102, 76.6950).unwrap();
            let block = platform
                .ledger
                .append(BlockData::Verification(record))
                .unwrap();
            state.persist(&mut platform.ledger, &block).unwrap();
        }

        let state = AppState::open(&config).unwrap();
        let mut platform = state.platform.write().await;
        assert_eq!(platform.ledger.len(), 2);
        assert_eq!(platform.sentinel.history().len(), 1);

        let again = platform.sentinel.verify(11.4102, 76.6950).unwrap();
        assert!(!again.is_verified());
    }
}
