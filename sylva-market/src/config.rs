//! Configuration for the carbon credit marketplace

use serde::{Deserialize, Serialize};

use crate::{MarketError, MarketResult};

/// Marketplace configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    /// First number issued in `LST-<n>` listing ids
    pub first_listing_id: u64,
    /// First number issued in `ORD-<n>` order ids
    pub first_order_id: u64,
    /// First number issued in `TXN-<n>` transaction ids
    pub first_transaction_id: u64,
    /// Whether a buy order may consume the buyer's own listings
    pub allow_self_trade: bool,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            first_listing_id: 1000,
            first_order_id: 2000,
            first_transaction_id: 3000,
            allow_self_trade: false,
        }
    }
}

impl MarketConfig {
    /// Validate configuration
    pub fn validate(&self) -> MarketResult<()> {
        let ids = [
            self.first_listing_id,
            self.first_order_id,
            self.first_transaction_id,
        ];
        if ids.contains(&0) {
            return Err(MarketError::ConfigurationError(
                "Id counters must start above zero".to_string(),
            ));
        }
        Ok(())
    }
}
