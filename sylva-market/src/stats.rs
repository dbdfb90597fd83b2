//! Market statistics derived from the transaction history

use chrono::Utc;

use crate::types::MarketStats;
use crate::Marketplace;

impl Marketplace {
    /// Compute statistics from current state; nothing here is cached
    pub fn compute_stats(&self) -> MarketStats {
        let total_volume_usd: f64 = self.transactions.iter().map(|t| t.total_price).sum();
        let total_credits_traded: f64 = self.transactions.iter().map(|t| t.credit_amount).sum();

        let average_price_per_credit = if total_credits_traded > 0.0 {
            total_volume_usd / total_credits_traded
        } else {
            0.0
        };

        MarketStats {
            total_companies: self.companies.len(),
            active_listings: self.listings.iter().filter(|l| l.is_active()).count(),
            total_transactions: self.transactions.len(),
            total_volume_usd,
            total_credits_traded,
            average_price_per_credit,
            last_updated: Utc::now(),
        }
    }
}
