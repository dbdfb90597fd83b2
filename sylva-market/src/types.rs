//! Type definitions for the carbon credit marketplace

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sylva_sentinel::VerificationRecord;

/// A registered manufacturing company
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub company_id: String,
    pub name: String,
    pub industry: String,
    pub country: String,
    pub email: String,
    pub credits_owned: f64,
    pub credits_sold: f64,
    pub total_trades: u64,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub joined_at: DateTime<Utc>,
}

/// Listing status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ListingStatus {
    Active,
    Closed,
}

/// A sell offer for carbon credits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub listing_id: String,
    pub seller_id: String,
    pub seller_name: String,
    /// Amount originally offered
    pub credit_amount: f64,
    pub available_amount: f64,
    pub price_per_credit: f64,
    /// Value of the original offer
    pub total_value: f64,
    pub verification_data: Option<VerificationRecord>,
    pub location: String,
    pub description: String,
    pub status: ListingStatus,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
    pub interested_buyers: u64,
}

impl Listing {
    pub fn is_active(&self) -> bool {
        self.status == ListingStatus::Active
    }
}

/// Parameters for a new listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListingRequest {
    pub seller_id: String,
    pub credit_amount: f64,
    pub price_per_credit: f64,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub verification_data: Option<VerificationRecord>,
}

/// Filters for browsing active listings
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ListingFilter {
    pub max_price: Option<f64>,
    pub min_amount: Option<f64>,
}

impl ListingFilter {
    pub fn matches(&self, listing: &Listing) -> bool {
        self.max_price.map_or(true, |max| listing.price_per_credit <= max)
            && self.min_amount.map_or(true, |min| listing.available_amount >= min)
    }
}

/// Buy order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Filled,
    PartiallyFilled,
    Unfilled,
}

/// A buy order as recorded by the marketplace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuyOrder {
    pub order_id: String,
    pub buyer_id: String,
    pub buyer_name: String,
    pub credit_amount: f64,
    pub max_price_per_credit: f64,
    pub filled_amount: f64,
    pub status: OrderStatus,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
}

/// Transaction status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Completed,
}

/// A completed trade between a buyer and one listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: String,
    pub order_id: String,
    pub listing_id: String,
    pub buyer_id: String,
    pub buyer_name: String,
    pub seller_id: String,
    pub seller_name: String,
    pub credit_amount: f64,
    pub price_per_credit: f64,
    pub total_price: f64,
    pub status: TransactionStatus,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,
}

/// Result of matching a buy order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// First fill, if any
    pub transaction: Option<Transaction>,
    /// One transaction per matched listing, in fill order
    pub transactions: Vec<Transaction>,
    pub filled_amount: f64,
    pub unfilled_amount: f64,
}

/// A recorded order together with its match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderOutcome {
    pub order: BuyOrder,
    #[serde(rename = "match")]
    pub match_result: MatchResult,
}

/// Derived marketplace statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketStats {
    pub total_companies: usize,
    pub active_listings: usize,
    pub total_transactions: usize,
    pub total_volume_usd: f64,
    pub total_credits_traded: f64,
    /// Volume-weighted average over all transactions
    pub average_price_per_credit: f64,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub last_updated: DateTime<Utc>,
}

/// Company details with its trading activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    #[serde(flatten)]
    pub company: Company,
    pub transactions: Vec<Transaction>,
    pub active_listings: Vec<Listing>,
}

/// Confirmation that a seller was notified of buyer interest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inquiry {
    pub message: String,
    pub seller_email: String,
}
