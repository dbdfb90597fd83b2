//! Sylva Carbon Credit Marketplace
//!
//! B2B trading of verified carbon credits between manufacturing companies.
//! Sellers list credits (optionally citing a sentinel verification), buyers
//! place orders with a price ceiling, and the engine fills them against the
//! cheapest, oldest listings first.
//!
//! Features:
//! - Company registry with unique contact emails
//! - Listings with an ACTIVE -> CLOSED lifecycle
//! - Price-time priority matching with partial fills across listings
//! - Transaction history, company profiles and derived market statistics
//! - Buyer inquiries routed to sellers

use std::collections::HashMap;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

pub mod config;
pub mod error;
pub mod matching;
pub mod stats;
pub mod types;

pub use config::MarketConfig;
pub use error::{MarketError, MarketResult};
pub use types::*;

use matching::{plan_fills, Fill, CREDIT_EPSILON};

/// In-memory marketplace state
#[derive(Debug, Clone, Default)]
pub struct Marketplace {
    /// Configuration
    config: MarketConfig,
    /// Registered companies by id
    companies: HashMap<String, Company>,
    /// Every listing ever created, in creation order
    listings: Vec<Listing>,
    /// Every buy order, in arrival order
    orders: Vec<BuyOrder>,
    /// Completed transactions, in execution order
    transactions: Vec<Transaction>,
    listings_issued: u64,
    orders_issued: u64,
    transactions_issued: u64,
}

impl Marketplace {
    /// Create an empty marketplace
    pub fn new(config: MarketConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &MarketConfig {
        &self.config
    }

    /// Register a company and return its id
    ///
    /// Without an email the company is reachable at `contact@<name>.com`.
    pub fn register_company(
        &mut self,
        name: &str,
        industry: &str,
        country: &str,
        email: Option<&str>,
    ) -> MarketResult<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(MarketError::InvalidInput(
                "company name cannot be empty".to_string(),
            ));
        }

        let email = match email.map(str::trim).filter(|e| !e.is_empty()) {
            Some(email) => email.to_string(),
            None => format!(
                "contact@{}.com",
                name.to_lowercase().replace(char::is_whitespace, "")
            ),
        };

        if self
            .companies
            .values()
            .any(|c| c.email.eq_ignore_ascii_case(&email))
        {
            return Err(MarketError::DuplicateCompany(email));
        }

        let company_id = Uuid::new_v4().simple().to_string()[..12].to_string();
        let company = Company {
            company_id: company_id.clone(),
            name: name.to_string(),
            industry: industry.trim().to_string(),
            country: country.trim().to_string(),
            email,
            credits_owned: 0.0,
            credits_sold: 0.0,
            total_trades: 0,
            joined_at: Utc::now(),
        };

        info!("Registered company {} ({})", company.name, company_id);
        self.companies.insert(company_id.clone(), company);
        Ok(company_id)
    }

    /// List credits for sale
    pub fn create_listing(&mut self, request: ListingRequest) -> MarketResult<Listing> {
        let seller = self
            .companies
            .get(&request.seller_id)
            .ok_or_else(|| MarketError::company_not_found(&request.seller_id))?;

        ensure_tradeable(
            request.credit_amount,
            "price per credit",
            request.price_per_credit,
        )?;

        let listing_id = format!("LST-{}", self.config.first_listing_id + self.listings_issued);
        self.listings_issued += 1;

        let listing = Listing {
            listing_id,
            seller_id: seller.company_id.clone(),
            seller_name: seller.name.clone(),
            credit_amount: request.credit_amount,
            available_amount: request.credit_amount,
            price_per_credit: request.price_per_credit,
            total_value: request.credit_amount * request.price_per_credit,
            verification_data: request.verification_data,
            location: request.location,
            description: request.description,
            status: ListingStatus::Active,
            created_at: Utc::now(),
            interested_buyers: 0,
        };

        info!(
            "Listing {} created: {} credits at {} by {}",
            listing.listing_id, listing.credit_amount, listing.price_per_credit, listing.seller_name
        );
        self.listings.push(listing.clone());
        Ok(listing)
    }

    /// Record a buy order and fill it against the book
    pub fn place_buy_order(
        &mut self,
        buyer_id: &str,
        credit_amount: f64,
        max_price_per_credit: f64,
    ) -> MarketResult<OrderOutcome> {
        let buyer_name = self
            .companies
            .get(buyer_id)
            .map(|c| c.name.clone())
            .ok_or_else(|| MarketError::company_not_found(buyer_id))?;

        // Every fill is bounded by amount * max price, so this bounds all totals
        ensure_tradeable(credit_amount, "max price per credit", max_price_per_credit)?;

        let order_id = format!("ORD-{}", self.config.first_order_id + self.orders_issued);
        self.orders_issued += 1;

        let plan = plan_fills(
            &self.listings,
            buyer_id,
            credit_amount,
            max_price_per_credit,
            self.config.allow_self_trade,
        );

        let (transactions, reason) = match plan {
            Ok(fills) => {
                let transactions = fills
                    .into_iter()
                    .map(|fill| self.settle(&order_id, buyer_id, &buyer_name, fill))
                    .collect::<MarketResult<Vec<_>>>()?;
                (transactions, None)
            }
            Err(no_match) => {
                warn!("Order {} unmatched: {}", order_id, no_match.reason());
                (Vec::new(), Some(no_match.reason().to_string()))
            }
        };

        let filled_amount: f64 = transactions.iter().map(|t| t.credit_amount).sum();
        let unfilled_amount = (credit_amount - filled_amount).max(0.0);
        let status = if transactions.is_empty() {
            OrderStatus::Unfilled
        } else if unfilled_amount <= CREDIT_EPSILON {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };

        let order = BuyOrder {
            order_id,
            buyer_id: buyer_id.to_string(),
            buyer_name,
            credit_amount,
            max_price_per_credit,
            filled_amount,
            status,
            created_at: Utc::now(),
        };
        self.orders.push(order.clone());

        info!(
            "Order {} {:?}: {} of {} credits in {} transaction(s)",
            order.order_id,
            order.status,
            filled_amount,
            credit_amount,
            transactions.len()
        );

        Ok(OrderOutcome {
            order,
            match_result: MatchResult {
                matched: !transactions.is_empty(),
                reason,
                transaction: transactions.first().cloned(),
                transactions,
                filled_amount,
                unfilled_amount,
            },
        })
    }

    /// Apply one fill to the book and both companies
    fn settle(
        &mut self,
        order_id: &str,
        buyer_id: &str,
        buyer_name: &str,
        fill: Fill,
    ) -> MarketResult<Transaction> {
        let listing = self
            .listings
            .get_mut(fill.listing_index)
            .ok_or_else(|| MarketError::listing_not_found(&fill.listing_index.to_string()))?;

        if fill.exhausts_listing {
            listing.available_amount = 0.0;
            listing.status = ListingStatus::Closed;
        } else {
            listing.available_amount -= fill.amount;
        }

        let transaction_id = format!(
            "TXN-{}",
            self.config.first_transaction_id + self.transactions_issued
        );
        self.transactions_issued += 1;

        let transaction = Transaction {
            transaction_id,
            order_id: order_id.to_string(),
            listing_id: listing.listing_id.clone(),
            buyer_id: buyer_id.to_string(),
            buyer_name: buyer_name.to_string(),
            seller_id: listing.seller_id.clone(),
            seller_name: listing.seller_name.clone(),
            credit_amount: fill.amount,
            price_per_credit: fill.price,
            total_price: fill.amount * fill.price,
            status: TransactionStatus::Completed,
            timestamp: Utc::now(),
        };

        if let Some(buyer) = self.companies.get_mut(buyer_id) {
            buyer.credits_owned += fill.amount;
            buyer.total_trades += 1;
        }
        if let Some(seller) = self.companies.get_mut(&transaction.seller_id) {
            seller.credits_sold += fill.amount;
            seller.total_trades += 1;
        }

        self.transactions.push(transaction.clone());
        Ok(transaction)
    }

    /// Active listings, newest first
    pub fn active_listings(&self, filter: &ListingFilter) -> Vec<Listing> {
        let mut active: Vec<Listing> = self
            .listings
            .iter()
            .rev()
            .filter(|l| l.is_active() && filter.matches(l))
            .cloned()
            .collect();
        active.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        active
    }

    pub fn listing(&self, listing_id: &str) -> MarketResult<&Listing> {
        self.listings
            .iter()
            .find(|l| l.listing_id == listing_id)
            .ok_or_else(|| MarketError::listing_not_found(listing_id))
    }

    /// Transaction history, optionally limited to one company's trades
    pub fn transactions(&self, company_id: Option<&str>) -> Vec<Transaction> {
        self.transactions
            .iter()
            .filter(|t| company_id.map_or(true, |id| t.buyer_id == id || t.seller_id == id))
            .cloned()
            .collect()
    }

    /// Buy orders in arrival order
    pub fn orders(&self) -> &[BuyOrder] {
        &self.orders
    }

    pub fn company(&self, company_id: &str) -> MarketResult<&Company> {
        self.companies
            .get(company_id)
            .ok_or_else(|| MarketError::company_not_found(company_id))
    }

    /// All companies, earliest registration first
    pub fn companies(&self) -> Vec<Company> {
        let mut companies: Vec<Company> = self.companies.values().cloned().collect();
        companies.sort_by(|a, b| {
            a.joined_at
                .cmp(&b.joined_at)
                .then_with(|| a.company_id.cmp(&b.company_id))
        });
        companies
    }

    /// Company details with its trades and open listings
    pub fn company_profile(&self, company_id: &str) -> MarketResult<CompanyProfile> {
        let company = self.company(company_id)?.clone();

        Ok(CompanyProfile {
            transactions: self.transactions(Some(company_id)),
            active_listings: self
                .listings
                .iter()
                .filter(|l| l.seller_id == company_id && l.is_active())
                .cloned()
                .collect(),
            company,
        })
    }

    /// Tell a listing's seller that a buyer is interested
    pub fn send_inquiry(&mut self, listing_id: &str, buyer_id: &str) -> MarketResult<Inquiry> {
        let buyer_name = self.company(buyer_id)?.name.clone();

        let listing = self
            .listings
            .iter_mut()
            .find(|l| l.listing_id == listing_id)
            .ok_or_else(|| MarketError::listing_not_found(listing_id))?;

        let seller = self
            .companies
            .get(&listing.seller_id)
            .ok_or_else(|| MarketError::company_not_found(&listing.seller_id))?;

        listing.interested_buyers += 1;

        info!(
            target: "sylva_market::notify",
            "Inquiry for {} sent to {} <{}>: buyer {} is interested in credits from {}",
            listing.listing_id, seller.name, seller.email, buyer_name, listing.location
        );

        Ok(Inquiry {
            message: format!("Inquiry sent to {}", seller.name),
            seller_email: seller.email.clone(),
        })
    }
}

/// Reject amounts below the matching resolution and totals that overflow
fn ensure_tradeable(credit_amount: f64, price_field: &str, price: f64) -> MarketResult<()> {
    ensure_positive("credit amount", credit_amount)?;
    ensure_positive(price_field, price)?;

    if credit_amount <= CREDIT_EPSILON {
        return Err(MarketError::InvalidAmount(format!(
            "credit amount {credit_amount} is below the smallest tradeable amount"
        )));
    }

    if !(credit_amount * price).is_finite() {
        return Err(MarketError::InvalidAmount(format!(
            "total value of {credit_amount} credits at {price} is out of range"
        )));
    }

    Ok(())
}

fn ensure_positive(field: &str, value: f64) -> MarketResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(MarketError::InvalidAmount(format!(
            "{field} must be positive, got {value}"
        )))
    }
}
