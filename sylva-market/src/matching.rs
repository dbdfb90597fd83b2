//! Price-time priority matching of buy orders against listings

use std::cmp::Ordering;

use crate::types::Listing;

/// Amounts closer than this are treated as equal
pub const CREDIT_EPSILON: f64 = 1e-9;

/// A planned fill against one listing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fill {
    /// Position of the listing in the book
    pub listing_index: usize,
    pub amount: f64,
    pub price: f64,
    /// Whether the fill consumes the listing's remaining supply
    pub exhausts_listing: bool,
}

/// Why an order could not be filled at all
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoMatch {
    /// No active listing from another seller exists
    InsufficientSupply,
    /// Supply exists but all of it is priced above the order's limit
    NoListingsUnderMaxPrice,
}

impl NoMatch {
    pub fn reason(self) -> &'static str {
        match self {
            NoMatch::InsufficientSupply => "insufficient supply",
            NoMatch::NoListingsUnderMaxPrice => "no listings under max price",
        }
    }
}

/// Plan the fills for a buy order without touching the book
///
/// Eligible listings are ordered by ascending price, then oldest `created_at`,
/// then book position, and consumed greedily until `amount` is filled or supply
/// runs out.
pub fn plan_fills(
    listings: &[Listing],
    buyer_id: &str,
    amount: f64,
    max_price_per_credit: f64,
    allow_self_trade: bool,
) -> Result<Vec<Fill>, NoMatch> {
    let supply: Vec<usize> = listings
        .iter()
        .enumerate()
        .filter(|(_, l)| {
            l.is_active()
                && l.available_amount > CREDIT_EPSILON
                && (allow_self_trade || l.seller_id != buyer_id)
        })
        .map(|(i, _)| i)
        .collect();

    if supply.is_empty() {
        return Err(NoMatch::InsufficientSupply);
    }

    let mut eligible: Vec<usize> = supply
        .into_iter()
        .filter(|&i| listings[i].price_per_credit <= max_price_per_credit)
        .collect();

    if eligible.is_empty() {
        return Err(NoMatch::NoListingsUnderMaxPrice);
    }

    eligible.sort_by(|&a, &b| price_time_priority(&listings[a], &listings[b]).then(a.cmp(&b)));

    let mut remaining = amount;
    let mut fills = Vec::new();

    for index in eligible {
        if remaining <= CREDIT_EPSILON {
            break;
        }

        let listing = &listings[index];
        let take = remaining.min(listing.available_amount);
        remaining -= take;

        fills.push(Fill {
            listing_index: index,
            amount: take,
            price: listing.price_per_credit,
            exhausts_listing: listing.available_amount - take <= CREDIT_EPSILON,
        });
    }

    Ok(fills)
}

fn price_time_priority(a: &Listing, b: &Listing) -> Ordering {
    a.price_per_credit
        .total_cmp(&b.price_per_credit)
        .then(a.created_at.cmp(&b.created_at))
}
