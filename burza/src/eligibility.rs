//! Purchase and listing eligibility, derived from a cached snapshot.
//!
//! Everything in this module is pure: no I/O, no clock. Callers pass the
//! current year in.

use crate::errors::Rejection;
use crate::models::{Balance, Listing, SupplyInfo, Token, TokenStatus};

/// Maximum number of tokens a single user may hold per issuance year.
pub const ANNUAL_LIMIT: u32 = 20;

/// Tokens issued in `year` that still count against the quota (active or listed).
pub fn owned_this_year(balance: &Balance, year: i32) -> u32 {
    let owned = balance
        .tokens
        .iter()
        .filter(|t| t.issued_year == year && t.is_held())
        .count();
    u32::try_from(owned).unwrap_or(u32::MAX)
}

/// How many more tokens the user may buy for `year`. Clamped at zero.
pub fn max_additional_purchase(balance: &Balance, year: i32) -> u32 {
    ANNUAL_LIMIT.saturating_sub(owned_this_year(balance, year))
}

/// Tokens that may be newly listed: active and not partially consumed.
pub fn sellable_tokens(balance: &Balance) -> Vec<&Token> {
    balance.tokens.iter().filter(|t| is_sellable(t)).collect()
}

pub fn is_sellable(token: &Token) -> bool {
    token.status == TokenStatus::Active && token.is_untouched()
}

/// Tokens currently on sale.
pub fn listed_tokens(balance: &Balance) -> Vec<&Token> {
    balance
        .tokens
        .iter()
        .filter(|t| t.status == TokenStatus::Listed)
        .collect()
}

/// Validate a treasury purchase of `quantity` tokens for `year`.
///
/// Quota is checked before supply so a user who is over quota gets the quota
/// message even when the treasury is also short.
pub fn validate_purchase(
    quantity: u32,
    balance: &Balance,
    supply: Option<&SupplyInfo>,
    year: i32,
) -> Result<u32, Rejection> {
    if quantity < 1 {
        return Err(Rejection::QuantityBelowOne);
    }
    let max = max_additional_purchase(balance, year);
    if quantity > max {
        return Err(Rejection::ExceedsQuota { max, year });
    }
    let supply = supply.ok_or(Rejection::SupplyUnknown)?;
    if quantity > supply.treasury_available {
        return Err(Rejection::ExceedsTreasury {
            available: supply.treasury_available,
        });
    }
    Ok(quantity)
}

/// Whether the treasury purchase control is enabled at all.
pub fn treasury_purchase_enabled(balance: &Balance, supply: Option<&SupplyInfo>, year: i32) -> bool {
    match supply {
        Some(s) => s.treasury_available > 0 && max_additional_purchase(balance, year) > 0,
        None => false,
    }
}

/// Largest quantity the purchase control should offer.
pub fn purchasable_quantity(balance: &Balance, supply: Option<&SupplyInfo>, year: i32) -> u32 {
    supply
        .map(|s| s.treasury_available.min(max_additional_purchase(balance, year)))
        .unwrap_or(0)
}

/// Check that every token in `token_ids` exists in `balance` and is sellable.
pub fn validate_listing_selection<'a>(
    balance: &'a Balance,
    token_ids: &[String],
) -> Result<Vec<&'a Token>, Rejection> {
    if token_ids.is_empty() {
        return Err(Rejection::NoTokensSelected);
    }
    token_ids
        .iter()
        .map(|id| {
            balance
                .token(id)
                .filter(|t| is_sellable(t))
                .ok_or_else(|| Rejection::NotSellable { token_id: id.clone() })
        })
        .collect()
}

/// Open listings offered by other users.
pub fn listings_from_others<'a>(listings: &'a [Listing], user_id: Option<&str>) -> Vec<&'a Listing> {
    listings
        .iter()
        .filter(|l| l.is_open() && user_id.map_or(true, |u| !l.is_sold_by(u)))
        .collect()
}

/// The user's own open listings.
pub fn own_listings<'a>(listings: &'a [Listing], user_id: &str) -> Vec<&'a Listing> {
    listings
        .iter()
        .filter(|l| l.is_open() && l.is_sold_by(user_id))
        .collect()
}
