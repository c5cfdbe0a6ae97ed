use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::token::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Open,
    Sold,
    Cancelled,
}

/// An open offer to sell one token, with the token embedded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: String,
    pub token_id: String,
    pub seller_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price_eur: Decimal,
    pub status: ListingStatus,
    pub created_at: DateTime<Utc>,
    pub token: Token,
}

impl Listing {
    pub fn is_open(&self) -> bool {
        self.status == ListingStatus::Open
    }

    pub fn is_sold_by(&self, user_id: &str) -> bool {
        self.seller_id == user_id
    }
}

/// Response envelope of `GET /friday/listings`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingPage {
    #[serde(default)]
    pub items: Vec<Listing>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TokenStatus;

    #[test]
    fn test_listing_page_decodes_embedded_token() {
        let page: ListingPage = serde_json::from_value(serde_json::json!({
            "items": [{
                "id": "lst_1",
                "tokenId": "tok_1",
                "sellerId": "user_a",
                "priceEur": 9.99,
                "status": "open",
                "createdAt": "2026-03-01T10:00:00Z",
                "token": { "id": "tok_1", "issuedYear": 2026, "minutesRemaining": 60, "status": "listed" }
            }]
        }))
        .unwrap();

        let listing = &page.items[0];
        assert!(listing.is_open());
        assert!(listing.is_sold_by("user_a"));
        assert!(!listing.is_sold_by("user_b"));
        assert_eq!(listing.token.status, TokenStatus::Listed);
    }

    #[test]
    fn test_listing_page_without_items_is_empty() {
        let page: ListingPage = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(page.items.is_empty());
    }
}
