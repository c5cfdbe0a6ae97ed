pub mod http;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::MarketError;
use crate::models::{Balance, Listing, SupplyInfo};

pub use http::BackendClient;

/// The marketplace backend as seen by the client.
/// Implementations: `BackendClient` (HTTP); tests substitute in-memory fakes.
#[async_trait]
pub trait MarketplaceApi: Send + Sync {
    async fn supply(&self, year: i32, bearer: Option<&str>) -> Result<SupplyInfo, MarketError>;

    async fn balance(&self, user_id: &str, bearer: Option<&str>) -> Result<Balance, MarketError>;

    async fn listings(&self, take: u32, bearer: Option<&str>) -> Result<Vec<Listing>, MarketError>;

    async fn create_listing(&self, bearer: &str, req: &CreateListingRequest) -> Result<(), MarketError>;

    async fn cancel_listing(&self, bearer: &str, req: &CancelListingRequest) -> Result<(), MarketError>;

    async fn checkout_treasury(
        &self,
        bearer: &str,
        req: &TreasuryCheckoutRequest,
    ) -> Result<CheckoutSession, MarketError>;

    async fn checkout_listing(
        &self,
        bearer: &str,
        req: &ListingCheckoutRequest,
    ) -> Result<CheckoutSession, MarketError>;

    async fn mint(&self, bearer: &str, req: &MintRequest) -> Result<(), MarketError>;

    async fn set_price(&self, bearer: &str, req: &SetPriceRequest) -> Result<(), MarketError>;

    /// Registers the signed-in user with the backend.
    async fn sync_user(&self, bearer: &str) -> Result<(), MarketError>;
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateListingRequest {
    pub seller_id: String,
    pub token_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price_eur: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelListingRequest {
    pub seller_id: String,
    pub listing_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreasuryCheckoutRequest {
    pub user_id: String,
    pub quantity: u32,
    pub year: i32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingCheckoutRequest {
    pub buyer_id: String,
    pub listing_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MintRequest {
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub price_eur: Decimal,
    pub year: i32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetPriceRequest {
    #[serde(with = "rust_decimal::serde::float")]
    pub new_price: Decimal,
    pub reprice_treasury: bool,
}

/// Payment-provider session the browser is sent to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckoutSession {
    pub url: String,
}
