//! In-memory backend for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;

use crate::backend::{
    CancelListingRequest, CheckoutSession, CreateListingRequest, ListingCheckoutRequest,
    MarketplaceApi, MintRequest, SetPriceRequest, TreasuryCheckoutRequest,
};
use crate::errors::MarketError;
use crate::models::{Balance, Listing, ListingStatus, SupplyInfo, Token, TokenStatus};

pub const YEAR: i32 = 2026;

struct State {
    balance: Balance,
    supply: SupplyInfo,
    listings: Vec<Listing>,
    calls: HashMap<&'static str, usize>,
    fail_reads: bool,
    rejected_tokens: HashSet<String>,
    next_listing: u32,
}

pub struct FakeBackend {
    state: Mutex<State>,
}

impl FakeBackend {
    pub fn new(user_id: &str) -> Self {
        Self {
            state: Mutex::new(State {
                balance: Balance::empty(user_id),
                supply: SupplyInfo {
                    year: YEAR,
                    price_eur: Decimal::from(450),
                    treasury_available: 100,
                    total_minted: 100,
                    total_sold: 0,
                },
                listings: Vec::new(),
                calls: HashMap::new(),
                fail_reads: false,
                rejected_tokens: HashSet::new(),
                next_listing: 1,
            }),
        }
    }

    pub fn with_tokens(self, tokens: Vec<Token>) -> Self {
        {
            let mut s = self.state.lock().unwrap();
            s.balance.total_minutes = tokens.iter().map(|t| t.minutes_remaining).sum();
            s.balance.tokens = tokens;
        }
        self
    }

    pub fn with_treasury(self, available: u32) -> Self {
        self.state.lock().unwrap().supply.treasury_available = available;
        self
    }

    pub fn with_listing(self, listing: Listing) -> Self {
        self.state.lock().unwrap().listings.push(listing);
        self
    }

    pub fn reject_token(&self, token_id: &str) {
        self.state
            .lock()
            .unwrap()
            .rejected_tokens
            .insert(token_id.to_string());
    }

    pub fn fail_reads(&self, fail: bool) {
        self.state.lock().unwrap().fail_reads = fail;
    }

    pub fn calls(&self, name: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .get(name)
            .copied()
            .unwrap_or(0)
    }

    fn record(&self, name: &'static str) -> std::sync::MutexGuard<'_, State> {
        let mut s = self.state.lock().unwrap();
        *s.calls.entry(name).or_insert(0) += 1;
        s
    }
}

pub fn token(id: &str, minutes: u32, status: TokenStatus) -> Token {
    Token {
        id: id.to_string(),
        issued_year: YEAR,
        minutes_remaining: minutes,
        status,
    }
}

pub fn active_tokens(n: usize) -> Vec<Token> {
    (0..n)
        .map(|i| token(&format!("t{}", i), 60, TokenStatus::Active))
        .collect()
}

pub fn listing(id: &str, seller_id: &str, token_id: &str) -> Listing {
    Listing {
        id: id.to_string(),
        token_id: token_id.to_string(),
        seller_id: seller_id.to_string(),
        price_eur: Decimal::from(500),
        status: ListingStatus::Open,
        created_at: Utc::now(),
        token: token(token_id, 60, TokenStatus::Listed),
    }
}

fn failure(message: &str) -> MarketError {
    MarketError::Backend {
        status: 400,
        message: Some(message.to_string()),
    }
}

#[async_trait]
impl MarketplaceApi for FakeBackend {
    async fn supply(&self, _year: i32, _bearer: Option<&str>) -> Result<SupplyInfo, MarketError> {
        let s = self.record("supply");
        if s.fail_reads {
            return Err(failure("supply unavailable"));
        }
        Ok(s.supply.clone())
    }

    async fn balance(&self, _user_id: &str, _bearer: Option<&str>) -> Result<Balance, MarketError> {
        let s = self.record("balance");
        if s.fail_reads {
            return Err(failure("balance unavailable"));
        }
        Ok(s.balance.clone())
    }

    async fn listings(&self, _take: u32, _bearer: Option<&str>) -> Result<Vec<Listing>, MarketError> {
        let s = self.record("listings");
        if s.fail_reads {
            return Err(failure("listings unavailable"));
        }
        Ok(s.listings.iter().filter(|l| l.is_open()).cloned().collect())
    }

    async fn create_listing(&self, _bearer: &str, req: &CreateListingRequest) -> Result<(), MarketError> {
        let mut s = self.record("list");
        if s.rejected_tokens.contains(&req.token_id) {
            return Err(failure("Token cannot be listed"));
        }
        let id = format!("lst_{}", s.next_listing);
        s.next_listing += 1;
        let token = match s.balance.tokens.iter_mut().find(|t| t.id == req.token_id) {
            Some(t) => {
                t.status = TokenStatus::Listed;
                t.clone()
            }
            None => return Err(failure("Token not found")),
        };
        s.listings.push(Listing {
            id,
            token_id: req.token_id.clone(),
            seller_id: req.seller_id.clone(),
            price_eur: req.price_eur,
            status: ListingStatus::Open,
            created_at: Utc::now(),
            token,
        });
        Ok(())
    }

    async fn cancel_listing(&self, _bearer: &str, req: &CancelListingRequest) -> Result<(), MarketError> {
        let mut s = self.record("cancel-listing");
        let token_id = match s.listings.iter_mut().find(|l| l.id == req.listing_id) {
            Some(l) => {
                l.status = ListingStatus::Cancelled;
                l.token_id.clone()
            }
            None => return Err(failure("Listing not found")),
        };
        if let Some(t) = s.balance.tokens.iter_mut().find(|t| t.id == token_id) {
            t.status = TokenStatus::Active;
        }
        Ok(())
    }

    async fn checkout_treasury(
        &self,
        _bearer: &str,
        req: &TreasuryCheckoutRequest,
    ) -> Result<CheckoutSession, MarketError> {
        let _s = self.record("checkout-treasury");
        Ok(CheckoutSession {
            url: format!("https://pay.example/treasury?q={}", req.quantity),
        })
    }

    async fn checkout_listing(
        &self,
        _bearer: &str,
        req: &ListingCheckoutRequest,
    ) -> Result<CheckoutSession, MarketError> {
        let _s = self.record("checkout-listing");
        Ok(CheckoutSession {
            url: format!("https://pay.example/listing/{}", req.listing_id),
        })
    }

    async fn mint(&self, _bearer: &str, req: &MintRequest) -> Result<(), MarketError> {
        let mut s = self.record("mint");
        s.supply.treasury_available += req.quantity;
        s.supply.total_minted += req.quantity;
        s.supply.price_eur = req.price_eur;
        Ok(())
    }

    async fn set_price(&self, _bearer: &str, req: &SetPriceRequest) -> Result<(), MarketError> {
        let mut s = self.record("set-price");
        s.supply.price_eur = req.new_price;
        Ok(())
    }

    async fn sync_user(&self, _bearer: &str) -> Result<(), MarketError> {
        let _s = self.record("sync-user");
        Ok(())
    }
}
