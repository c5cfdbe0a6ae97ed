//! The marketplace controller: one owner for the snapshot cache, the
//! eligibility selectors, and the mutation dispatcher.
//!
//! Flow: command → one backend call (or one per token for batch listings) →
//! cache refresh on success → selectors re-derive from the fresh snapshot.

use std::sync::Arc;

use chrono::Datelike;

use crate::backend::{
    CancelListingRequest, CreateListingRequest, ListingCheckoutRequest, MarketplaceApi,
    MintRequest, SetPriceRequest, TreasuryCheckoutRequest,
};
use crate::cache::{FetchContext, RefreshReport, RefreshScope, Snapshot, SnapshotCache};
use crate::dispatch::{listing_target, BatchReport, Command, InFlight, Operation, Outcome};
use crate::eligibility;
use crate::errors::{MarketError, Rejection};
use crate::models::{Balance, Token};
use crate::redirect::{self, PaymentReturn, ReturnLedger};
use crate::session::Session;

pub const DEFAULT_LISTINGS_TAKE: u32 = 50;

/// Eligibility derived from the current snapshot.
#[derive(Debug, Clone)]
pub struct EligibilityView {
    pub year: i32,
    pub owned_this_year: u32,
    pub max_additional_purchase: u32,
    pub purchasable_quantity: u32,
    pub treasury_purchase_enabled: bool,
    pub sellable: Vec<Token>,
    pub listed: Vec<Token>,
}

/// What handling a payment return did.
#[derive(Debug)]
pub struct ReturnOutcome {
    pub indicator: Option<PaymentReturn>,
    /// URL to navigate to, indicator removed.
    pub cleaned_url: String,
    /// The URL had already been handled; nothing was done.
    pub duplicate: bool,
    /// Present when this call triggered a refresh.
    pub refresh: Option<RefreshReport>,
}

pub struct Marketplace {
    api: Arc<dyn MarketplaceApi>,
    session: Option<Session>,
    cache: SnapshotCache,
    in_flight: InFlight,
    returns: ReturnLedger,
    year: i32,
    listings_take: u32,
}

impl Marketplace {
    pub fn new(api: Arc<dyn MarketplaceApi>, session: Option<Session>) -> Self {
        Self {
            api,
            session,
            cache: SnapshotCache::new(),
            in_flight: InFlight::new(),
            returns: ReturnLedger::new(),
            year: chrono::Utc::now().year(),
            listings_take: DEFAULT_LISTINGS_TAKE,
        }
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = year;
        self
    }

    pub fn with_listings_take(mut self, take: u32) -> Self {
        self.listings_take = take;
        self
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn cache(&self) -> &SnapshotCache {
        &self.cache
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.cache.snapshot().await
    }

    pub fn is_pending(&self, target: &str) -> bool {
        self.in_flight.is_pending(target)
    }

    // ── Cache ────────────────────────────────────────────────

    /// Initial load after sign-in: register the user, then fetch everything.
    pub async fn sign_in(&self) -> RefreshReport {
        if let Some(session) = &self.session {
            match session.bearer() {
                Ok(bearer) => {
                    if let Err(e) = self.api.sync_user(bearer).await {
                        tracing::warn!(user_id = %session.user_id(), error = %e, "sync-user failed");
                    }
                }
                Err(e) => tracing::warn!(error = %e, "skipping sync-user"),
            }
        }
        self.refresh(RefreshScope::ALL).await
    }

    pub async fn refresh(&self, scope: RefreshScope) -> RefreshReport {
        let user = self
            .session
            .as_ref()
            .and_then(|s| s.bearer().ok().map(|b| (s.user_id(), b)));
        let ctx = FetchContext {
            year: self.year,
            listings_take: self.listings_take,
            user,
        };
        self.cache.refresh(self.api.as_ref(), scope, ctx).await
    }

    /// Process a return from the payment provider.
    ///
    /// `success` refreshes every snapshot, `cancel` leaves the cache alone.
    /// Either way the indicator is stripped, and a URL already handled is
    /// not handled again.
    pub async fn handle_payment_return(&self, raw_url: &str) -> Result<ReturnOutcome, url::ParseError> {
        let parsed = redirect::parse_return(raw_url)?;
        let cleaned_url = parsed.cleaned.to_string();

        let indicator = match parsed.indicator {
            Some(i) => i,
            None => {
                return Ok(ReturnOutcome {
                    indicator: None,
                    cleaned_url,
                    duplicate: false,
                    refresh: None,
                })
            }
        };

        let original = url::Url::parse(raw_url)?;
        if !self.returns.consume(&original) {
            tracing::debug!(url = %raw_url, "payment return already handled");
            return Ok(ReturnOutcome {
                indicator: Some(indicator),
                cleaned_url,
                duplicate: true,
                refresh: None,
            });
        }

        let refresh = match indicator {
            PaymentReturn::Success => {
                tracing::info!("payment succeeded, refreshing snapshots");
                Some(self.refresh(RefreshScope::ALL).await)
            }
            PaymentReturn::Cancel => {
                tracing::info!("payment cancelled");
                None
            }
        };

        Ok(ReturnOutcome {
            indicator: Some(indicator),
            cleaned_url,
            duplicate: false,
            refresh,
        })
    }

    // ── Selectors ────────────────────────────────────────────

    pub async fn eligibility(&self) -> EligibilityView {
        let snap = self.cache.snapshot().await;
        let balance = self.balance_or_empty(&snap);
        let supply = snap.supply.as_ref();

        EligibilityView {
            year: self.year,
            owned_this_year: eligibility::owned_this_year(&balance, self.year),
            max_additional_purchase: eligibility::max_additional_purchase(&balance, self.year),
            purchasable_quantity: eligibility::purchasable_quantity(&balance, supply, self.year),
            treasury_purchase_enabled: eligibility::treasury_purchase_enabled(
                &balance, supply, self.year,
            ),
            sellable: eligibility::sellable_tokens(&balance).into_iter().cloned().collect(),
            listed: eligibility::listed_tokens(&balance).into_iter().cloned().collect(),
        }
    }

    /// Whether the buy control for `listing_id` should be enabled.
    pub async fn can_buy_listing(&self, listing_id: &str) -> bool {
        let session = match &self.session {
            Some(s) if !s.is_admin() => s,
            _ => return false,
        };
        if self.in_flight.is_pending(&listing_target(listing_id)) {
            return false;
        }
        self.cache
            .listings()
            .await
            .iter()
            .any(|l| l.id == listing_id && l.is_open() && !l.is_sold_by(session.user_id()))
    }

    fn balance_or_empty(&self, snap: &Snapshot) -> Balance {
        match (&snap.balance, &self.session) {
            (Some(b), _) => b.clone(),
            (None, Some(s)) => Balance::empty(s.user_id()),
            (None, None) => Balance::empty(""),
        }
    }

    // ── Commands ─────────────────────────────────────────────

    /// Validate and dispatch one command.
    pub async fn execute(&self, command: Command) -> Result<Outcome, MarketError> {
        let operation = command.operation();
        let result = self.execute_inner(command).await;
        match &result {
            Ok(outcome) => tracing::info!(operation = operation.as_str(), ?outcome, "command succeeded"),
            Err(e) if e.is_client_side() => {
                tracing::info!(operation = operation.as_str(), error = %e, "command rejected")
            }
            Err(e) => tracing::warn!(operation = operation.as_str(), error = %e, "command failed"),
        }
        result
    }

    async fn execute_inner(&self, command: Command) -> Result<Outcome, MarketError> {
        command.validate()?;

        let session = self.session.as_ref().ok_or(MarketError::NotSignedIn)?;
        let bearer = session.bearer()?;
        if command.operation().requires_admin() && !session.is_admin() {
            return Err(Rejection::AdminOnly.into());
        }

        let snap = self.cache.snapshot().await;
        self.precheck(&command, session, &snap)?;

        let _guard = self.in_flight.acquire(command.targets())?;
        let user_id = session.user_id().to_string();

        match command {
            Command::BuyTreasury { quantity } => {
                let checkout = self
                    .api
                    .checkout_treasury(
                        bearer,
                        &TreasuryCheckoutRequest {
                            user_id,
                            quantity,
                            year: self.year,
                        },
                    )
                    .await?;
                self.returns.reset();
                Ok(Outcome::Redirect { url: checkout.url })
            }
            Command::BuyListing { listing_id } => {
                let checkout = self
                    .api
                    .checkout_listing(
                        bearer,
                        &ListingCheckoutRequest {
                            buyer_id: user_id,
                            listing_id,
                        },
                    )
                    .await?;
                self.returns.reset();
                Ok(Outcome::Redirect { url: checkout.url })
            }
            Command::CreateListing { token_ids, price_eur } => {
                self.list_tokens(bearer, &user_id, token_ids, price_eur).await
            }
            Command::CancelListing { listing_id } => {
                self.api
                    .cancel_listing(
                        bearer,
                        &CancelListingRequest {
                            seller_id: user_id,
                            listing_id,
                        },
                    )
                    .await?;
                self.refresh(RefreshScope::BALANCE_AND_LISTINGS).await;
                Ok(Outcome::Completed)
            }
            Command::Mint {
                quantity,
                price_eur,
                year,
            } => {
                self.api
                    .mint(
                        bearer,
                        &MintRequest {
                            quantity,
                            price_eur,
                            year,
                        },
                    )
                    .await?;
                self.refresh(RefreshScope::SUPPLY).await;
                Ok(Outcome::Completed)
            }
            Command::Reprice {
                price_eur,
                reprice_treasury,
            } => {
                self.api
                    .set_price(
                        bearer,
                        &SetPriceRequest {
                            new_price: price_eur,
                            reprice_treasury,
                        },
                    )
                    .await?;
                self.refresh(RefreshScope::SUPPLY).await;
                Ok(Outcome::Completed)
            }
        }
    }

    /// Snapshot-dependent checks. Nothing here touches the network.
    fn precheck(&self, command: &Command, session: &Session, snap: &Snapshot) -> Result<(), MarketError> {
        match command {
            Command::BuyTreasury { quantity } => {
                let balance = self.balance_or_empty(snap);
                eligibility::validate_purchase(*quantity, &balance, snap.supply.as_ref(), self.year)?;
            }
            Command::BuyListing { listing_id } => {
                let own = snap
                    .listings
                    .iter()
                    .any(|l| &l.id == listing_id && l.is_sold_by(session.user_id()));
                if own {
                    return Err(Rejection::OwnListing.into());
                }
            }
            Command::CreateListing { token_ids, .. } => {
                let balance = self.balance_or_empty(snap);
                eligibility::validate_listing_selection(&balance, token_ids)?;
            }
            Command::CancelListing { .. } | Command::Mint { .. } | Command::Reprice { .. } => {}
        }
        Ok(())
    }

    /// One create-listing call per token, in order. Already-listed tokens are
    /// not rolled back when a later one fails. The cache is refreshed once,
    /// after the batch, if anything was listed.
    async fn list_tokens(
        &self,
        bearer: &str,
        user_id: &str,
        token_ids: Vec<String>,
        price_eur: rust_decimal::Decimal,
    ) -> Result<Outcome, MarketError> {
        let mut report = BatchReport::default();
        let mut first_error = None;

        for token_id in token_ids {
            let req = CreateListingRequest {
                seller_id: user_id.to_string(),
                token_id: token_id.clone(),
                price_eur,
            };
            match self.api.create_listing(bearer, &req).await {
                Ok(()) => report.listed.push(token_id),
                Err(e) => {
                    tracing::warn!(token_id = %token_id, error = %e, "listing token failed");
                    report
                        .failed
                        .push((token_id, e.user_message(Operation::CreateListing)));
                    first_error.get_or_insert(e);
                }
            }
        }

        if report.listed.is_empty() {
            return match first_error {
                Some(e) => Err(e),
                None => Ok(Outcome::Completed),
            };
        }

        self.refresh(RefreshScope::BALANCE_AND_LISTINGS).await;
        if report.is_partial() || report.listed.len() > 1 {
            Ok(Outcome::Batch(report))
        } else {
            Ok(Outcome::Completed)
        }
    }
}
