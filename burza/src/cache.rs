//! Last-known server snapshot: balance, treasury supply, open listings.
//!
//! Snapshots are replaced wholesale on refresh and never patched locally.
//! Reads for different snapshots run concurrently; a failed read leaves the
//! previous value in place.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::backend::MarketplaceApi;
use crate::errors::MarketError;
use crate::models::{Balance, Listing, SupplyInfo};

/// Point-in-time copy of everything the client knows about the backend.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub balance: Option<Balance>,
    pub supply: Option<SupplyInfo>,
    pub listings: Vec<Listing>,
}

/// Which snapshots a refresh should refetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshScope {
    pub supply: bool,
    pub balance: bool,
    pub listings: bool,
}

impl RefreshScope {
    pub const ALL: Self = Self {
        supply: true,
        balance: true,
        listings: true,
    };
    pub const SUPPLY: Self = Self {
        supply: true,
        balance: false,
        listings: false,
    };
    pub const BALANCE_AND_LISTINGS: Self = Self {
        supply: false,
        balance: true,
        listings: true,
    };
}

/// What a refresh needs to address the backend.
#[derive(Debug, Clone, Copy)]
pub struct FetchContext<'a> {
    pub year: i32,
    pub listings_take: u32,
    /// `(user_id, bearer)` when signed in. The balance is skipped otherwise.
    pub user: Option<(&'a str, &'a str)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotKind {
    Supply,
    Balance,
    Listings,
}

impl SnapshotKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotKind::Supply => "supply",
            SnapshotKind::Balance => "balance",
            SnapshotKind::Listings => "listings",
        }
    }
}

/// Outcome of one refresh. Failures are reported, not raised.
#[derive(Debug, Default)]
pub struct RefreshReport {
    pub failures: Vec<(SnapshotKind, MarketError)>,
}

impl RefreshReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Shared, cheaply-cloneable snapshot cache.
#[derive(Clone, Default)]
pub struct SnapshotCache {
    inner: Arc<RwLock<Snapshot>>,
    refreshes: Arc<AtomicU64>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.inner.read().await.clone()
    }

    pub async fn balance(&self) -> Option<Balance> {
        self.inner.read().await.balance.clone()
    }

    pub async fn supply(&self) -> Option<SupplyInfo> {
        self.inner.read().await.supply.clone()
    }

    pub async fn listings(&self) -> Vec<Listing> {
        self.inner.read().await.listings.clone()
    }

    /// Number of refreshes performed so far.
    pub fn refresh_count(&self) -> u64 {
        self.refreshes.load(Ordering::Relaxed)
    }

    /// Drop the user-scoped snapshot (sign-out).
    pub async fn clear_balance(&self) {
        self.inner.write().await.balance = None;
    }

    /// Refetch the snapshots named by `scope` and replace them wholesale.
    pub async fn refresh(
        &self,
        api: &dyn MarketplaceApi,
        scope: RefreshScope,
        ctx: FetchContext<'_>,
    ) -> RefreshReport {
        self.refreshes.fetch_add(1, Ordering::Relaxed);
        let bearer = ctx.user.map(|(_, b)| b);

        let supply = async {
            if scope.supply {
                Some(api.supply(ctx.year, bearer).await)
            } else {
                None
            }
        };
        let balance = async {
            match ctx.user {
                Some((user_id, bearer)) if scope.balance => {
                    Some(api.balance(user_id, Some(bearer)).await)
                }
                _ => None,
            }
        };
        let listings = async {
            if scope.listings {
                Some(api.listings(ctx.listings_take, bearer).await)
            } else {
                None
            }
        };

        let (supply, balance, listings) = futures::join!(supply, balance, listings);

        let mut report = RefreshReport::default();
        let mut guard = self.inner.write().await;
        match supply {
            Some(Ok(s)) => guard.supply = Some(s),
            Some(Err(e)) => report.failures.push((SnapshotKind::Supply, e)),
            None => {}
        }
        match balance {
            Some(Ok(b)) => guard.balance = Some(b),
            Some(Err(e)) => report.failures.push((SnapshotKind::Balance, e)),
            None => {}
        }
        match listings {
            Some(Ok(l)) => guard.listings = l,
            Some(Err(e)) => report.failures.push((SnapshotKind::Listings, e)),
            None => {}
        }
        drop(guard);

        for (kind, err) in &report.failures {
            tracing::warn!(snapshot = kind.as_str(), error = %err, "snapshot refresh failed");
        }
        report
    }
}
