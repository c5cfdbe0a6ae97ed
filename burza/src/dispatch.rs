//! Mutation commands and the per-target in-flight guard.
//!
//! A `Command` is the structured `{operation, parameters}` object the UI layer
//! builds from user input. It is shape-validated here; snapshot-dependent
//! checks (quota, supply, sellable tokens) happen in the controller.

use std::sync::Arc;

use dashmap::DashSet;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::{MarketError, Rejection};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    BuyTreasury,
    BuyListing,
    CreateListing,
    CancelListing,
    Mint,
    Reprice,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::BuyTreasury => "buy-treasury",
            Operation::BuyListing => "buy-listing",
            Operation::CreateListing => "create-listing",
            Operation::CancelListing => "cancel-listing",
            Operation::Mint => "mint",
            Operation::Reprice => "reprice",
        }
    }

    /// Message shown when the backend gives no reason.
    pub fn fallback_message(&self) -> &'static str {
        match self {
            Operation::BuyTreasury => "Creating the payment failed.",
            Operation::BuyListing => "Purchase failed.",
            Operation::CreateListing => "Listing failed.",
            Operation::CancelListing => "Cancelling the listing failed.",
            Operation::Mint => "Mint failed.",
            Operation::Reprice => "Changing the price failed.",
        }
    }

    pub fn requires_admin(&self) -> bool {
        matches!(self, Operation::Mint | Operation::Reprice)
    }
}

/// A user intent, validated before dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", content = "parameters", rename_all = "kebab-case")]
pub enum Command {
    BuyTreasury {
        quantity: u32,
    },
    #[serde(rename_all = "camelCase")]
    BuyListing {
        listing_id: String,
    },
    #[serde(rename_all = "camelCase")]
    CreateListing {
        token_ids: Vec<String>,
        price_eur: Decimal,
    },
    #[serde(rename_all = "camelCase")]
    CancelListing {
        listing_id: String,
    },
    #[serde(rename_all = "camelCase")]
    Mint {
        quantity: u32,
        price_eur: Decimal,
        year: i32,
    },
    #[serde(rename_all = "camelCase")]
    Reprice {
        price_eur: Decimal,
        #[serde(default)]
        reprice_treasury: bool,
    },
}

impl Command {
    pub fn operation(&self) -> Operation {
        match self {
            Command::BuyTreasury { .. } => Operation::BuyTreasury,
            Command::BuyListing { .. } => Operation::BuyListing,
            Command::CreateListing { .. } => Operation::CreateListing,
            Command::CancelListing { .. } => Operation::CancelListing,
            Command::Mint { .. } => Operation::Mint,
            Command::Reprice { .. } => Operation::Reprice,
        }
    }

    /// In-flight keys held while this command is pending.
    pub fn targets(&self) -> Vec<String> {
        match self {
            Command::BuyTreasury { .. } => vec!["treasury".to_string()],
            Command::BuyListing { listing_id } | Command::CancelListing { listing_id } => {
                vec![listing_target(listing_id)]
            }
            Command::CreateListing { token_ids, .. } => {
                token_ids.iter().map(|id| token_target(id)).collect()
            }
            Command::Mint { .. } => vec!["admin:mint".to_string()],
            Command::Reprice { .. } => vec!["admin:set-price".to_string()],
        }
    }

    /// Parameter checks that need no snapshot.
    pub fn validate(&self) -> Result<(), Rejection> {
        match self {
            Command::BuyTreasury { quantity } | Command::Mint { quantity, .. } if *quantity == 0 => {
                Err(Rejection::QuantityBelowOne)
            }
            Command::CreateListing { token_ids, .. } if token_ids.is_empty() => {
                Err(Rejection::NoTokensSelected)
            }
            Command::CreateListing { price_eur, .. }
            | Command::Mint { price_eur, .. }
            | Command::Reprice { price_eur, .. }
                if *price_eur <= Decimal::ZERO =>
            {
                Err(Rejection::InvalidPrice)
            }
            _ => Ok(()),
        }
    }
}

pub fn listing_target(listing_id: &str) -> String {
    format!("listing:{}", listing_id)
}

pub fn token_target(token_id: &str) -> String {
    format!("token:{}", token_id)
}

/// Result of a successful dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Send the user to the payment provider.
    Redirect { url: String },
    /// The backend accepted the mutation and the cache was refreshed.
    Completed,
    /// A multi-token listing where at least one call succeeded.
    Batch(BatchReport),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub listed: Vec<String>,
    /// `(token_id, message)` for each rejected token.
    pub failed: Vec<(String, String)>,
}

impl BatchReport {
    pub fn is_partial(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Targets with a request outstanding. UX protection against double
/// submission only; the backend is responsible for idempotency.
#[derive(Clone, Default)]
pub struct InFlight(Arc<DashSet<String>>);

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pending(&self, target: &str) -> bool {
        self.0.contains(target)
    }

    /// Mark all `targets` pending, or none of them if any already is.
    pub fn acquire(&self, targets: Vec<String>) -> Result<InFlightGuard, MarketError> {
        let mut held = Vec::with_capacity(targets.len());
        for target in targets {
            if !self.0.insert(target.clone()) {
                for t in &held {
                    self.0.remove(t);
                }
                return Err(MarketError::Busy { target });
            }
            held.push(target);
        }
        Ok(InFlightGuard {
            set: self.0.clone(),
            held,
        })
    }
}

/// Clears its targets when dropped, whatever the outcome.
pub struct InFlightGuard {
    set: Arc<DashSet<String>>,
    held: Vec<String>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        for t in &self.held {
            self.set.remove(t);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_command_decodes_operation_and_parameters() {
        let cmd: Command = serde_json::from_value(serde_json::json!({
            "operation": "mint",
            "parameters": { "quantity": 10, "priceEur": 12.5, "year": 2026 }
        }))
        .unwrap();
        assert_eq!(
            cmd,
            Command::Mint {
                quantity: 10,
                price_eur: Decimal::from_str("12.5").unwrap(),
                year: 2026,
            }
        );
        assert!(cmd.operation().requires_admin());
    }

    #[test]
    fn test_reprice_defaults_to_not_repricing_treasury() {
        let cmd: Command = serde_json::from_value(serde_json::json!({
            "operation": "reprice",
            "parameters": { "priceEur": "9.90" }
        }))
        .unwrap();
        assert!(matches!(cmd, Command::Reprice { reprice_treasury: false, .. }));
    }

    #[test]
    fn test_validate_rejects_bad_parameters() {
        assert_eq!(
            Command::Mint {
                quantity: 0,
                price_eur: Decimal::ONE,
                year: 2026
            }
            .validate(),
            Err(Rejection::QuantityBelowOne)
        );
        assert_eq!(
            Command::Reprice {
                price_eur: Decimal::ZERO,
                reprice_treasury: false
            }
            .validate(),
            Err(Rejection::InvalidPrice)
        );
        assert_eq!(
            Command::CreateListing {
                token_ids: vec![],
                price_eur: Decimal::ONE
            }
            .validate(),
            Err(Rejection::NoTokensSelected)
        );
        assert!(Command::BuyListing {
            listing_id: "l1".into()
        }
        .validate()
        .is_ok());
    }

    #[test]
    fn test_in_flight_blocks_same_target_only() {
        let in_flight = InFlight::new();
        let guard = in_flight.acquire(vec![listing_target("l1")]).unwrap();

        assert!(in_flight.is_pending("listing:l1"));
        assert!(matches!(
            in_flight.acquire(vec![listing_target("l1")]),
            Err(MarketError::Busy { .. })
        ));
        assert!(in_flight.acquire(vec![listing_target("l2")]).is_ok());

        drop(guard);
        assert!(!in_flight.is_pending("listing:l1"));
    }

    #[test]
    fn test_in_flight_acquire_is_all_or_nothing() {
        let in_flight = InFlight::new();
        let _held = in_flight.acquire(vec![token_target("b")]).unwrap();

        let result = in_flight.acquire(vec![token_target("a"), token_target("b")]);
        assert!(result.is_err());
        assert!(!in_flight.is_pending("token:a"));
    }
}
