use thiserror::Error;

use crate::dispatch::Operation;

/// Client-side pre-validation failures. These are raised before any network
/// call is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("quantity must be at least 1")]
    QuantityBelowOne,

    #[error("you can buy at most {max} more tokens for {year}")]
    ExceedsQuota { max: u32, year: i32 },

    #[error("not enough tokens in the treasury ({available} available)")]
    ExceedsTreasury { available: u32 },

    #[error("treasury supply is not loaded yet")]
    SupplyUnknown,

    #[error("token {token_id} cannot be listed")]
    NotSellable { token_id: String },

    #[error("select at least one token")]
    NoTokensSelected,

    #[error("price must be greater than zero")]
    InvalidPrice,

    #[error("you cannot buy your own listing")]
    OwnListing,

    #[error("this action requires the admin role")]
    AdminOnly,

    #[error("session has expired, sign in again")]
    SessionExpired,
}

#[derive(Debug, Error)]
pub enum MarketError {
    #[error("not signed in")]
    NotSignedIn,

    #[error("rejected: {0}")]
    Rejected(#[from] Rejection),

    #[error("a request for {target} is already in progress")]
    Busy { target: String },

    #[error("backend returned {status}: {}", .message.as_deref().unwrap_or("(no message)"))]
    Backend { status: u16, message: Option<String> },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid backend response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl MarketError {
    /// Text surfaced to the user. Backend-supplied messages win, otherwise a
    /// per-operation fallback is used.
    pub fn user_message(&self, operation: Operation) -> String {
        match self {
            MarketError::NotSignedIn => "Sign in first.".to_string(),
            MarketError::Rejected(r) => capitalize(&r.to_string()),
            MarketError::Busy { .. } => "This request is already being processed.".to_string(),
            MarketError::Backend {
                message: Some(m), ..
            } if !m.trim().is_empty() => m.clone(),
            MarketError::Backend { .. } | MarketError::Transport(_) | MarketError::Decode(_) => {
                operation.fallback_message().to_string()
            }
        }
    }

    /// True when the request never reached the backend.
    pub fn is_client_side(&self) -> bool {
        matches!(
            self,
            MarketError::NotSignedIn | MarketError::Rejected(_) | MarketError::Busy { .. }
        )
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>() + ".",
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_message_is_surfaced() {
        let err = MarketError::Backend {
            status: 409,
            message: Some("Listing already sold".into()),
        };
        assert_eq!(err.user_message(Operation::BuyListing), "Listing already sold");
        assert!(!err.is_client_side());
    }

    #[test]
    fn test_blank_backend_message_uses_fallback() {
        let err = MarketError::Backend {
            status: 500,
            message: Some("  ".into()),
        };
        assert_eq!(
            err.user_message(Operation::CancelListing),
            Operation::CancelListing.fallback_message()
        );
    }

    #[test]
    fn test_rejection_message_is_sentence() {
        let err = MarketError::from(Rejection::ExceedsQuota { max: 1, year: 2026 });
        assert_eq!(
            err.user_message(Operation::BuyTreasury),
            "You can buy at most 1 more tokens for 2026."
        );
        assert!(err.is_client_side());
    }
}
