use serde::{Deserialize, Serialize};

/// Minutes of weekly credit carried by one untouched token.
pub const FULL_TOKEN_MINUTES: u32 = 60;

/// Lifecycle state of a token as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenStatus {
    Active,
    Spent,
    Listed,
}

impl TokenStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenStatus::Active => "active",
            TokenStatus::Spent => "spent",
            TokenStatus::Listed => "listed",
        }
    }
}

/// One unit of 60 minutes of weekly credit, scoped to an issuance year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub id: String,
    pub issued_year: i32,
    pub minutes_remaining: u32,
    pub status: TokenStatus,
}

impl Token {
    /// Still held by its owner: counts against the annual quota.
    pub fn is_held(&self) -> bool {
        matches!(self.status, TokenStatus::Active | TokenStatus::Listed)
    }

    /// No minutes consumed yet.
    pub fn is_untouched(&self) -> bool {
        self.minutes_remaining == FULL_TOKEN_MINUTES
    }
}
