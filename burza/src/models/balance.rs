use serde::{Deserialize, Serialize};

use super::token::{Token, TokenStatus};

/// A user's aggregate holdings, refetched wholesale after every mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    pub user_id: String,
    pub total_minutes: u32,
    #[serde(default)]
    pub tokens: Vec<Token>,
}

/// Per-status token counts for the wallet view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WalletSummary {
    pub active: usize,
    pub listed: usize,
    pub spent: usize,
    pub total_minutes: u32,
}

impl Balance {
    pub fn empty(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            total_minutes: 0,
            tokens: Vec::new(),
        }
    }

    pub fn token(&self, id: &str) -> Option<&Token> {
        self.tokens.iter().find(|t| t.id == id)
    }

    pub fn summary(&self) -> WalletSummary {
        let mut summary = WalletSummary {
            total_minutes: self.total_minutes,
            ..WalletSummary::default()
        };
        for token in &self.tokens {
            match token.status {
                TokenStatus::Active => summary.active += 1,
                TokenStatus::Listed => summary.listed += 1,
                TokenStatus::Spent => summary.spent += 1,
            }
        }
        summary
    }
}
