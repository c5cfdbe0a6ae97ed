use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

/// Burza: Friday token marketplace client
#[derive(Parser)]
#[command(name = "burza", version, about)]
pub struct Cli {
    /// Backend base URL (overrides BURZA_BACKEND_URL)
    #[arg(long, global = true)]
    pub backend_url: Option<String>,

    /// Identity-provider session token (overrides BURZA_SESSION_TOKEN)
    #[arg(long, global = true, hide_env_values = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show supply, wallet and purchase eligibility
    Status,

    /// Reload supply, wallet and listings without re-registering the user
    Refresh,

    /// Show treasury supply for the current year
    Supply,

    /// Show the signed-in user's tokens
    Wallet,

    /// Show open listings
    Listings {
        /// Only the signed-in user's own listings
        #[arg(long)]
        mine: bool,
    },

    /// Buy tokens from the treasury
    Buy {
        #[arg(short, long, default_value = "1")]
        quantity: u32,
    },

    /// Buy a listed token from another user
    BuyListing { listing_id: String },

    /// List tokens for sale
    List {
        /// Price per token in EUR
        #[arg(long)]
        price: Decimal,
        /// Explicit token ids
        token_ids: Vec<String>,
        /// List the first N sellable tokens instead of naming them
        #[arg(long, conflicts_with = "token_ids")]
        count: Option<usize>,
    },

    /// Withdraw an open listing
    Cancel { listing_id: String },

    /// Create new treasury supply (admin)
    Mint {
        #[arg(long)]
        quantity: u32,
        #[arg(long)]
        price: Decimal,
        /// Issuance year (default: current year)
        #[arg(long)]
        year: Option<i32>,
    },

    /// Change the treasury unit price (admin)
    SetPrice {
        #[arg(long)]
        price: Decimal,
        /// Also reprice tokens already in the treasury
        #[arg(long)]
        reprice_treasury: bool,
    },

    /// Handle the URL the payment provider redirected back to
    Return { url: String },

    /// Run a structured command: {"operation": ..., "parameters": {...}}
    Exec { json: String },
}
