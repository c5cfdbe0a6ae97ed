//! Snapshot types returned by the marketplace backend.
//!
//! Every type here is a read-only snapshot: the client never mutates token or
//! listing state locally, it refetches the whole snapshot instead.

pub mod balance;
pub mod listing;
pub mod supply;
pub mod token;

pub use balance::Balance;
pub use listing::{Listing, ListingPage, ListingStatus};
pub use supply::SupplyInfo;
pub use token::{Token, TokenStatus, FULL_TOKEN_MINUTES};
