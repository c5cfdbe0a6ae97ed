//! Burza: client library for the Friday token marketplace.
//!
//! Owns the client-side eligibility model, the snapshot cache, and the
//! mutation dispatcher. All business state lives in the backend.

pub mod backend;
pub mod cache;
pub mod config;
pub mod controller;
pub mod dispatch;
pub mod eligibility;
pub mod errors;
pub mod format;
pub mod models;
pub mod redirect;
pub mod session;

#[cfg(test)]
mod testing;

pub use controller::Marketplace;
