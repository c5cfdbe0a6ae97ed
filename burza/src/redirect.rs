//! Payment-provider return URLs.
//!
//! After checkout the provider sends the user back with `payment=success` or
//! `payment=cancel` in the query string. The indicator is stripped once
//! handled so reprocessing the cleaned URL is a no-op.

use dashmap::DashSet;
use url::Url;

/// Query parameter carrying the checkout result.
pub const PAYMENT_PARAM: &str = "payment";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentReturn {
    Success,
    Cancel,
}

impl PaymentReturn {
    fn from_param(value: &str) -> Option<Self> {
        match value {
            "success" => Some(PaymentReturn::Success),
            "cancel" => Some(PaymentReturn::Cancel),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReturn {
    pub indicator: Option<PaymentReturn>,
    /// The URL with the indicator removed. Equal to the input when there was none.
    pub cleaned: Url,
}

pub fn parse_return(raw: &str) -> Result<ParsedReturn, url::ParseError> {
    let url = Url::parse(raw)?;
    let indicator = url
        .query_pairs()
        .find(|(k, _)| k == PAYMENT_PARAM)
        .and_then(|(_, v)| PaymentReturn::from_param(&v));

    if indicator.is_none() {
        return Ok(ParsedReturn {
            indicator,
            cleaned: url,
        });
    }

    Ok(ParsedReturn {
        indicator,
        cleaned: strip_param(&url, PAYMENT_PARAM),
    })
}

fn strip_param(url: &Url, name: &str) -> Url {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != name)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut cleaned = url.clone();
    if kept.is_empty() {
        cleaned.set_query(None);
    } else {
        cleaned.query_pairs_mut().clear().extend_pairs(kept);
    }
    cleaned
}

/// Return URLs that have already been handled.
///
/// Cleared whenever a new checkout starts so the next return from the
/// provider is handled even if its URL matches an earlier one.
#[derive(Debug, Default)]
pub struct ReturnLedger(DashSet<String>);

impl ReturnLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `url`; false when it was already consumed.
    pub fn consume(&self, url: &Url) -> bool {
        self.0.insert(url.as_str().to_string())
    }

    pub fn reset(&self) {
        self.0.clear();
    }
}
