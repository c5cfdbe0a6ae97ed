//! HTTP client for the marketplace backend.
//!
//! Every call goes out once: no retries and no request timeout. Failures come
//! back as `MarketError::Transport` or `MarketError::Backend`.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use super::{
    CancelListingRequest, CheckoutSession, CreateListingRequest, ListingCheckoutRequest,
    MarketplaceApi, MintRequest, SetPriceRequest, TreasuryCheckoutRequest,
};
use crate::errors::MarketError;
use crate::models::{Balance, Listing, ListingPage, SupplyInfo};

pub struct BackendClient {
    base_url: String,
    http: Client,
}

impl BackendClient {
    pub fn new(base_url: &Url) -> anyhow::Result<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .user_agent(concat!("burza/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            http,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/friday/{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str, bearer: Option<&str>) -> RequestBuilder {
        let url = self.endpoint(path);
        tracing::debug!(%method, %url, "backend request");
        let mut req = self
            .http
            .request(method, url)
            .header("X-Request-Id", uuid::Uuid::new_v4().to_string());
        if let Some(token) = bearer {
            req = req.bearer_auth(token);
        }
        req
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        bearer: Option<&str>,
    ) -> Result<T, MarketError> {
        let resp = self
            .request(Method::GET, path, bearer)
            .query(query)
            .send()
            .await?;
        let body = read_body(resp).await?;
        Ok(serde_json::from_value(body)?)
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        bearer: &str,
        body: &B,
    ) -> Result<(u16, Value), MarketError> {
        let resp = self
            .request(Method::POST, path, Some(bearer))
            .json(body)
            .send()
            .await?;
        let status = resp.status().as_u16();
        Ok((status, read_body(resp).await?))
    }

    /// POST that must answer `{ "success": true }`.
    async fn post_expect_success<B: Serialize + ?Sized>(
        &self,
        path: &str,
        bearer: &str,
        body: &B,
    ) -> Result<(), MarketError> {
        let (status, value) = self.post_json(path, bearer, body).await?;
        if value.get("success").and_then(Value::as_bool) == Some(true) {
            Ok(())
        } else {
            Err(MarketError::Backend {
                status,
                message: message_of(&value),
            })
        }
    }

    /// POST that must answer `{ "url": "<redirect target>" }`.
    async fn post_checkout<B: Serialize + ?Sized>(
        &self,
        path: &str,
        bearer: &str,
        body: &B,
    ) -> Result<CheckoutSession, MarketError> {
        let (status, value) = self.post_json(path, bearer, body).await?;
        match value.get("url").and_then(Value::as_str) {
            Some(url) if !url.is_empty() => Ok(CheckoutSession { url: url.to_string() }),
            _ => Err(MarketError::Backend {
                status,
                message: message_of(&value),
            }),
        }
    }
}

/// Read the body whatever the status. Non-JSON text becomes `{ "message": text }`.
async fn read_body(resp: Response) -> Result<Value, MarketError> {
    let status = resp.status();
    let text = resp.text().await?;
    let value = parse_body(&text);

    if !status.is_success() {
        tracing::warn!(status = status.as_u16(), "backend returned error status");
        return Err(MarketError::Backend {
            status: status.as_u16(),
            message: message_of(&value),
        });
    }
    Ok(value)
}

fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| serde_json::json!({ "message": text }))
}

fn message_of(value: &Value) -> Option<String> {
    value
        .get("message")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(String::from)
}

#[async_trait]
impl MarketplaceApi for BackendClient {
    async fn supply(&self, year: i32, bearer: Option<&str>) -> Result<SupplyInfo, MarketError> {
        self.get_json("supply", &[("year", year.to_string())], bearer)
            .await
    }

    async fn balance(&self, user_id: &str, bearer: Option<&str>) -> Result<Balance, MarketError> {
        let path = format!("balance/{}", urlencoding::encode(user_id));
        self.get_json(&path, &[], bearer).await
    }

    async fn listings(&self, take: u32, bearer: Option<&str>) -> Result<Vec<Listing>, MarketError> {
        let page: ListingPage = self
            .get_json("listings", &[("take", take.to_string())], bearer)
            .await?;
        Ok(page.items)
    }

    async fn create_listing(&self, bearer: &str, req: &CreateListingRequest) -> Result<(), MarketError> {
        self.post_expect_success("list", bearer, req).await
    }

    async fn cancel_listing(&self, bearer: &str, req: &CancelListingRequest) -> Result<(), MarketError> {
        self.post_expect_success("cancel-listing", bearer, req).await
    }

    async fn checkout_treasury(
        &self,
        bearer: &str,
        req: &TreasuryCheckoutRequest,
    ) -> Result<CheckoutSession, MarketError> {
        self.post_checkout("payments/checkout/treasury", bearer, req)
            .await
    }

    async fn checkout_listing(
        &self,
        bearer: &str,
        req: &ListingCheckoutRequest,
    ) -> Result<CheckoutSession, MarketError> {
        self.post_checkout("payments/checkout/listing", bearer, req)
            .await
    }

    async fn mint(&self, bearer: &str, req: &MintRequest) -> Result<(), MarketError> {
        self.post_expect_success("admin/mint", bearer, req).await
    }

    async fn set_price(&self, bearer: &str, req: &SetPriceRequest) -> Result<(), MarketError> {
        self.post_expect_success("admin/set-price", bearer, req).await
    }

    async fn sync_user(&self, bearer: &str) -> Result<(), MarketError> {
        self.post_json("sync-user", bearer, &serde_json::json!({}))
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_body_wraps_plain_text() {
        let value = parse_body("Bad Gateway");
        assert_eq!(message_of(&value).as_deref(), Some("Bad Gateway"));
    }

    #[test]
    fn test_parse_body_empty_is_null() {
        assert_eq!(parse_body("   "), Value::Null);
        assert_eq!(message_of(&Value::Null), None);
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let client = BackendClient::new(&Url::parse("http://localhost:4000/").unwrap()).unwrap();
        assert_eq!(client.endpoint("supply"), "http://localhost:4000/friday/supply");
    }
}
