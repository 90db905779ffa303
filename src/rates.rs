//! Exchange-rate lookup on top of the request cache
//!
//! Queries a ticker endpoint that answers `{"price": "1.23"}` and memoizes
//! the answer for a short TTL, so repeated lookups within that window never
//! leave the machine.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::client::RequestCache;
use crate::Params;

/// How long a fetched rate is served from cache
pub const RATE_CACHE_TTL_SECS: u64 = 30;

/// Errors that can occur when fetching an exchange rate
#[derive(Debug, Error)]
pub enum RateError {
    /// The underlying request failed
    #[error(transparent)]
    Request(#[from] crate::Error),

    /// Failed to parse the ticker response
    #[error("Failed to parse ticker response: {0}")]
    ParseError(String),
}

/// Price of one unit of a symbol
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeRate {
    pub symbol: String,
    pub price: f64,
}

/// Ticker payloads carry the price either as a string or as a number
#[derive(Debug, Deserialize)]
struct TickerResponse {
    price: Price,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Price {
    Text(String),
    Number(f64),
}

/// Client for a JSON ticker endpoint
#[derive(Clone)]
pub struct ExchangeRateClient {
    cache: Arc<RequestCache>,
    /// Ticker endpoint URL
    base_url: String,
    ttl_seconds: u64,
}

impl ExchangeRateClient {
    pub fn new(cache: Arc<RequestCache>, base_url: impl Into<String>) -> Self {
        Self {
            cache,
            base_url: base_url.into(),
            ttl_seconds: RATE_CACHE_TTL_SECS,
        }
    }

    /// Overrides the cache TTL; 0 always goes to the network
    pub fn with_ttl(mut self, ttl_seconds: u64) -> Self {
        self.ttl_seconds = ttl_seconds;
        self
    }

    /// Fetch the current price for `symbol`
    ///
    /// # Returns
    /// * `Ok(ExchangeRate)` - The price, possibly served from cache
    /// * `Err(RateError)` - If the request fails or the payload has no usable price
    pub async fn fetch_rate(&self, symbol: &str) -> Result<ExchangeRate, RateError> {
        let mut params = Params::new();
        params.insert("symbol".to_string(), symbol.to_string());

        let body = self
            .cache
            .get_json(&self.base_url, Some(self.ttl_seconds), &params)
            .await?;

        Ok(ExchangeRate {
            symbol: symbol.to_string(),
            price: parse_price(body)?,
        })
    }
}

fn parse_price(body: Value) -> Result<f64, RateError> {
    let ticker: TickerResponse =
        serde_json::from_value(body).map_err(|e| RateError::ParseError(e.to_string()))?;

    match ticker.price {
        Price::Number(price) => Ok(price),
        Price::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| RateError::ParseError(format!("invalid price: {text:?}"))),
    }
}
