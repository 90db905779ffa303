//! HTTP transport used by the cache for live requests
//!
//! The cache only needs one operation from the network: issue a GET with
//! query parameters and hand back the status code and decoded body. The
//! [`Transport`] trait is that seam; [`ReqwestTransport`] is the production
//! implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::error::TransportError;
use crate::Params;

/// A completed HTTP exchange, whatever its status
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    /// Body decoded as JSON, or a JSON string when the body is not JSON
    pub body: Value,
}

impl Response {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// A synthetic 200 response, as returned for cache hits
    pub fn ok(body: Value) -> Self {
        Self::new(200, body)
    }
}

/// Performs live requests on behalf of the cache
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issues a GET to `url` with `params` as the query string
    ///
    /// Returns `Err` only when no response was received at all. Any status
    /// code, including errors, comes back as `Ok(Response)`.
    async fn perform_request(&self, url: &str, params: &Params)
        -> Result<Response, TransportError>;
}

/// Transport backed by a shared `reqwest::Client`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ReqwestTransport {
    /// Create a transport with default client settings
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Create a transport with a custom HTTP client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Create a transport whose requests time out after `timeout`
    pub fn with_timeout(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn perform_request(
        &self,
        url: &str,
        params: &Params,
    ) -> Result<Response, TransportError> {
        let params_json = serde_json::to_string(params).unwrap_or_default();
        let request_failed = |source| TransportError::RequestFailed {
            url: url.to_string(),
            params: params_json.clone(),
            source,
        };

        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(request_failed)?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(request_failed)?;

        Ok(Response::new(status, decode_body(text)))
    }
}

/// Decodes a response body as JSON, keeping non-JSON bodies as a string
fn decode_body(text: String) -> Value {
    match serde_json::from_str(&text) {
        Ok(value) => value,
        Err(_) => Value::String(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_body_parses_json() {
        assert_eq!(
            decode_body(r#"{"price":"1.23"}"#.to_string()),
            json!({"price": "1.23"})
        );
    }

    #[test]
    fn test_decode_body_keeps_plain_text() {
        assert_eq!(
            decode_body("Bad Request".to_string()),
            Value::String("Bad Request".to_string())
        );
    }

    #[test]
    fn test_response_ok_is_status_200() {
        assert_eq!(Response::ok(json!(1)).status, 200);
    }

    #[tokio::test]
    async fn test_with_client_uses_given_client() {
        use reqwest::header::{HeaderMap, HeaderValue};
        use wiremock::matchers::{header, method, query_param};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("x-api-key", "secret"))
            .and(query_param("symbol", "BTC"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"price": "1.23"})))
            .expect(1)
            .mount(&server)
            .await;

        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_static("secret"));
        let client = Client::builder().default_headers(headers).build().unwrap();
        let transport = ReqwestTransport::with_client(client);

        let mut params = Params::new();
        params.insert("symbol".to_string(), "BTC".to_string());
        let response = transport.perform_request(&server.uri(), &params).await.unwrap();

        assert_eq!(response, Response::ok(json!({"price": "1.23"})));
    }

    #[tokio::test]
    async fn test_request_failure_carries_url_and_params() {
        let transport = ReqwestTransport::new();
        let mut params = Params::new();
        params.insert("symbol".to_string(), "BTC".to_string());

        // Port 9 (discard) on localhost is expected to refuse connections.
        let err = transport
            .perform_request("http://127.0.0.1:9/ticker", &params)
            .await
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("http://127.0.0.1:9/ticker"), "{message}");
        assert!(message.contains(r#"{"symbol":"BTC"}"#), "{message}");
    }
}
