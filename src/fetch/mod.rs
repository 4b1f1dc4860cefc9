//! HTTP transport for the vehicle-details API.
//!
//! [`HttpClient`] is the seam between the fetcher and the network so the
//! cache behavior can be exercised without a live endpoint.

mod basic;

pub use basic::BasicClient;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::header::{HeaderValue, USER_AGENT};
use reqwest::{Method, Request, Response, Url};
use serde_json::Value;

/// Desktop Safari user agent; the API rejects obvious non-browser clients.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.4 Safari/605.1.15";

#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}

/// Builds the GET request for one vehicle's detail document.
pub fn vehicle_request(endpoint: &str, vehicle_id: &str) -> Result<Request> {
    let mut url: Url = endpoint
        .parse()
        .with_context(|| format!("invalid vehicle-details endpoint '{endpoint}'"))?;
    url.query_pairs_mut().append_pair("vehicleId", vehicle_id);

    let mut req = Request::new(Method::GET, url);
    req.headers_mut()
        .insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    Ok(req)
}

/// Executes `req` and parses the body as JSON.
///
/// # Errors
///
/// Fails on transport errors, non-success status codes and malformed JSON.
pub async fn fetch_json<C: HttpClient + ?Sized>(client: &C, req: Request) -> Result<Value> {
    let url = req.url().to_string();
    let resp = client
        .execute(req)
        .await
        .with_context(|| format!("request to {url} failed"))?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(anyhow!("{url} returned status {status}: {body}"));
    }

    let text = resp.text().await?;
    serde_json::from_str(&text).with_context(|| format!("malformed JSON from {url}"))
}
