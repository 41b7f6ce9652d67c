//! Listing-page fetching.
//!
//! One shared [`reqwest::Client`] with a fixed bot User-Agent and a bounded
//! per-request timeout. Fetching is sequential and failures are the caller's
//! problem: a failed source becomes a synthetic error item in the digest and
//! the run moves on.

use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};

/// Identifies the monitor to the sites it polls.
pub const USER_AGENT: &str = "Mozilla/5.0 (compatible; RadarPortuarioBot/1.0)";

/// Build the shared HTTP client.
pub fn build_client(timeout_secs: u64) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(timeout_secs))
        .build()
}

/// Fetch one listing page as text. Non-2xx statuses are errors.
#[instrument(level = "info", skip(client))]
pub async fn fetch_page(client: &Client, url: &str) -> Result<String, reqwest::Error> {
    let body = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    debug!(bytes = body.len(), "Fetched listing page");
    Ok(body)
}
