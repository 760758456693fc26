//! Plain HTTP fetch against the provider
//!
//! The stateless half of the fetch abstraction: a rate-limited GET with a
//! realistic user-agent that returns the page source, or `None` on any
//! network failure or non-success status. Callers decide whether a failed
//! fetch aborts the page or the crawl; this layer never retries.
//!
//! Document parsing deliberately stays out of this module: `scraper::Html`
//! is not `Send`, so each consumer parses in a synchronous helper and drops
//! the document before the next await point.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::rate_limiter::RateLimiter;

/// User-agent presented on every plain fetch and browser launch
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Stateless HTTP fetcher shared across the pagination engine, enrichment
/// pipeline, and geotagging workers. Cheap to clone.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    limiter: Arc<RateLimiter>,
    rate_rps: f64,
}

impl HttpFetcher {
    /// Build a fetcher with the given timeout and per-domain rate
    pub fn new(fetch_timeout: Duration, rate_rps: f64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(fetch_timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            limiter: Arc::new(RateLimiter::new()),
            rate_rps,
        })
    }

    /// Fetch `url` with the given query parameters, returning the page
    /// source or `None` on failure. Waits on the per-domain rate limiter
    /// before sending.
    pub async fn plain_fetch(&self, url: &str, params: &[(String, String)]) -> Option<String> {
        self.limiter.acquire(url, self.rate_rps).await;

        let response = match self.client.get(url).query(params).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("GET {url} failed: {e}");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!("GET {url} returned not OK response code: {status} (skipping)");
            return None;
        }

        match response.text().await {
            Ok(text) => {
                debug!("GET {url} ok ({} bytes)", text.len());
                Some(text)
            }
            Err(e) => {
                warn!("failed to read body of {url}: {e}");
                None
            }
        }
    }
}
