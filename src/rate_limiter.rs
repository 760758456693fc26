//! Per-domain rate limiter for respectful scraping
//!
//! Token bucket per domain with an LRU-bounded cache of buckets. Decisions
//! are immediate `Allow`/`Deny { retry_after }`; `acquire` layers a
//! sleep-and-retry loop on top for callers that want to block until a slot
//! opens, which is what every plain fetch against the provider does.

use lru::LruCache;
use rand::Rng;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use url::Url;

/// Maximum number of domains to track simultaneously
const MAX_DOMAIN_LIMITERS: usize = 64;

/// Rate limit decision for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// Request is allowed to proceed
    Allow,
    /// Request should wait for at least `retry_after` before retrying
    Deny { retry_after: Duration },
}

#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(rate_rps: f64) -> Self {
        Self {
            tokens: rate_rps.max(1.0),
            last_refill: Instant::now(),
        }
    }

    fn try_consume(&mut self, rate_rps: f64) -> RateLimitDecision {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        let burst = rate_rps.max(1.0);
        self.tokens = (self.tokens + elapsed * rate_rps).min(burst);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            RateLimitDecision::Allow
        } else {
            let deficit = 1.0 - self.tokens;
            let retry_after = Duration::from_secs_f64(deficit / rate_rps.max(f64::EPSILON));
            RateLimitDecision::Deny { retry_after }
        }
    }
}

/// Per-domain token-bucket rate limiter
#[derive(Debug)]
pub struct RateLimiter {
    buckets: Mutex<LruCache<String, Arc<Mutex<TokenBucket>>>>,
}

impl RateLimiter {
    /// Create a limiter tracking up to `MAX_DOMAIN_LIMITERS` domains
    #[must_use]
    pub fn new() -> Self {
        let capacity = NonZeroUsize::new(MAX_DOMAIN_LIMITERS)
            .unwrap_or(NonZeroUsize::MIN);
        Self {
            buckets: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Check whether a request to `url` is allowed at `rate_rps`
    pub async fn check(&self, url: &str, rate_rps: f64) -> RateLimitDecision {
        if rate_rps <= 0.0 {
            return RateLimitDecision::Allow;
        }

        let domain = match extract_domain(url) {
            Some(domain) if !domain.is_empty() => domain,
            _ => return RateLimitDecision::Allow,
        };

        let bucket = {
            let mut cache = self.buckets.lock().await;
            if let Some(bucket) = cache.get(&domain) {
                Arc::clone(bucket)
            } else {
                let bucket = Arc::new(Mutex::new(TokenBucket::new(rate_rps)));
                cache.put(domain, Arc::clone(&bucket));
                bucket
            }
        };

        let mut bucket = bucket.lock().await;
        bucket.try_consume(rate_rps)
    }

    /// Block until a request to `url` is allowed
    ///
    /// Sleeps for the denied duration plus a small jitter so concurrent
    /// waiters do not wake in lockstep.
    pub async fn acquire(&self, url: &str, rate_rps: f64) {
        loop {
            match self.check(url, rate_rps).await {
                RateLimitDecision::Allow => return,
                RateLimitDecision::Deny { retry_after } => {
                    let jitter = Duration::from_millis(rand::rng().random_range(0..100));
                    tokio::time::sleep(retry_after + jitter).await;
                }
            }
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract the normalized domain from a URL, stripping any `www.` prefix
#[must_use]
pub fn extract_domain(url: &str) -> Option<String> {
    let host = match Url::parse(url) {
        Ok(parsed) => parsed.host_str()?.to_string(),
        Err(_) => url
            .split(['/', '?', '#', ':'])
            .next()
            .unwrap_or(url)
            .to_string(),
    };
    let host = host.to_lowercase();
    let normalized = host.strip_prefix("www.").unwrap_or(&host);
    if normalized.is_empty() {
        None
    } else {
        Some(normalized.to_string())
    }
}
