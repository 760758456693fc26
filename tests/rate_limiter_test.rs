//! Tests for the per-domain rate limiter
//!
//! These tests use isolated `RateLimiter` instances to ensure they can
//! run in parallel without interfering with each other.

use listscrape::rate_limiter::{extract_domain, RateLimitDecision, RateLimiter};

#[test]
fn test_extract_domain() {
    assert_eq!(
        extract_domain("https://example.com"),
        Some("example.com".to_string())
    );
    assert_eq!(
        extract_domain("https://www.example.com"),
        Some("example.com".to_string())
    );
    assert_eq!(
        extract_domain("https://example.com/search/sss?query=apple"),
        Some("example.com".to_string())
    );
    assert_eq!(
        extract_domain("https://example.com:8080"),
        Some("example.com".to_string())
    );
    assert_eq!(
        extract_domain("https://sub.example.com"),
        Some("sub.example.com".to_string())
    );
    assert_eq!(
        extract_domain("example.com"),
        Some("example.com".to_string())
    );
    assert_eq!(
        extract_domain("www.example.com"),
        Some("example.com".to_string())
    );
}

#[tokio::test]
async fn test_rate_limit_basic() {
    let limiter = RateLimiter::new();

    // First request should be allowed
    assert_eq!(
        limiter.check("https://example.com", 1.0).await,
        RateLimitDecision::Allow
    );

    // Immediate second request should be denied
    assert!(matches!(
        limiter.check("https://example.com", 1.0).await,
        RateLimitDecision::Deny { .. }
    ));
}

#[tokio::test]
async fn test_per_domain_limiting() {
    let limiter = RateLimiter::new();

    // Requests to different domains should be independent
    assert_eq!(
        limiter.check("https://example.com", 1.0).await,
        RateLimitDecision::Allow
    );
    assert_eq!(
        limiter.check("https://different.com", 1.0).await,
        RateLimitDecision::Allow
    );

    // Second requests should both be denied
    assert!(matches!(
        limiter.check("https://example.com", 1.0).await,
        RateLimitDecision::Deny { .. }
    ));
    assert!(matches!(
        limiter.check("https://different.com", 1.0).await,
        RateLimitDecision::Deny { .. }
    ));
}

#[tokio::test]
async fn test_zero_rate_disables_limiting() {
    let limiter = RateLimiter::new();

    for _ in 0..10 {
        assert_eq!(
            limiter.check("https://example.com", 0.0).await,
            RateLimitDecision::Allow
        );
    }
}

#[tokio::test]
async fn test_deny_carries_a_retry_hint() {
    let limiter = RateLimiter::new();

    assert_eq!(
        limiter.check("https://example.com", 1.0).await,
        RateLimitDecision::Allow
    );
    match limiter.check("https://example.com", 1.0).await {
        RateLimitDecision::Deny { retry_after } => {
            assert!(retry_after > std::time::Duration::ZERO);
            assert!(retry_after <= std::time::Duration::from_secs(2));
        }
        RateLimitDecision::Allow => panic!("expected a denial"),
    }
}

#[tokio::test]
async fn test_tokens_refill_over_time() {
    let limiter = RateLimiter::new();

    // Drain the bucket at a high rate, then wait for a refill.
    assert_eq!(
        limiter.check("https://example.com", 20.0).await,
        RateLimitDecision::Allow
    );
    for _ in 0..25 {
        let _ = limiter.check("https://example.com", 20.0).await;
    }
    assert!(matches!(
        limiter.check("https://example.com", 20.0).await,
        RateLimitDecision::Deny { .. }
    ));

    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    assert_eq!(
        limiter.check("https://example.com", 20.0).await,
        RateLimitDecision::Allow
    );
}
