//! Error types for scrape operations.
//!
//! Almost nothing in the crawl path is fatal: transient fetch failures and
//! structural drift degrade the affected record instead of erroring. The
//! variants here cover the cases that do surface to the caller, chiefly
//! configuration mistakes.

/// Custom error type for scrape operations
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    /// Caller passed a sort key outside the provider's accepted set.
    /// This indicates a caller bug and is rejected before any fetch.
    #[error("'{0}' is not a valid sort key, use: 'newest', 'price_asc' or 'price_desc'")]
    InvalidSortKey(String),
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
    /// Browser session error
    #[error("browser error: {0}")]
    Browser(String),
    /// Challenge solver error
    #[error("challenge solver error: {0}")]
    Solver(String),
    /// Other errors
    #[error("scrape error: {0}")]
    Other(String),
}

impl From<anyhow::Error> for ScrapeError {
    fn from(err: anyhow::Error) -> Self {
        // Use {:#} to preserve full error chain with context
        Self::Other(format!("{err:#}"))
    }
}

/// Convenience alias for Result with `ScrapeError`
pub type ScrapeResult<T> = Result<T, ScrapeError>;
