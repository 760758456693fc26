//! Site configuration for scrape operations
//!
//! `SiteConfig` carries the provider coordinates (site, optional area,
//! category) and the tuning knobs shared by the fetch, pagination, browser,
//! and geotagging layers.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Results returned by the provider per search page.
pub const RESULTS_PER_PAGE: u64 = 100;

/// Default number of geotagging workers.
pub const DEFAULT_GEOTAG_WORKERS: usize = 8;

/// Configuration for a single provider site/category combination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Provider site code, e.g. "newyork"
    pub(crate) site: String,
    /// Optional sub-area code within the site
    pub(crate) area: Option<String>,
    /// Category code, e.g. "sss" (all for-sale)
    pub(crate) category: String,
    /// Provider page size used by last-page detection
    pub(crate) page_size: u64,
    /// Timeout for plain HTTP fetches
    pub(crate) fetch_timeout: Duration,
    /// Bounded wait applied to each interactive browser step
    pub(crate) element_wait: Duration,
    /// Browser session auto-quit threshold
    pub(crate) session_idle_timeout: Duration,
    /// Requests per second against the provider (0 disables limiting)
    pub(crate) rate_rps: f64,
    /// Worker count for `geotag_all`
    pub(crate) geotag_workers: usize,
    /// Test hook: replaces the provider base URL when set
    pub(crate) base_override: Option<String>,
}

impl SiteConfig {
    /// Create a configuration for the given site code with defaults
    /// matching the provider's observed behavior.
    #[must_use]
    pub fn new(site: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            area: None,
            category: "sss".to_string(),
            page_size: RESULTS_PER_PAGE,
            fetch_timeout: Duration::from_secs(30),
            element_wait: Duration::from_secs(10),
            session_idle_timeout: Duration::from_secs(5),
            rate_rps: 1.0,
            geotag_workers: DEFAULT_GEOTAG_WORKERS,
            base_override: None,
        }
    }

    /// Restrict the search to a sub-area of the site
    #[must_use]
    pub fn area(mut self, area: impl Into<String>) -> Self {
        self.area = Some(area.into());
        self
    }

    /// Set the category code
    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Override the provider page size (used by tests and smaller mirrors)
    #[must_use]
    pub fn page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the per-domain request rate in requests per second
    #[must_use]
    pub fn rate_rps(mut self, rate_rps: f64) -> Self {
        self.rate_rps = rate_rps;
        self
    }

    /// Set the geotagging worker count
    #[must_use]
    pub fn geotag_workers(mut self, workers: usize) -> Self {
        self.geotag_workers = workers;
        self
    }

    /// Set the bounded wait used for interactive browser steps
    #[must_use]
    pub fn element_wait(mut self, wait: Duration) -> Self {
        self.element_wait = wait;
        self
    }

    /// Set the browser idle auto-quit threshold
    #[must_use]
    pub fn session_idle_timeout(mut self, timeout: Duration) -> Self {
        self.session_idle_timeout = timeout;
        self
    }

    /// Point the config at an arbitrary base URL instead of the provider's
    /// `https://{site}.craigslist.org` scheme. Intended for tests against a
    /// local mock server.
    #[must_use]
    pub fn base_url_override(mut self, base: impl Into<String>) -> Self {
        self.base_override = Some(base.into());
        self
    }

    /// Base URL for the configured site
    #[must_use]
    pub fn base_url(&self) -> String {
        if let Some(base) = &self.base_override {
            return base.clone();
        }
        format!("https://{}.craigslist.org", self.site)
    }

    /// Search URL for the configured site/area/category
    #[must_use]
    pub fn search_url(&self) -> String {
        match &self.area {
            Some(area) => format!("{}/search/{}/{}", self.base_url(), area, self.category),
            None => format!("{}/search/{}", self.base_url(), self.category),
        }
    }
}
