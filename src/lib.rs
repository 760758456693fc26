//! Classifieds marketplace crawler
//!
//! Crawls a provider's paginated search results into normalized listing
//! records, with optional detail enrichment (body, images, structured
//! attributes, geotag) and interactive contact reveal through a managed
//! headless-browser session.
//!
//! The crawl is resilient by design: transient fetch failures and provider
//! markup drift degrade individual records instead of aborting, a reveal
//! blocked by a verification challenge reports "contact unavailable", and
//! the only error surfaced to the caller before work starts is an invalid
//! sort key.

pub mod browser;
pub mod captcha;
pub mod config;
pub mod details;
pub mod error;
pub mod fetch;
pub mod filters;
pub mod geotag;
pub mod listing;
pub mod pagination;
pub mod rate_limiter;
pub mod request;
pub mod rows;

pub use browser::{ContactInfo, SessionManager};
pub use captcha::{ChallengeSolver, HttpChallengeSolver, SolvedChallenge};
pub use config::SiteConfig;
pub use error::{ScrapeError, ScrapeResult};
pub use fetch::{HttpFetcher, USER_AGENT};
pub use filters::{FilterKind, FilterSpec};
pub use listing::{Geotag, Listing, ListingDetails, SOURCE_TAG};
pub use request::{FilterInput, SearchRequest, SortKey};

use futures::Stream;
use std::sync::Arc;
use tracing::warn;

/// What `enrich` should collect for a record
#[derive(Debug, Clone, Copy)]
pub struct EnrichOptions {
    /// Extract the geotag from the detail page
    pub geotag: bool,
    /// Extract body, images, attributes, creation time, and address
    pub details: bool,
    /// Attempt the interactive contact reveal (only applies with
    /// `details`; needs a live browser)
    pub reveal_contact: bool,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            geotag: false,
            details: true,
            reveal_contact: true,
        }
    }
}

/// Marketplace scraper for one site/category
///
/// Owns the plain HTTP fetcher and the shared browser session. The
/// pagination stream, enrichment pipeline, and geotagging pool all run
/// against these shared resources.
pub struct Scraper {
    config: SiteConfig,
    fetcher: HttpFetcher,
    session: SessionManager,
}

impl Scraper {
    /// Create a scraper without a challenge solver
    pub fn new(config: SiteConfig) -> ScrapeResult<Self> {
        Self::with_solver(config, None)
    }

    /// Create a scraper, forwarding detected challenges to `solver`
    pub fn with_solver(
        config: SiteConfig,
        solver: Option<Arc<dyn ChallengeSolver>>,
    ) -> ScrapeResult<Self> {
        let fetcher = HttpFetcher::new(config.fetch_timeout, config.rate_rps)?;
        let session =
            SessionManager::new(config.session_idle_timeout, config.element_wait, solver);
        Ok(Self {
            config,
            fetcher,
            session,
        })
    }

    /// The configured search URL
    #[must_use]
    pub fn search_url(&self) -> String {
        self.config.search_url()
    }

    /// Lazily yield summary records for `request`, in provider page order
    ///
    /// The stream is finite and not restartable; call again with the same
    /// request to start over. A failed page fetch ends the stream with
    /// whatever has been yielded so far.
    pub async fn results(&self, request: &SearchRequest) -> impl Stream<Item = Listing> + '_ {
        let search_url = self.config.search_url();
        let mut params =
            filters::resolve(&self.fetcher, request, &self.config.category, &search_url).await;
        params.push(("sort".to_string(), request.sort.provider_code().to_string()));

        pagination::page_stream(
            &self.fetcher,
            search_url,
            params,
            self.config.page_size,
            request.start,
        )
    }

    /// Approximate result count the provider reports for `request`
    ///
    /// Makes one extra fetch; usually within +/-10 of what the stream
    /// actually yields.
    pub async fn approx_count(&self, request: &SearchRequest) -> Option<u64> {
        let search_url = self.config.search_url();
        let params =
            filters::resolve(&self.fetcher, request, &self.config.category, &search_url).await;
        pagination::approx_count(&self.fetcher, &search_url, &params).await
    }

    /// Enrich a record from its detail page
    ///
    /// An unfetchable page leaves the record unchanged. A fetched page
    /// without a body section marks the record deleted and stops. Contact
    /// reveal failures never revert fields collected before them.
    pub async fn enrich(&self, listing: &mut Listing, opts: EnrichOptions) {
        if !opts.geotag && !opts.details {
            return;
        }

        let Some(html) = self.fetcher.plain_fetch(&listing.url, &[]).await else {
            return;
        };
        let page = details::parse_detail_page(&html);

        if page.deleted {
            listing.deleted = true;
            return;
        }

        if opts.geotag {
            listing.geotag = page.geotag;
        }
        if !opts.details {
            return;
        }

        listing.created = page.created;

        let list_filters =
            filters::get_list_filters(&self.fetcher, &self.config.search_url()).await;
        let parsed_attrs = details::parse_structured_attrs(
            &page.attrs,
            filters::category_filters(&self.config.category),
            &list_filters,
        );

        let mut detail = ListingDetails {
            body: page.body.unwrap_or_default(),
            images: page.images,
            attrs: page.attrs,
            parsed_attrs,
            address: page.address,
            email: None,
            phone: None,
        };

        if opts.reveal_contact {
            match self.session.reveal_contact(&listing.url).await {
                Ok(contact) => {
                    detail.email = contact.email;
                    detail.phone = contact.phone;
                }
                Err(e) => warn!("contact reveal failed for {}: {e:#}", listing.url),
            }
        }

        listing.details = Some(detail);
    }

    /// Attach geolocation to every record using the bounded worker pool
    ///
    /// Returns the records in their original order. Workers use plain HTTP
    /// only; the browser session is untouched.
    pub async fn geotag_all(&self, records: Vec<Listing>, workers: usize) -> Vec<Listing> {
        geotag::geotag_all(&self.fetcher, records, workers).await
    }

    /// Attach geolocation using the configured default worker count
    pub async fn geotag_all_default(&self, records: Vec<Listing>) -> Vec<Listing> {
        self.geotag_all(records, self.config.geotag_workers).await
    }

    /// The category picker for this site: `(code, name)` pairs
    pub async fn fetch_categories(&self) -> Vec<(String, String)> {
        match self
            .fetcher
            .plain_fetch(&self.config.search_url(), &[])
            .await
        {
            Some(html) => filters::parse_categories(&html),
            None => Vec::new(),
        }
    }

    /// Shared browser session manager, for callers that need rendered
    /// page fetches directly
    #[must_use]
    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Shut down the browser session if one is live
    pub async fn quit(&self) {
        self.session.quit().await;
    }
}
