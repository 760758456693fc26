//! Pagination engine
//!
//! Drives repeated fetch-and-parse cycles over the search URL, yielding
//! summary records lazily in provider page order. The stream is finite and
//! not restartable; re-invoke with the same request to start over.
//!
//! Last-page detection compares each page's yield count against the
//! provider's fixed page size and stops once a page comes up short. The
//! provider's own total is approximate (usually within +/-10 of the actual
//! result count), so this boundary may be off by a small margin; that is
//! accepted behavior, not a bug to fix.

use futures::stream::{self, Stream, StreamExt};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{debug, warn};

use crate::fetch::HttpFetcher;
use crate::listing::Listing;
use crate::rows;

static TOTAL_COUNT: Lazy<Selector> =
    Lazy::new(|| Selector::parse("span.totalcount").expect("static selector"));
static RESULT_COUNT: Lazy<Selector> =
    Lazy::new(|| Selector::parse("ol div.result-count").expect("static selector"));
static RESULT_ROW: Lazy<Selector> =
    Lazy::new(|| Selector::parse("ol li.cl-search-result").expect("static selector"));

/// Parsed content of one results page
pub(crate) struct ResultsPage {
    /// Provider-reported approximate total, when the page carries one
    pub total: Option<u64>,
    /// Listing records, already truncated to the page's declared count
    pub rows: Vec<Listing>,
}

/// Parse a results page: approximate total, declared per-page count, and
/// every listing row up to that count (spacers skipped).
pub(crate) fn parse_results_page(html: &str, base_url: &str) -> ResultsPage {
    let document = Html::parse_document(html);

    let total = document
        .select(&TOTAL_COUNT)
        .next()
        .and_then(|el| el.text().collect::<String>().trim().parse().ok());

    let declared: Option<usize> = document.select(&RESULT_COUNT).next().and_then(|el| {
        let text = el.text().collect::<String>();
        text.split_whitespace().next()?.parse().ok()
    });

    let mut listings = Vec::new();
    for row in document.select(&RESULT_ROW) {
        if let Some(declared) = declared
            && listings.len() >= declared
        {
            break;
        }
        if let Some(listing) = rows::parse_row(row, base_url) {
            listings.push(listing);
        }
    }

    ResultsPage {
        total,
        rows: listings,
    }
}

struct PageState {
    start: u64,
    total: Option<u64>,
    done: bool,
}

/// Lazy stream of summary records for one resolved search
///
/// `params` must already carry the resolved filter parameters and the sort
/// key; the engine adds the running offset. A failed page fetch ends the
/// stream; the caller decides whether to re-invoke.
pub(crate) fn page_stream<'a>(
    fetcher: &'a HttpFetcher,
    search_url: String,
    params: Vec<(String, String)>,
    page_size: u64,
    start: u64,
) -> impl Stream<Item = Listing> + 'a {
    let state = PageState {
        start,
        total: None,
        done: false,
    };

    stream::unfold(state, move |mut state| {
        let search_url = search_url.clone();
        let mut page_params = params.clone();
        async move {
            if state.done {
                return None;
            }

            page_params.push(("s".to_string(), state.start.to_string()));
            let Some(html) = fetcher.plain_fetch(&search_url, &page_params).await else {
                warn!("page fetch failed at offset {}, ending stream", state.start);
                return None;
            };

            let page = parse_results_page(&html, &search_url);
            if state.total.is_none() {
                state.total = page.total;
            }

            let yielded = page.rows.len() as u64;
            debug!(
                "page at offset {} yielded {} of ~{} results",
                state.start,
                yielded,
                state.total.map_or_else(|| "?".to_string(), |t| t.to_string()),
            );

            state.start += yielded;
            if yielded < page_size {
                state.done = true;
            }
            if page.rows.is_empty() {
                return None;
            }

            Some((stream::iter(page.rows), state))
        }
    })
    .flatten()
}

/// Approximate number of results the provider reports for a search
///
/// Makes one extra fetch of the first page. The number is usually within
/// +/-10 of the count the stream actually yields.
pub(crate) async fn approx_count(
    fetcher: &HttpFetcher,
    search_url: &str,
    params: &[(String, String)],
) -> Option<u64> {
    let html = fetcher.plain_fetch(search_url, params).await?;
    parse_results_page(&html, search_url).total
}
