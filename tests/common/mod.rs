//! Test utilities shared by the listscrape test suite

use mockito::{Mock, Server};
use std::time::Duration;

use listscrape::{HttpFetcher, SiteConfig};

/// Starts an isolated mock server on a fresh port
///
/// The pooled `Server::new_async()` can hand the same port to several
/// tests in one process, which would alias URLs across tests and leak
/// the crate's per-URL list-filter cache between them.
#[allow(dead_code)]
pub async fn new_server() -> Server {
    Server::new_with_port_async(0).await
}

/// Creates a mock endpoint that returns HTML content for any query string
#[allow(dead_code)]
pub async fn create_html_mock(server: &mut Server, path: &str, html: &str) -> Mock {
    server
        .mock("GET", path)
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_header("content-type", "text/html; charset=utf-8")
        .with_body(html)
        .create_async()
        .await
}

/// Creates a mock endpoint that returns an error status for any query string
#[allow(dead_code)]
pub async fn create_error_mock(server: &mut Server, path: &str, status: usize) -> Mock {
    server
        .mock("GET", path)
        .match_query(mockito::Matcher::Any)
        .with_status(status)
        .with_body("Error")
        .create_async()
        .await
}

/// Initializes tracing output for a test; safe to call repeatedly.
/// Run with `RUST_LOG=listscrape=debug` to see crawl internals.
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Helper to create test URLs against the mock server
#[allow(dead_code)]
pub fn test_url(server: &Server, path: &str) -> String {
    format!("{}{}", server.url(), path)
}

/// Fetcher pointed at the mock server, rate limiting disabled
#[allow(dead_code)]
pub fn test_fetcher() -> HttpFetcher {
    HttpFetcher::new(Duration::from_secs(5), 0.0).expect("failed to build fetcher")
}

/// Site configuration pointed at the mock server, rate limiting disabled
#[allow(dead_code)]
pub fn test_config(server: &Server) -> SiteConfig {
    SiteConfig::new("testsite")
        .base_url_override(server.url())
        .rate_rps(0.0)
}

/// A search-results page with the given listing rows
#[allow(dead_code)]
pub fn results_page(total: u64, rows: &[&str]) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<body>
  <div class="results">
    <span class="totalcount">{total}</span>
    <ol>
      <div class="result-count">{count} results</div>
      {rows}
    </ol>
  </div>
</body>
</html>"#,
        total = total,
        count = rows.len(),
        rows = rows.join("\n      "),
    )
}

/// A normal listing row with the given id
#[allow(dead_code)]
pub fn listing_row(pid: &str, title: &str, price: &str) -> String {
    format!(
        r#"<li class="cl-search-result" data-pid="{pid}" title="{title}">
        <a class="main" href="/sss/{pid}.html"></a>
        <span class="priceinfo">{price}</span>
        <div class="meta">2 days ago·Brooklyn</div>
      </li>"#
    )
}

/// A layout spacer row, emitted by the provider to pad the gallery grid
#[allow(dead_code)]
pub fn spacer_row() -> String {
    r#"<li class="cl-search-result"><div class="gallery-card spacer"></div></li>"#.to_string()
}
