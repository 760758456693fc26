//! Tests for the pagination engine, driven through the `Scraper` facade
//! against a mock provider.

mod common;

use futures::StreamExt;
use mockito::Matcher;

use listscrape::{Scraper, SearchRequest, SortKey};

#[tokio::test]
async fn test_single_short_page_yields_records_in_page_order() {
    common::init_tracing();
    let mut server = common::new_server().await;
    let page = common::results_page(
        3,
        &[
            &common::listing_row("1001", "apple macbook", "$900"),
            &common::spacer_row(),
            &common::listing_row("1003", "apple imac", "$400"),
        ],
    );
    common::create_html_mock(&mut server, "/search/sss", &page).await;

    let mut request = SearchRequest::query("apple");
    request.max_price = Some(30000);
    request.zip_code = Some("11249".to_string());
    request.search_distance = Some(100);

    let scraper = Scraper::new(common::test_config(&server)).expect("scraper builds");
    let results: Vec<_> = scraper.results(&request).await.collect().await;

    // Two records, in page order; the spacer produced none.
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].id, "1001");
    assert_eq!(results[1].id, "1003");
    assert!(results.iter().all(|r| !r.deleted));
}

#[tokio::test]
async fn test_requested_filters_reach_the_provider() {
    let mut server = common::new_server().await;
    let page = common::results_page(1, &[&common::listing_row("5", "apple", "$1")]);
    let mock = server
        .mock("GET", "/search/sss")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("searchNearby".into(), "1".into()),
            Matcher::UrlEncoded("query".into(), "apple".into()),
            Matcher::UrlEncoded("max_price".into(), "30000".into()),
            Matcher::UrlEncoded("postal".into(), "11249".into()),
            Matcher::UrlEncoded("search_distance".into(), "100".into()),
            Matcher::UrlEncoded("sort".into(), "date".into()),
            Matcher::UrlEncoded("s".into(), "0".into()),
        ]))
        .with_status(200)
        .with_body(&page)
        .create_async()
        .await;

    let mut request = SearchRequest::query("apple");
    request.max_price = Some(30000);
    request.zip_code = Some("11249".to_string());
    request.search_distance = Some(100);

    let scraper = Scraper::new(common::test_config(&server)).expect("scraper builds");
    let results: Vec<_> = scraper.results(&request).await.collect().await;

    assert_eq!(results.len(), 1);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_full_pages_advance_until_a_short_one() {
    let mut server = common::new_server().await;

    let first = common::results_page(
        3,
        &[
            &common::listing_row("1", "one", "$1"),
            &common::listing_row("2", "two", "$2"),
        ],
    );
    let second = common::results_page(3, &[&common::listing_row("3", "three", "$3")]);

    server
        .mock("GET", "/search/sss")
        .match_query(Matcher::UrlEncoded("s".into(), "0".into()))
        .with_status(200)
        .with_body(&first)
        .create_async()
        .await;
    server
        .mock("GET", "/search/sss")
        .match_query(Matcher::UrlEncoded("s".into(), "2".into()))
        .with_status(200)
        .with_body(&second)
        .create_async()
        .await;

    let config = common::test_config(&server).page_size(2);
    let scraper = Scraper::new(config).expect("scraper builds");
    let results: Vec<_> = scraper
        .results(&SearchRequest::default())
        .await
        .collect()
        .await;

    let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
}

#[tokio::test]
async fn test_failed_page_fetch_ends_the_stream() {
    let mut server = common::new_server().await;

    let first = common::results_page(
        4,
        &[
            &common::listing_row("1", "one", "$1"),
            &common::listing_row("2", "two", "$2"),
        ],
    );
    server
        .mock("GET", "/search/sss")
        .match_query(Matcher::UrlEncoded("s".into(), "0".into()))
        .with_status(200)
        .with_body(&first)
        .create_async()
        .await;
    server
        .mock("GET", "/search/sss")
        .match_query(Matcher::UrlEncoded("s".into(), "2".into()))
        .with_status(500)
        .create_async()
        .await;

    let config = common::test_config(&server).page_size(2);
    let scraper = Scraper::new(config).expect("scraper builds");
    let results: Vec<_> = scraper
        .results(&SearchRequest::default())
        .await
        .collect()
        .await;

    // The first page's records are kept; the failure ends the stream
    // without an error surfacing.
    assert_eq!(results.len(), 2);
}

#[tokio::test]
async fn test_empty_results_page_yields_nothing() {
    let mut server = common::new_server().await;
    let page = common::results_page(0, &[]);
    common::create_html_mock(&mut server, "/search/sss", &page).await;

    let scraper = Scraper::new(common::test_config(&server)).expect("scraper builds");
    let results: Vec<_> = scraper
        .results(&SearchRequest::query("nothing matches this"))
        .await
        .collect()
        .await;

    assert!(results.is_empty());
}

#[tokio::test]
async fn test_approx_count_reads_the_provider_total() {
    let mut server = common::new_server().await;
    let page = common::results_page(2500, &[&common::listing_row("1", "one", "$1")]);
    common::create_html_mock(&mut server, "/search/sss", &page).await;

    let scraper = Scraper::new(common::test_config(&server)).expect("scraper builds");
    let count = scraper.approx_count(&SearchRequest::default()).await;

    assert_eq!(count, Some(2500));
}

#[test]
fn test_invalid_sort_key_fails_before_any_fetch() {
    // No server exists here; the parse failure is the whole interaction.
    let err = "oldest".parse::<SortKey>().expect_err("must be rejected");
    assert_eq!(
        err.to_string(),
        "'oldest' is not a valid sort key, use: 'newest', 'price_asc' or 'price_desc'"
    );
}

#[tokio::test]
async fn test_categories_parse_from_the_search_page() {
    let mut server = common::new_server().await;
    let page = r#"<!DOCTYPE html>
<html><body>
  <input class="catcheck multi_checkbox" data-abb="sss">
  <a class="category">all for sale</a>
  <input class="catcheck multi_checkbox" data-abb="ata">
  <a class="category">antiques</a>
</body></html>"#;
    common::create_html_mock(&mut server, "/search/sss", page).await;

    let scraper = Scraper::new(common::test_config(&server)).expect("scraper builds");
    let categories = scraper.fetch_categories().await;

    assert_eq!(
        categories,
        vec![
            ("sss".to_string(), "all for sale".to_string()),
            ("ata".to_string(), "antiques".to_string()),
        ]
    );
}
