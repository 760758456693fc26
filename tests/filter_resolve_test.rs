//! Tests for resolving semantic requests into provider parameters

mod common;

use std::collections::BTreeMap;

use listscrape::filters;
use listscrape::{FilterInput, SearchRequest};

const FILTER_PAGE: &str = r#"<!DOCTYPE html>
<html>
<body>
  <div class="search-attribute" data-attr="condition">
    <label><input type="checkbox" value="10"> new</label>
    <label><input type="checkbox" value="20"> like new</label>
  </div>
</body>
</html>"#;

fn value_of<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

#[tokio::test]
async fn test_base_filters_resolve_to_provider_params() {
    let mut server = common::new_server().await;
    let url = common::test_url(&server, "/search/sss");
    common::create_html_mock(&mut server, "/search/sss", FILTER_PAGE).await;

    let mut request = SearchRequest::query("apple");
    request.max_price = Some(30000);
    request.zip_code = Some("11249".to_string());
    request.search_distance = Some(100);
    request.search_titles = true;

    let fetcher = common::test_fetcher();
    let params = filters::resolve(&fetcher, &request, "sss", &url).await;

    assert_eq!(value_of(&params, "query"), Some("apple"));
    assert_eq!(value_of(&params, "max_price"), Some("30000"));
    assert_eq!(value_of(&params, "postal"), Some("11249"));
    assert_eq!(value_of(&params, "search_distance"), Some("100"));
    assert_eq!(value_of(&params, "srchType"), Some("T"));

    // False flags produce no parameter at all.
    assert_eq!(value_of(&params, "hasPic"), None);
    assert_eq!(value_of(&params, "postedToday"), None);
}

#[tokio::test]
async fn test_every_resolution_carries_the_nearby_suppressor() {
    let mut server = common::new_server().await;
    let url = common::test_url(&server, "/search/sss");
    common::create_html_mock(&mut server, "/search/sss", FILTER_PAGE).await;

    let fetcher = common::test_fetcher();
    let params = filters::resolve(&fetcher, &SearchRequest::default(), "sss", &url).await;

    assert_eq!(params[0], ("searchNearby".to_string(), "1".to_string()));
}

#[tokio::test]
async fn test_list_filter_options_resolve_to_encoded_values() {
    let mut server = common::new_server().await;
    let url = common::test_url(&server, "/search/sss");
    common::create_html_mock(&mut server, "/search/sss", FILTER_PAGE).await;

    let mut request = SearchRequest::default();
    request.extra = BTreeMap::from([(
        "condition".to_string(),
        FilterInput::Options(vec!["new".to_string(), "like new".to_string()]),
    )]);

    let fetcher = common::test_fetcher();
    let params = filters::resolve(&fetcher, &request, "sss", &url).await;

    let conditions: Vec<&str> = params
        .iter()
        .filter(|(k, _)| k == "condition")
        .map(|(_, v)| v.as_str())
        .collect();
    assert_eq!(conditions, vec!["10", "20"]);
}

#[tokio::test]
async fn test_unknown_keys_and_unresolved_options_are_dropped() {
    let mut server = common::new_server().await;
    let url = common::test_url(&server, "/search/sss");
    common::create_html_mock(&mut server, "/search/sss", FILTER_PAGE).await;

    let mut request = SearchRequest::default();
    request.extra = BTreeMap::from([
        (
            "bogus_filter".to_string(),
            FilterInput::Value("whatever".to_string()),
        ),
        (
            "condition".to_string(),
            FilterInput::Options(vec!["mint".to_string()]),
        ),
    ]);

    let fetcher = common::test_fetcher();
    let params = filters::resolve(&fetcher, &request, "sss", &url).await;

    // Neither the unknown key nor the unresolved option may surface in any
    // form; dropping, not substituting, is the contract.
    assert!(params.iter().all(|(k, _)| k != "bogus_filter"));
    assert!(params.iter().all(|(k, _)| k != "condition"));
    assert!(params.iter().all(|(_, v)| v != "whatever" && v != "mint"));
}

#[tokio::test]
async fn test_list_filters_are_fetched_once_per_url() {
    let mut server = common::new_server().await;
    let url = common::test_url(&server, "/search/sss");
    let mock = server
        .mock("GET", "/search/sss")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_body(FILTER_PAGE)
        .expect(1)
        .create_async()
        .await;

    let fetcher = common::test_fetcher();
    for _ in 0..3 {
        let params = filters::resolve(&fetcher, &SearchRequest::default(), "sss", &url).await;
        assert!(!params.is_empty());
    }

    mock.assert_async().await;
}

#[tokio::test]
async fn test_unreachable_filter_page_degrades_to_base_table() {
    let mut server = common::new_server().await;
    let url = common::test_url(&server, "/search/sss");
    common::create_error_mock(&mut server, "/search/sss", 500).await;

    let mut request = SearchRequest::query("apple");
    request.extra = BTreeMap::from([(
        "condition".to_string(),
        FilterInput::Options(vec!["new".to_string()]),
    )]);

    let fetcher = common::test_fetcher();
    let params = filters::resolve(&fetcher, &request, "sss", &url).await;

    // Base-table keys still resolve; the list filter cannot and is dropped.
    assert_eq!(
        params
            .iter()
            .find(|(k, _)| k == "query")
            .map(|(_, v)| v.as_str()),
        Some("apple")
    );
    assert!(params.iter().all(|(k, _)| k != "condition"));
}
