//! Filter model
//!
//! Translates a semantic `SearchRequest` into provider query parameters.
//! Specs are looked up through an ordered chain: the static base table,
//! then the category override table, then the list filters fetched (and
//! cached) from the category's search page. Unknown keys and unresolved
//! options are logged and dropped, never substituted with a default.

pub mod list_cache;

use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use tracing::warn;

use crate::fetch::HttpFetcher;
use crate::request::{FilterInput, SearchRequest};

pub use list_cache::{get_list_filters, ListFilters};

/// How a filter spec turns a semantic value into a provider parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterKind {
    /// The caller's raw value is emitted under the provider key
    PassThrough,
    /// A fixed provider value, emitted only when the semantic flag is truthy
    Literal(String),
    /// Option name -> provider-encoded option value
    Options(BTreeMap<String, String>),
}

/// One entry in a filter table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSpec {
    /// Provider query-parameter name
    pub url_key: String,
    /// Translation behavior
    pub kind: FilterKind,
    /// Marker string a binary filter shows in a posting's attribute list,
    /// used when deriving structured attributes during enrichment
    pub attr_marker: Option<String>,
}

impl FilterSpec {
    pub(crate) fn pass_through(url_key: &str) -> Self {
        Self {
            url_key: url_key.to_string(),
            kind: FilterKind::PassThrough,
            attr_marker: None,
        }
    }

    pub(crate) fn literal(url_key: &str, value: &str) -> Self {
        Self {
            url_key: url_key.to_string(),
            kind: FilterKind::Literal(value.to_string()),
            attr_marker: None,
        }
    }

    pub(crate) fn binary(url_key: &str, attr_marker: &str) -> Self {
        Self {
            url_key: url_key.to_string(),
            kind: FilterKind::Literal("1".to_string()),
            attr_marker: Some(attr_marker.to_string()),
        }
    }

    pub(crate) fn options(url_key: &str, pairs: &[(&str, &str)]) -> Self {
        Self {
            url_key: url_key.to_string(),
            kind: FilterKind::Options(
                pairs
                    .iter()
                    .map(|(name, code)| (name.to_string(), code.to_string()))
                    .collect(),
            ),
            attr_marker: None,
        }
    }
}

/// Base filter table shared by every category
pub fn base_filters() -> &'static BTreeMap<String, FilterSpec> {
    static BASE: Lazy<BTreeMap<String, FilterSpec>> = Lazy::new(|| {
        BTreeMap::from([
            ("query".to_string(), FilterSpec::pass_through("query")),
            ("search_titles".to_string(), FilterSpec::literal("srchType", "T")),
            ("has_image".to_string(), FilterSpec::literal("hasPic", "1")),
            ("posted_today".to_string(), FilterSpec::literal("postedToday", "1")),
            (
                "bundle_duplicates".to_string(),
                FilterSpec::literal("bundleDuplicates", "1"),
            ),
            (
                "search_distance".to_string(),
                FilterSpec::pass_through("search_distance"),
            ),
            ("zip_code".to_string(), FilterSpec::pass_through("postal")),
        ])
    });
    &BASE
}

/// Category-specific override table
///
/// Only the for-sale tree carries overrides today; other categories fall
/// back to the base table plus their dynamically fetched list filters.
pub fn category_filters(category: &str) -> &'static BTreeMap<String, FilterSpec> {
    static FOR_SALE: Lazy<BTreeMap<String, FilterSpec>> = Lazy::new(|| {
        BTreeMap::from([
            ("min_price".to_string(), FilterSpec::pass_through("min_price")),
            ("max_price".to_string(), FilterSpec::pass_through("max_price")),
            (
                "crypto_currency_ok".to_string(),
                FilterSpec::binary("crypto_currency_ok", "cryptocurrency ok"),
            ),
            (
                "delivery_available".to_string(),
                FilterSpec::binary("delivery_available", "delivery available"),
            ),
        ])
    });
    static EMPTY: Lazy<BTreeMap<String, FilterSpec>> = Lazy::new(BTreeMap::new);

    // For-sale categories all start with "s" ("sss", "sya", "ela", ...);
    // the price bounds apply across that tree.
    if category.starts_with('s') || category == "ela" {
        &FOR_SALE
    } else {
        &EMPTY
    }
}

/// Resolve a request into provider query parameters
///
/// List filters for `search_url` are fetched once per process and cached.
/// The result always carries `searchNearby=1`: if a search has few results
/// the provider includes "similar listings" from nearby areas, and the
/// counter-intuitive fix is to set searchNearby without any nearbyArea,
/// which shows none.
pub async fn resolve(
    fetcher: &HttpFetcher,
    request: &SearchRequest,
    category: &str,
    search_url: &str,
) -> Vec<(String, String)> {
    let list_filters = get_list_filters(fetcher, search_url).await;
    let mut params = vec![("searchNearby".to_string(), "1".to_string())];

    for (key, input) in request.semantic_pairs() {
        let spec = base_filters()
            .get(&key)
            .or_else(|| category_filters(category).get(&key))
            .or_else(|| list_filters.get(&key));

        let Some(spec) = spec else {
            warn!("'{key}' is not a valid filter");
            continue;
        };

        match &spec.kind {
            FilterKind::PassThrough => {
                for value in input.raw_values() {
                    params.push((spec.url_key.clone(), value));
                }
            }
            FilterKind::Options(valid_options) => {
                for option in input.option_names() {
                    match valid_options.get(&option) {
                        Some(code) => params.push((spec.url_key.clone(), code.clone())),
                        None => warn!("'{option}' is not a valid option for {key}"),
                    }
                }
            }
            FilterKind::Literal(value) => {
                if input.is_truthy() {
                    params.push((spec.url_key.clone(), value.clone()));
                }
            }
        }
    }

    params
}

/// Parse the category picker from a search page into `(code, name)` pairs
///
/// The picker pairs a checkbox carrying the category code with an anchor
/// carrying the display name.
pub(crate) fn parse_categories(html: &str) -> Vec<(String, String)> {
    let document = scraper::Html::parse_document(html);
    let checkbox_sel =
        scraper::Selector::parse("input.catcheck").expect("static selector");
    let anchor_sel = scraper::Selector::parse("a.category").expect("static selector");

    let codes: Vec<String> = document
        .select(&checkbox_sel)
        .filter_map(|el| el.value().attr("data-abb"))
        .map(str::to_string)
        .collect();
    let names: Vec<String> = document
        .select(&anchor_sel)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .collect();

    codes.into_iter().zip(names).collect()
}
