//! List-filter fetch and cache
//!
//! List filters are provider-defined enumerations (e.g. a category's
//! "condition" choices) discovered by fetching the category's search page
//! and reading every selectable filter control. Option sets are assumed
//! stable for the life of the process, so each URL is fetched at most once;
//! concurrent first accesses collapse onto a single fetch through a
//! per-URL `OnceCell`.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, warn};

use super::{FilterKind, FilterSpec};
use crate::fetch::HttpFetcher;

/// List filters for one search URL, keyed by semantic filter name
pub type ListFilters = BTreeMap<String, FilterSpec>;

static LIST_FILTER_CACHE: Lazy<Mutex<HashMap<String, Arc<OnceCell<ListFilters>>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Get the list filters for `url`, fetching them on first access
///
/// A failed fetch caches an empty table: the provider page being
/// unreachable degrades list-filter resolution for the run rather than
/// hammering the URL on every request.
pub async fn get_list_filters(fetcher: &HttpFetcher, url: &str) -> ListFilters {
    let cell = {
        let mut cache = LIST_FILTER_CACHE.lock().await;
        Arc::clone(cache.entry(url.to_string()).or_default())
    };

    cell.get_or_init(|| async {
        match fetcher.plain_fetch(url, &[]).await {
            Some(html) => {
                let filters = parse_list_filters(&html);
                debug!("cached {} list filters for {url}", filters.len());
                filters
            }
            None => {
                warn!("could not fetch list filters from {url}");
                ListFilters::new()
            }
        }
    })
    .await
    .clone()
}

/// Parse every selectable filter control on a search page
///
/// Each control is a `search-attribute` block whose `data-attr` names the
/// filter; its labels pair an option's display text with the input's
/// provider-encoded value.
pub(crate) fn parse_list_filters(html: &str) -> ListFilters {
    static BLOCK: Lazy<Selector> =
        Lazy::new(|| Selector::parse("div.search-attribute").expect("static selector"));
    static LABEL: Lazy<Selector> =
        Lazy::new(|| Selector::parse("label").expect("static selector"));
    static INPUT: Lazy<Selector> =
        Lazy::new(|| Selector::parse("input").expect("static selector"));

    let document = Html::parse_document(html);
    let mut filters = ListFilters::new();

    for block in document.select(&BLOCK) {
        let Some(key) = block.value().attr("data-attr") else {
            continue;
        };

        let mut options = BTreeMap::new();
        for label in block.select(&LABEL) {
            let Some(value) = label
                .select(&INPUT)
                .next()
                .and_then(|input| input.value().attr("value"))
            else {
                continue;
            };
            let name = label.text().collect::<String>().trim().to_string();
            if !name.is_empty() {
                options.insert(name, value.to_string());
            }
        }

        filters.insert(
            key.to_string(),
            FilterSpec {
                url_key: key.to_string(),
                kind: FilterKind::Options(options),
                attr_marker: None,
            },
        );
    }

    filters
}
