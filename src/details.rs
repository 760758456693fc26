//! Detail-page parsing for the enrichment pipeline
//!
//! Everything here is synchronous: the enrichment pipeline fetches the page
//! text, parses it in one pass through `parse_detail_page`, and drops the
//! document before any further awaits. A missing body section is the
//! authoritative deleted-posting signal and short-circuits the rest.

use chrono::DateTime;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Node, Selector};

use crate::filters::{FilterKind, FilterSpec, ListFilters};
use crate::listing::Geotag;
use std::collections::BTreeMap;

/// Thumbnail-size token in image URLs, upgraded on extraction
const THUMB_TOKEN: &str = "50x50c";
/// Replacement size token
const FULL_TOKEN: &str = "600x450";

static POSTING_BODY: Lazy<Selector> =
    Lazy::new(|| Selector::parse("section#postingbody").expect("static selector"));
static POSTING_INFOS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.postinginfos p").expect("static selector"));
static TIME_EL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("time").expect("static selector"));
static IMG: Lazy<Selector> = Lazy::new(|| Selector::parse("img").expect("static selector"));
static ATTR_SPAN: Lazy<Selector> =
    Lazy::new(|| Selector::parse("p.attrgroup span").expect("static selector"));
static MAP_ADDRESS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.mapaddress").expect("static selector"));
static MAP: Lazy<Selector> = Lazy::new(|| Selector::parse("#map").expect("static selector"));

/// Everything extractable from one detail page in a single parse
#[derive(Debug, Default)]
pub(crate) struct DetailPage {
    /// True when the page carries no body section
    pub deleted: bool,
    pub body: Option<String>,
    pub created: Option<String>,
    pub images: Vec<String>,
    pub attrs: Vec<String>,
    pub address: Option<String>,
    pub geotag: Option<Geotag>,
}

/// Parse a detail page into its extractable fields
pub(crate) fn parse_detail_page(html: &str) -> DetailPage {
    let document = Html::parse_document(html);
    let mut page = DetailPage::default();

    let Some(body) = document.select(&POSTING_BODY).next() else {
        page.deleted = true;
        return page;
    };

    page.body = Some(body_text(body));
    page.created = created_time(&document);
    page.images = image_urls(&document);
    page.attrs = document
        .select(&ATTR_SPAN)
        .map(|span| span.text().collect::<String>().trim().to_string())
        .filter(|attr| !attr.is_empty())
        .collect();
    page.address = document
        .select(&MAP_ADDRESS)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string());
    page.geotag = geotag_from(&document);

    page
}

/// Geotag-only parse used by the worker pool
pub(crate) fn parse_geotag(html: &str) -> Option<Geotag> {
    let document = Html::parse_document(html);
    geotag_from(&document)
}

/// Body text is the concatenation of the section's non-nested content:
/// direct text nodes plus attribute-less child elements. Decorated children
/// (the "QR Code Link to This Post" block and friends) are skipped.
fn body_text(body: ElementRef<'_>) -> String {
    let mut out = String::new();
    for child in body.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) if el.attrs().next().is_none() => {
                if let Some(element) = ElementRef::wrap(child) {
                    for text in element.text() {
                        out.push_str(text);
                    }
                }
            }
            _ => {}
        }
    }
    out.trim().to_string()
}

/// Creation time from the posting-info block's "posted" row, normalized to
/// the same `YYYY-MM-DD HH:MM` shape the provider uses for last-updated.
fn created_time(document: &Html) -> Option<String> {
    for info in document.select(&POSTING_INFOS) {
        let text = info.text().collect::<String>();
        if !text.contains("posted") {
            continue;
        }
        if let Some(datetime) = info
            .select(&TIME_EL)
            .next()
            .and_then(|time| time.value().attr("datetime"))
        {
            return Some(normalize_created(datetime));
        }
    }
    None
}

/// Drop sub-minute precision and the timezone from an ISO-ish timestamp,
/// normalizing the date/time separator to a space.
pub(crate) fn normalize_created(datetime: &str) -> String {
    let parsed = DateTime::parse_from_rfc3339(datetime)
        .or_else(|_| DateTime::parse_from_str(datetime, "%Y-%m-%dT%H:%M:%S%z"));
    if let Ok(parsed) = parsed {
        return parsed.format("%Y-%m-%d %H:%M").to_string();
    }

    // Fallback string transform for values chrono cannot parse.
    let spaced = datetime.replace('T', " ");
    match spaced.match_indices(':').nth(1) {
        Some((idx, _)) => spaced[..idx].to_string(),
        None => spaced,
    }
}

/// Image URLs with the thumbnail token upgraded. When more than one image
/// is present the first is dropped: it duplicates the primary photo that
/// already appeared in the summary row.
fn image_urls(document: &Html) -> Vec<String> {
    let srcs: Vec<&str> = document
        .select(&IMG)
        .filter_map(|img| img.value().attr("src"))
        .collect();
    let skip = usize::from(srcs.len() > 1);
    srcs.into_iter()
        .skip(skip)
        .map(|src| src.replace(THUMB_TOKEN, FULL_TOKEN))
        .collect()
}

fn geotag_from(document: &Html) -> Option<Geotag> {
    let map = document.select(&MAP).next()?;
    let latitude: f64 = map.value().attr("data-latitude")?.parse().ok()?;
    let longitude: f64 = map.value().attr("data-longitude")?.parse().ok()?;
    Some(Geotag {
        latitude,
        longitude,
    })
}

/// Derive structured attributes from the raw attribute strings
///
/// Binary filters match when their marker string appears among the
/// lowercased attributes. List-filter values are sometimes shown as
/// "{filter}: {value}" and sometimes as just "{value}"; stripping the
/// prefix before the colon reduces both to one case. First match wins per
/// filter key.
pub(crate) fn parse_structured_attrs(
    attrs: &[String],
    category_table: &BTreeMap<String, FilterSpec>,
    list_filters: &ListFilters,
) -> Vec<(String, String)> {
    let mut parsed = Vec::new();

    let lowercased: Vec<String> = attrs.iter().map(|attr| attr.to_lowercase()).collect();
    for (key, spec) in category_table {
        let Some(marker) = &spec.attr_marker else {
            continue;
        };
        if lowercased.iter().any(|attr| attr == marker) {
            parsed.push((key.clone(), "true".to_string()));
        }
    }

    let after_colon: Vec<&str> = attrs
        .iter()
        .map(|attr| attr.splitn(2, ": ").last().unwrap_or(attr.as_str()))
        .collect();
    for (key, spec) in list_filters {
        let FilterKind::Options(options) = &spec.kind else {
            continue;
        };
        for option in options.keys() {
            if after_colon.iter().any(|attr| attr == option) {
                parsed.push((key.clone(), option.clone()));
                break;
            }
        }
    }

    parsed
}
