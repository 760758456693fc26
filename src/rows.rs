//! Result-row parser
//!
//! Converts one search-result row into a summary `Listing`. Layout spacer
//! rows produce no record. Every other extraction is best-effort: a missing
//! sub-element leaves the field unset rather than failing the row.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Selector};
use tracing::debug;
use url::Url;

use crate::listing::Listing;

static SPACER: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.gallery-card.spacer").expect("static selector"));
static MAIN_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a.main").expect("static selector"));
static PRICE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("span.priceinfo").expect("static selector"));
static DOTS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.dots").expect("static selector"));
static META: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.meta").expect("static selector"));

/// Parse one result row into a summary record
///
/// Returns `None` for layout spacers and for rows with no listing
/// identifier (which the provider only emits for non-listing content).
/// Relative hrefs are resolved against `base_url`.
#[must_use]
pub fn parse_row(row: ElementRef<'_>, base_url: &str) -> Option<Listing> {
    if row.select(&SPACER).next().is_some() {
        debug!("found a spacer, skipping");
        return None;
    }

    let id = row.value().attr("data-pid")?.to_string();

    let href = row
        .select(&MAIN_LINK)
        .next()
        .and_then(|link| link.value().attr("href"))?;
    let url = match Url::parse(base_url).and_then(|base| base.join(href)) {
        Ok(joined) => joined.to_string(),
        Err(_) => href.to_string(),
    };

    let mut listing = Listing::new(id, url);
    listing.repost_of = row.value().attr("data-repost-of").map(str::to_string);
    listing.title = row.value().attr("title").map(str::to_string);
    listing.price = row
        .select(&PRICE)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string());
    listing.has_image = row.select(&DOTS).next().is_some();

    // Location is the last middot-separated segment of the meta line.
    listing.location = row.select(&META).next().and_then(|meta| {
        let text = meta.text().collect::<String>();
        text.rsplit('\u{b7}')
            .next()
            .map(|loc| loc.trim().to_string())
            .filter(|loc| !loc.is_empty())
    });

    Some(listing)
}
