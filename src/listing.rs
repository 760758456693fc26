//! Listing record types
//!
//! `Listing` is the summary record produced by the row parser and mutated
//! by the enrichment pipeline and the geotagging workers. Once handed to
//! the caller it is never touched again by this crate.

use serde::{Deserialize, Serialize};

/// Source tag attached to every record produced by this crate
pub const SOURCE_TAG: &str = "craigslist";

/// Latitude/longitude pair extracted from a listing's map element
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geotag {
    pub latitude: f64,
    pub longitude: f64,
}

/// Detail-page fields attached to a listing on enrichment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListingDetails {
    /// Posting body text
    pub body: String,
    /// Image URLs, thumbnail tokens upgraded to the larger size
    pub images: Vec<String>,
    /// Raw attribute strings as shown on the posting
    pub attrs: Vec<String>,
    /// Structured attributes derived from the raw strings
    pub parsed_attrs: Vec<(String, String)>,
    /// Postal address, when the posting includes one
    pub address: Option<String>,
    /// Revealed contact email
    pub email: Option<String>,
    /// Revealed contact phone number
    pub phone: Option<String>,
}

/// One search-result listing
///
/// In very few cases a posting is included in the result list but has
/// already been deleted (or is deleted after the list was retrieved). The
/// `deleted` flag is set during enrichment when the detail page carries no
/// body section; careful callers should check it before using a record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    /// Source tag for callers aggregating multiple providers
    pub source: String,
    /// Provider-assigned identifier, unique per listing
    pub id: String,
    /// Identifier of the original posting when this is a repost
    pub repost_of: Option<String>,
    /// Listing title
    pub title: Option<String>,
    /// Canonical listing URL
    pub url: String,
    /// Raw price text, e.g. "$1,250"
    pub price: Option<String>,
    /// Location text from the row's meta line
    pub location: Option<String>,
    /// Whether the row advertised at least one image
    pub has_image: bool,
    /// Deleted-posting signal (see type docs)
    pub deleted: bool,
    /// Geolocation, populated by enrichment or the geotagging pool
    pub geotag: Option<Geotag>,
    /// Creation time at minute precision, e.g. "2023-01-01 10:30"
    pub created: Option<String>,
    /// Last-updated time in the same format
    pub last_updated: Option<String>,
    /// Detail-page fields, present after enrichment with details
    pub details: Option<ListingDetails>,
}

impl Listing {
    /// Summary record with only identifier and URL set
    #[must_use]
    pub fn new(id: String, url: String) -> Self {
        Self {
            source: SOURCE_TAG.to_string(),
            id,
            repost_of: None,
            title: None,
            url,
            price: None,
            location: None,
            has_image: false,
            deleted: false,
            geotag: None,
            created: None,
            last_updated: None,
            details: None,
        }
    }

    /// Numeric price with the currency symbol and thousands separators
    /// stripped. `None` when the row carried no price or the text does not
    /// parse.
    #[must_use]
    pub fn price_value(&self) -> Option<f64> {
        let raw = self.price.as_deref()?;
        let cleaned: String = raw
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        if cleaned.is_empty() {
            return None;
        }
        cleaned.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_value_strips_currency_and_separators() {
        let mut listing = Listing::new("1".into(), "https://example.org/1".into());
        listing.price = Some("$1,250".to_string());
        assert_eq!(listing.price_value(), Some(1250.0));

        listing.price = Some("$30,000.50".to_string());
        assert_eq!(listing.price_value(), Some(30000.50));

        listing.price = Some("free".to_string());
        assert_eq!(listing.price_value(), None);

        listing.price = None;
        assert_eq!(listing.price_value(), None);
    }

    #[test]
    fn listing_serializes_to_flat_record() {
        let mut listing = Listing::new("7309812".into(), "https://example.org/7309812".into());
        listing.title = Some("apple macbook".to_string());
        let json = serde_json::to_value(&listing).expect("serializable");
        assert_eq!(json["source"], "craigslist");
        assert_eq!(json["id"], "7309812");
        assert_eq!(json["deleted"], false);
    }
}
