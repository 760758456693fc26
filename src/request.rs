//! Search request types
//!
//! A `SearchRequest` is the caller-owned, read-only description of one
//! search: free-text query, price bounds, postal code, radius, presence
//! flags, sort preference, and a pagination cursor. Category-specific
//! filters ride along in the `extra` map and are resolved against the
//! provider's filter tables by the filter model.

use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::ScrapeError;

/// Sort preference accepted by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Most recently posted first
    #[default]
    Newest,
    /// Lowest price first
    PriceAsc,
    /// Highest price first
    PriceDesc,
}

impl SortKey {
    /// Provider-encoded value for the `sort` parameter
    #[must_use]
    pub fn provider_code(&self) -> &'static str {
        match self {
            Self::Newest => "date",
            Self::PriceAsc => "priceasc",
            Self::PriceDesc => "pricedsc",
        }
    }
}

impl FromStr for SortKey {
    type Err = ScrapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "newest" => Ok(Self::Newest),
            "price_asc" => Ok(Self::PriceAsc),
            "price_desc" => Ok(Self::PriceDesc),
            other => Err(ScrapeError::InvalidSortKey(other.to_string())),
        }
    }
}

/// Caller-supplied value for one semantic filter key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterInput {
    /// Raw value passed through under the provider key
    Value(String),
    /// Boolean switch; literal-valued filters are emitted only when true
    Flag(bool),
    /// One or more option names resolved against a list filter
    Options(Vec<String>),
}

impl FilterInput {
    /// Whether this input should trigger a literal-valued filter
    pub(crate) fn is_truthy(&self) -> bool {
        match self {
            Self::Value(v) => !v.is_empty(),
            Self::Flag(b) => *b,
            Self::Options(opts) => !opts.is_empty(),
        }
    }

    /// The raw values carried by this input, for pass-through filters
    pub(crate) fn raw_values(&self) -> Vec<String> {
        match self {
            Self::Value(v) => vec![v.clone()],
            Self::Flag(true) => vec!["1".to_string()],
            Self::Flag(false) => Vec::new(),
            Self::Options(opts) => opts.clone(),
        }
    }

    /// The option names carried by this input, for list filters
    pub(crate) fn option_names(&self) -> Vec<String> {
        match self {
            Self::Value(v) => vec![v.clone()],
            Self::Flag(_) => Vec::new(),
            Self::Options(opts) => opts.clone(),
        }
    }
}

/// One marketplace search, immutable once constructed
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    /// Free-text query
    pub query: Option<String>,
    /// Price floor
    pub min_price: Option<u64>,
    /// Price ceiling
    pub max_price: Option<u64>,
    /// Postal code anchoring the radius search
    pub zip_code: Option<String>,
    /// Search radius in miles
    pub search_distance: Option<u32>,
    /// Only listings with at least one image
    pub has_image: bool,
    /// Only listings posted today
    pub posted_today: bool,
    /// Collapse duplicate postings into bundles
    pub bundle_duplicates: bool,
    /// Match the query against titles only
    pub search_titles: bool,
    /// Sort preference
    pub sort: SortKey,
    /// Pagination cursor (result offset to start from)
    pub start: u64,
    /// Category-specific semantic filters resolved against the category
    /// override table or the dynamically fetched list filters
    pub extra: BTreeMap<String, FilterInput>,
}

impl SearchRequest {
    /// Request with only a free-text query set
    #[must_use]
    pub fn query(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Self::default()
        }
    }

    /// All semantic key/value pairs present in this request, in the order
    /// the filter model should resolve them.
    pub(crate) fn semantic_pairs(&self) -> Vec<(String, FilterInput)> {
        let mut pairs = Vec::new();
        if let Some(q) = &self.query {
            pairs.push(("query".to_string(), FilterInput::Value(q.clone())));
        }
        if let Some(min) = self.min_price {
            pairs.push(("min_price".to_string(), FilterInput::Value(min.to_string())));
        }
        if let Some(max) = self.max_price {
            pairs.push(("max_price".to_string(), FilterInput::Value(max.to_string())));
        }
        if let Some(zip) = &self.zip_code {
            pairs.push(("zip_code".to_string(), FilterInput::Value(zip.clone())));
        }
        if let Some(distance) = self.search_distance {
            pairs.push((
                "search_distance".to_string(),
                FilterInput::Value(distance.to_string()),
            ));
        }
        pairs.push(("has_image".to_string(), FilterInput::Flag(self.has_image)));
        pairs.push((
            "posted_today".to_string(),
            FilterInput::Flag(self.posted_today),
        ));
        pairs.push((
            "bundle_duplicates".to_string(),
            FilterInput::Flag(self.bundle_duplicates),
        ));
        pairs.push((
            "search_titles".to_string(),
            FilterInput::Flag(self.search_titles),
        ));
        for (key, value) in &self.extra {
            pairs.push((key.clone(), value.clone()));
        }
        pairs
    }
}
