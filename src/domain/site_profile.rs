//! Per-session crawl configuration
//!
//! A `SiteProfile` is supplied read-only by the surrounding application
//! before a crawl starts: CSS selectors for the detail page, URL patterns
//! for article-number extraction, the EAN field priority for structured
//! metadata, and the fetch strategy for the listing page.

use serde::{Deserialize, Serialize};

/// How the listing page is turned into detail-page links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStrategy {
    /// Fetch the listing over plain HTTP and follow in-document anchors.
    InDocument,
    /// Delegate to the external browser-automation collaborator, which
    /// returns a fully rendered link list; detail pages are then fetched
    /// over plain HTTP.
    RenderedList,
}

/// Where structured metadata gets the article number from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "source")]
pub enum ArticleNumberSource {
    /// A dedicated identifier field, e.g. `productID` or `sku`.
    Field { name: String },
    /// A regex applied to a URL-bearing metadata field, e.g. digits in
    /// the canonical `url` value. The first capture group is taken.
    UrlField { field: String, pattern: String },
}

/// CSS selectors for the selector-based extractor on detail pages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetailSelectors {
    pub name: Option<String>,
    pub price: Option<String>,
    pub description: Option<String>,
    pub material: Option<String>,
    pub category: Option<String>,
    pub image: Option<String>,
    pub color: Option<String>,
}

/// Which extraction sources are enabled for the site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFlags {
    pub metadata: bool,
    pub selectors: bool,
    pub url_pattern: bool,
}

impl Default for SourceFlags {
    fn default() -> Self {
        Self {
            metadata: true,
            selectors: true,
            url_pattern: true,
        }
    }
}

/// Rewrite applied to image candidates before validation. Structured
/// metadata often points at access-restricted origin-CDN hosts while the
/// same assets are served through a public-facing path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CdnRewrite {
    pub from_prefix: String,
    pub to_prefix: String,
}

/// Read-only crawl configuration for one target site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteProfile {
    pub name: String,
    /// Base URL for resolving relative links.
    pub base_url: String,
    /// The listing page a crawl session starts from.
    pub listing_url: String,
    /// Substring identifying detail-page URLs (drives the page classifier).
    pub detail_url_marker: String,
    pub selectors: DetailSelectors,
    /// Metadata field names probed for an EAN, most specific first,
    /// e.g. `["gtin13", "gtin", "sku"]`. Empty means EAN stays unset.
    pub ean_field_priority: Vec<String>,
    pub article_number_source: ArticleNumberSource,
    /// Ordered regexes applied to the detail-page URL, most specific first.
    /// Empty means the built-in default pattern set is used.
    pub article_number_patterns: Vec<String>,
    /// Brand-specific selector tried when no URL pattern matched.
    pub article_number_fallback_selector: Option<String>,
    pub cdn_rewrite: Option<CdnRewrite>,
    pub fetch_strategy: FetchStrategy,
    pub sources: SourceFlags,
    /// Cooperative delay between successive detail-page fetches.
    pub request_delay_ms: u64,
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            base_url: "https://example.com".to_string(),
            listing_url: "https://example.com/products".to_string(),
            detail_url_marker: "/p/".to_string(),
            selectors: DetailSelectors::default(),
            ean_field_priority: vec![
                "gtin13".to_string(),
                "gtin".to_string(),
            ],
            article_number_source: ArticleNumberSource::Field {
                name: "productID".to_string(),
            },
            article_number_patterns: Vec::new(),
            article_number_fallback_selector: None,
            cdn_rewrite: None,
            fetch_strategy: FetchStrategy::InDocument,
            sources: SourceFlags::default(),
            request_delay_ms: 300,
        }
    }
}
