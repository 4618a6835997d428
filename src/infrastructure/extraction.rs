//! Field extraction for product detail pages
//!
//! Three independent extraction sources (structured metadata, profile
//! selectors, URL patterns) plus image discovery and the page classifier.
//! Extractors degrade to empty results instead of erroring: a field one
//! source cannot find is filled by the next source in the merge order
//! (metadata, then selectors, then URL patterns).

pub mod classifier;
pub mod error;
pub mod images;
pub mod metadata;
pub mod price;
pub mod selectors;
pub mod url_pattern;

pub use classifier::{classify, PageKind};
pub use error::{ExtractionError, ExtractionResult};
pub use images::ImageValidator;
pub use metadata::MetadataExtractor;
pub use price::parse_price;
pub use selectors::SelectorExtractor;
pub use url_pattern::UrlPatternExtractor;
