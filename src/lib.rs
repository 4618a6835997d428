//! catalog-crawler - crawl-and-extract pipeline for e-commerce product pages
//!
//! This library turns arbitrary e-commerce product pages into validated,
//! deduplicated product records and persists them in batched upserts. The
//! surrounding application (admin UI, auth, brand configuration storage) is
//! out of scope; it supplies a [`domain::site_profile::SiteProfile`] and
//! consumes per-flush statistics.

// Module declarations
pub mod application;
pub mod domain;
pub mod infrastructure;

// Re-export the main entry points for easier access
pub use application::crawler::{CrawlSession, CrawlStats, RenderedLinkProvider};
pub use domain::product::ProductRecord;
pub use domain::site_profile::SiteProfile;
