//! Domain types for the crawl-and-extract pipeline
//!
//! Contains the canonical product record with its merge rules and the
//! per-session site profile configuration.

pub mod product;
pub mod site_profile;

pub use product::{ImageAsset, PersistedProduct, ProductRecord};
pub use site_profile::{
    ArticleNumberSource, CdnRewrite, DetailSelectors, FetchStrategy, SiteProfile, SourceFlags,
};
