//! Application layer
//!
//! Drives the crawl session: fetch, classification, extraction, image
//! validation and handoff to the batch upsert engine.

pub mod crawler;

pub use crawler::{CrawlSession, CrawlStats, RenderedLinkProvider};
