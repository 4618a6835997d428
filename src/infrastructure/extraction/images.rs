//! Image discovery and network validation
//!
//! Structured metadata often points at access-restricted origin-CDN URLs
//! while the page carries the same images behind a public-facing path,
//! sometimes with a differently zero-padded identifier suffix. Discovery
//! scans the whole document for candidates matching the article number;
//! validation issues concurrent HEAD checks and keeps what responds.

use std::sync::Arc;

use futures::future::join_all;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use tracing::{debug, warn};
use url::Url;

use crate::domain::site_profile::CdnRewrite;
use crate::infrastructure::http_client::HttpClient;

const IMAGE_EXTENSIONS: [&str; 5] = [".jpg", ".jpeg", ".png", ".webp", ".avif"];

/// Article numbers shaped `<digits>-<1-2 digits>` also appear with the
/// suffix zero-padded to three digits (a site convention).
static PADDED_SUFFIX_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)-(\d{1,2})$").expect("static pattern"));

static STYLE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"url\(\s*['"]?([^'")\s]+)['"]?\s*\)"#).expect("static pattern"));

/// Search patterns for an article number: the literal identifier plus the
/// zero-padded variant when the suffix shape applies.
pub fn generate_patterns(article_number: &str) -> Vec<String> {
    let mut patterns = vec![article_number.to_string()];
    if let Some(captures) = PADDED_SUFFIX_SHAPE.captures(article_number) {
        let padded = format!("{}-{:0>3}", &captures[1], &captures[2]);
        if padded != article_number {
            patterns.push(padded);
        }
    }
    patterns
}

/// Discovers image-URL candidates on a page and validates them over the
/// network.
pub struct ImageValidator {
    http: Arc<HttpClient>,
    cdn_rewrite: Option<CdnRewrite>,
}

impl ImageValidator {
    pub fn new(http: Arc<HttpClient>, cdn_rewrite: Option<CdnRewrite>) -> Self {
        Self { http, cdn_rewrite }
    }

    /// Validated image URLs for the article number found on the page.
    /// Order is not guaranteed to match document order; downstream numbers
    /// images by arrival order.
    pub async fn find_valid_image_urls(
        &self,
        document: &Html,
        article_number: &str,
        page_url: &str,
    ) -> Vec<String> {
        let candidates = discover_candidates(document, article_number);
        if candidates.is_empty() {
            return Vec::new();
        }
        debug!(
            "Validating {} image candidates for article {}",
            candidates.len(),
            article_number
        );

        let resolved: Vec<String> = candidates
            .iter()
            .filter_map(|candidate| self.resolve(candidate, page_url))
            .collect();

        // All candidates for one page validate in parallel; the sets are
        // small, bounded by realistic product photo counts.
        let checks = resolved.iter().map(|url| self.http.head_ok(url));
        let results = join_all(checks).await;

        let valid: Vec<String> = resolved
            .into_iter()
            .zip(results)
            .filter_map(|(url, ok)| ok.then_some(url))
            .collect();

        if valid.is_empty() {
            warn!("No image candidate validated for article {}", article_number);
        }
        valid
    }

    /// Absolute URL with the site's CDN-to-public rewrite applied.
    fn resolve(&self, candidate: &str, page_url: &str) -> Option<String> {
        let base = Url::parse(page_url).ok()?;
        let absolute = base.join(candidate).ok()?.to_string();
        Some(match &self.cdn_rewrite {
            Some(rewrite) if absolute.starts_with(&rewrite.from_prefix) => {
                format!("{}{}", rewrite.to_prefix, &absolute[rewrite.from_prefix.len()..])
            }
            _ => absolute,
        })
    }
}

/// De-duplicated candidate set, first-seen order: every image-bearing
/// element attribute, every inline style and every `data-*` attribute whose
/// value ends in an image extension and contains a generated pattern.
pub fn discover_candidates(document: &Html, article_number: &str) -> Vec<String> {
    let patterns = generate_patterns(article_number);
    let mut candidates: Vec<String> = Vec::new();

    let mut consider = |value: &str, candidates: &mut Vec<String>| {
        let value = value.trim();
        if is_image_url(value)
            && patterns.iter().any(|p| value.contains(p.as_str()))
            && !candidates.iter().any(|c| c == value)
        {
            candidates.push(value.to_string());
        }
    };

    for node in document.tree.nodes() {
        let Some(element) = node.value().as_element() else {
            continue;
        };
        for (name, value) in element.attrs() {
            if name == "style" {
                for captures in STYLE_URL.captures_iter(value) {
                    if let Some(group) = captures.get(1) {
                        consider(group.as_str(), &mut candidates);
                    }
                }
            } else if element.name() == "img" || name.starts_with("data-") {
                for part in value.split(',') {
                    if let Some(url) = part.split_whitespace().next() {
                        consider(url, &mut candidates);
                    }
                }
            }
        }
    }

    candidates
}

fn is_image_url(value: &str) -> bool {
    let path = value.split(['?', '#']).next().unwrap_or(value).to_ascii_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}
