//! Structured metadata extraction (JSON-LD product blocks)
//!
//! Most authoritative extraction source, run first in the merge order.
//! Scans every `application/ld+json` script for an object typed `Product`;
//! the first match wins and scanning stops, because pages routinely carry
//! breadcrumb and organization blocks ahead of the product block. Malformed
//! blocks are skipped with a warning; the extractor never errors and
//! degrades to an empty record.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::{debug, warn};

use super::error::{ExtractionError, ExtractionResult};
use super::price::parse_price;
use crate::domain::product::ProductRecord;
use crate::domain::site_profile::{ArticleNumberSource, SiteProfile};

static LD_JSON_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#).expect("static selector")
});

/// Extractor over the embedded JSON-LD blocks of a detail page.
pub struct MetadataExtractor {
    ean_field_priority: Vec<String>,
    article_number_source: ArticleNumberSource,
    url_field_pattern: Option<Regex>,
}

impl MetadataExtractor {
    pub fn from_profile(profile: &SiteProfile) -> ExtractionResult<Self> {
        let url_field_pattern = match &profile.article_number_source {
            ArticleNumberSource::UrlField { pattern, .. } => Some(
                Regex::new(pattern)
                    .map_err(|e| ExtractionError::invalid_pattern(pattern, e))?,
            ),
            ArticleNumberSource::Field { .. } => None,
        };

        Ok(Self {
            ean_field_priority: profile.ean_field_priority.clone(),
            article_number_source: profile.article_number_source.clone(),
            url_field_pattern,
        })
    }

    /// Extract whatever the first Product-typed block supplies. Missing
    /// fields stay unset and fall through to the next source.
    pub fn extract(&self, document: &Html, source_url: &str) -> ProductRecord {
        let mut record = ProductRecord::new(source_url);

        let Some(product) = self.first_product_block(document) else {
            debug!("No Product-typed structured data block found on {}", source_url);
            return record;
        };

        record.name = string_field(&product, "name");
        record.description = string_field(&product, "description");
        record.material = string_field(&product, "material");
        record.category = string_field(&product, "category");

        // An explicit JSON null means "this product has no color", which
        // must not be filled in by later sources.
        match product.get("color") {
            Some(Value::Null) => record.color_locked = true,
            _ => record.color_id = string_field(&product, "color"),
        }

        if let Some(image) = product.get("image") {
            record.image_urls = unwrap_image_field(image);
        }

        record.price = product.get("offers").and_then(extract_offer_price);
        record.ean = self.probe_ean_fields(&product);

        if let Some(article_number) = self.extract_article_number(&product) {
            record.article_number = article_number;
        }

        record
    }

    /// First Product-typed object across all JSON-LD blocks, in document
    /// order. Later Product blocks never override an earlier one.
    fn first_product_block(&self, document: &Html) -> Option<Value> {
        for script in document.select(&LD_JSON_SELECTOR) {
            let raw = script.text().collect::<String>();
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                continue;
            }

            let parsed: Value = match serde_json::from_str(trimmed) {
                Ok(value) => value,
                Err(e) => {
                    warn!("Skipping malformed structured data block: {}", e);
                    continue;
                }
            };

            if let Some(product) = find_product(&parsed) {
                return Some(product.clone());
            }
        }
        None
    }

    /// First configured EAN field present with a non-empty value. Absence
    /// of all configured fields leaves the EAN unset, never inferred.
    fn probe_ean_fields(&self, product: &Value) -> Option<String> {
        for field in &self.ean_field_priority {
            let Some(value) = product.get(field) else {
                continue;
            };
            if let Some(text) = scalar_as_string(value) {
                if !text.is_empty() {
                    return Some(text);
                }
            }
        }
        None
    }

    fn extract_article_number(&self, product: &Value) -> Option<String> {
        match &self.article_number_source {
            ArticleNumberSource::Field { name } => {
                scalar_as_string(product.get(name)?).filter(|v| !v.trim().is_empty())
            }
            ArticleNumberSource::UrlField { field, .. } => {
                let url_value = scalar_as_string(product.get(field)?)?;
                let pattern = self.url_field_pattern.as_ref()?;
                pattern
                    .captures(&url_value)
                    .and_then(|c| c.get(1))
                    .map(|g| g.as_str().to_string())
            }
        }
    }
}

/// Recursive search for the first object whose `@type` is `Product`,
/// looking through top-level arrays and `@graph` containers.
fn find_product(value: &Value) -> Option<&Value> {
    match value {
        Value::Object(map) => {
            if type_is_product(map.get("@type")) {
                return Some(value);
            }
            map.get("@graph").and_then(find_product)
        }
        Value::Array(items) => items.iter().find_map(find_product),
        _ => None,
    }
}

fn type_is_product(type_value: Option<&Value>) -> bool {
    match type_value {
        Some(Value::String(s)) => s == "Product",
        Some(Value::Array(items)) => items
            .iter()
            .any(|v| v.as_str().is_some_and(|s| s == "Product")),
        _ => false,
    }
}

fn string_field(object: &Value, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn scalar_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// The `image` field appears as a single string, an array of strings or
/// objects, or a single object; all variants unwrap to a flat ordered list
/// resolved once here, so downstream code never re-inspects raw shape.
fn unwrap_image_field(image: &Value) -> Vec<String> {
    match image {
        Value::String(s) if !s.trim().is_empty() => vec![s.trim().to_string()],
        Value::Array(items) => items.iter().filter_map(image_object_url).collect(),
        Value::Object(_) => image_object_url(image).into_iter().collect(),
        _ => Vec::new(),
    }
}

fn image_object_url(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Object(map) => map
            .get("url")
            .or_else(|| map.get("contentUrl"))
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        _ => None,
    }
}

/// Price from the nested offer object; `offers` may be a single object or
/// an array, and `price` a JSON number or a numeric string.
fn extract_offer_price(offers: &Value) -> Option<f64> {
    let offer = match offers {
        Value::Array(items) => items.first()?,
        other => other,
    };

    match offer.get("price")? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_price(s),
        _ => None,
    }
}
