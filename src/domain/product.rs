//! Canonical product record and merge rules
//!
//! `ProductRecord` is the mutable accumulator the extraction pipeline fills
//! in while walking a detail page; `PersistedProduct` and `ImageAsset` are
//! the storage-side entities the batch upsert engine writes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Product data accumulated from the extraction sources of one detail page.
///
/// An empty `article_number` means "not found yet"; the orchestrator drops
/// records that still lack one after all sources ran. The composite key
/// `(article_number, color_id)` identifies a stored product, where an absent
/// `color_id` is its own key value rather than a wildcard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub article_number: String,
    /// External retail barcode. Only set when a source explicitly supplies a
    /// barcode-typed field; never defaulted from `article_number`.
    pub ean: Option<String>,
    pub color_id: Option<String>,
    /// Set when structured metadata reported color as an explicit null.
    /// A locked color is "known absent" and must not be filled by later
    /// sources.
    pub color_locked: bool,
    pub name: Option<String>,
    pub description: Option<String>,
    pub material: Option<String>,
    pub category: Option<String>,
    /// Currency-less numeric amount.
    pub price: Option<f64>,
    /// Insertion order is display order; the first entry is primary.
    pub image_urls: Vec<String>,
    pub source_url: String,
}

impl ProductRecord {
    /// Create an empty record for the given product page.
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            ..Self::default()
        }
    }

    /// True once an article number has been extracted.
    pub fn has_article_number(&self) -> bool {
        !self.article_number.trim().is_empty()
    }

    /// Fill-only-missing merge: every scalar field that is still null/empty
    /// takes the value from `secondary`; populated fields are never
    /// overwritten. The image list is replaced wholesale by `secondary`'s
    /// list only when this record has none (the first source to report any
    /// image wins the whole list).
    pub fn merge_from(&mut self, secondary: ProductRecord) {
        if !self.has_article_number() && !secondary.article_number.trim().is_empty() {
            self.article_number = secondary.article_number;
        }
        fill_missing(&mut self.ean, secondary.ean);
        if !self.color_locked {
            fill_missing(&mut self.color_id, secondary.color_id);
        }
        self.color_locked |= secondary.color_locked;
        fill_missing(&mut self.name, secondary.name);
        fill_missing(&mut self.description, secondary.description);
        fill_missing(&mut self.material, secondary.material);
        fill_missing(&mut self.category, secondary.category);
        if self.price.is_none() {
            self.price = secondary.price;
        }
        if self.image_urls.is_empty() {
            self.image_urls = secondary.image_urls;
        }
        if self.source_url.is_empty() {
            self.source_url = secondary.source_url;
        }
    }
}

fn fill_missing(dst: &mut Option<String>, src: Option<String>) {
    let empty = dst.as_deref().map_or(true, |s| s.trim().is_empty());
    if empty {
        if let Some(value) = src.filter(|v| !v.trim().is_empty()) {
            *dst = Some(value);
        }
    }
}

/// Stored product entity, one row per `(article_number, color_id)`.
///
/// Created on the first successful upsert of a new key, fully replaced
/// (scalars and image set) on every later sighting, never deleted by the
/// pipeline itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedProduct {
    pub id: i64,
    pub article_number: String,
    pub ean: Option<String>,
    pub color_id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub material: Option<String>,
    pub category: Option<String>,
    pub price: Option<f64>,
    pub source_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub images: Vec<ImageAsset>,
}

/// Image attached to a persisted product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageAsset {
    pub url: String,
    /// Binary payload when downloaded; URL-only assets keep this empty.
    pub data: Option<Vec<u8>>,
    pub position: i32,
    pub is_primary: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_record() -> ProductRecord {
        ProductRecord {
            article_number: "9970239-5".to_string(),
            ean: Some("7325708333070".to_string()),
            color_id: Some("5".to_string()),
            color_locked: false,
            name: Some("Necessär i läder".to_string()),
            description: Some("Handgjord necessär".to_string()),
            material: Some("Läder".to_string()),
            category: Some("Accessoarer".to_string()),
            price: Some(1299.0),
            image_urls: vec!["https://example.com/a.jpg".to_string()],
            source_url: "https://example.com/p/9970239-5.html".to_string(),
        }
    }

    #[test]
    fn merge_never_overwrites_populated_fields() {
        let mut primary = full_record();
        let mut secondary = full_record();
        secondary.name = Some("Other name".to_string());
        secondary.price = Some(1.0);
        secondary.ean = Some("0000000000000".to_string());
        secondary.image_urls = vec!["https://example.com/other.jpg".to_string()];

        let expected = primary.clone();
        primary.merge_from(secondary);
        assert_eq!(primary, expected);
    }

    #[test]
    fn merge_fills_missing_scalars() {
        let mut primary = ProductRecord::new("https://example.com/p/1.html");
        primary.merge_from(full_record());
        assert_eq!(primary.article_number, "9970239-5");
        assert_eq!(primary.name.as_deref(), Some("Necessär i läder"));
        assert_eq!(primary.price, Some(1299.0));
        // source_url was already set and stays
        assert_eq!(primary.source_url, "https://example.com/p/1.html");
    }

    #[test]
    fn merge_treats_empty_string_as_missing() {
        let mut primary = full_record();
        primary.name = Some("  ".to_string());
        primary.merge_from(full_record());
        assert_eq!(primary.name.as_deref(), Some("Necessär i läder"));
    }

    #[test]
    fn image_list_wins_wholesale() {
        let mut primary = full_record();
        let mut secondary = full_record();
        secondary.image_urls = vec![
            "https://example.com/x.jpg".to_string(),
            "https://example.com/y.jpg".to_string(),
        ];
        primary.merge_from(secondary.clone());
        assert_eq!(primary.image_urls, vec!["https://example.com/a.jpg"]);

        primary.image_urls.clear();
        primary.merge_from(secondary.clone());
        assert_eq!(primary.image_urls, secondary.image_urls);
    }

    #[test]
    fn locked_color_is_not_filled() {
        let mut primary = ProductRecord::new("https://example.com/p/1.html");
        primary.color_locked = true;
        primary.merge_from(full_record());
        assert_eq!(primary.color_id, None);
        assert!(primary.color_locked);
    }

    #[test]
    fn ean_stays_unset_when_no_source_supplies_one() {
        let mut primary = ProductRecord::new("https://example.com/p/1.html");
        let mut secondary = full_record();
        secondary.ean = None;
        primary.merge_from(secondary);
        assert_eq!(primary.ean, None);
        assert_ne!(primary.ean.as_deref(), Some(primary.article_number.as_str()));
    }
}
