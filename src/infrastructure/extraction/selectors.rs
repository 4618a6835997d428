//! Selector-based HTML extraction
//!
//! Second source in the merge order. Stateless: returns whatever the
//! configured selectors find for the fields it is asked for; the
//! orchestrator only requests fields the metadata pass left empty, to avoid
//! redundant DOM queries.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use super::error::{ExtractionError, ExtractionResult};
use super::price::parse_price;
use crate::domain::product::ProductRecord;
use crate::domain::site_profile::{DetailSelectors, SiteProfile};

/// Lazy-load attributes checked after the direct `src`, in order.
const LAZY_ATTRIBUTES: [&str; 4] = ["data-src", "data-lazy-src", "data-original", "data-image"];

static SOURCE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("source[srcset]").expect("static selector"));

/// Which fields the caller wants extracted.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldRequest {
    pub name: bool,
    pub price: bool,
    pub description: bool,
    pub material: bool,
    pub category: bool,
    pub image: bool,
    pub color: bool,
}

impl FieldRequest {
    pub fn all() -> Self {
        Self {
            name: true,
            price: true,
            description: true,
            material: true,
            category: true,
            image: true,
            color: true,
        }
    }

    /// Request exactly the fields still missing from an accumulator record.
    pub fn missing_from(record: &ProductRecord) -> Self {
        Self {
            name: record.name.is_none(),
            price: record.price.is_none(),
            description: record.description.is_none(),
            material: record.material.is_none(),
            category: record.category.is_none(),
            image: record.image_urls.is_empty(),
            color: record.color_id.is_none() && !record.color_locked,
        }
    }
}

/// Extractor applying profile-configured CSS selectors to a detail page.
pub struct SelectorExtractor {
    name: Option<Selector>,
    price: Option<Selector>,
    description: Option<Selector>,
    material: Option<Selector>,
    category: Option<Selector>,
    image: Option<Selector>,
    color: Option<Selector>,
}

impl SelectorExtractor {
    pub fn from_profile(profile: &SiteProfile) -> ExtractionResult<Self> {
        let DetailSelectors {
            name,
            price,
            description,
            material,
            category,
            image,
            color,
        } = &profile.selectors;

        Ok(Self {
            name: compile(name)?,
            price: compile(price)?,
            description: compile(description)?,
            material: compile(material)?,
            category: compile(category)?,
            image: compile(image)?,
            color: compile(color)?,
        })
    }

    /// Extract the requested fields; anything not found stays unset.
    pub fn extract(&self, document: &Html, source_url: &str, request: FieldRequest) -> ProductRecord {
        let mut record = ProductRecord::new(source_url);

        if request.name {
            record.name = self.first_text(document, &self.name);
        }
        if request.description {
            record.description = self.first_text(document, &self.description);
        }
        if request.material {
            record.material = self.first_text(document, &self.material);
        }
        if request.category {
            record.category = self.first_text(document, &self.category);
        }
        if request.color {
            record.color_id = self.first_text(document, &self.color);
        }
        if request.price {
            record.price = self
                .first_text(document, &self.price)
                .and_then(|text| parse_price(&text));
        }
        if request.image {
            record.image_urls = self.image_urls(document);
        }

        record
    }

    fn first_text(&self, document: &Html, selector: &Option<Selector>) -> Option<String> {
        let selector = selector.as_ref()?;
        document
            .select(selector)
            .next()
            .map(|element| element.text().collect::<String>().trim().to_string())
            .filter(|text| !text.is_empty())
    }

    /// Effective URLs of all elements matched by the image selector, in
    /// document order, de-duplicated.
    fn image_urls(&self, document: &Html) -> Vec<String> {
        let Some(selector) = self.image.as_ref() else {
            return Vec::new();
        };

        let mut urls = Vec::new();
        for element in document.select(selector) {
            if let Some(url) = resolve_image_url(element) {
                if !urls.contains(&url) {
                    urls.push(url);
                }
            }
        }
        urls
    }
}

fn compile(selector: &Option<String>) -> ExtractionResult<Option<Selector>> {
    match selector {
        Some(s) => Selector::parse(s)
            .map(Some)
            .map_err(|e| ExtractionError::invalid_selector(s, e)),
        None => Ok(None),
    }
}

/// Resolve the effective image URL of an element.
///
/// An `<img>` nested inside a `<picture>` prefers a sibling `<source>`
/// element's srcset candidate over its own attributes; some sites serve a
/// higher-fidelity or less access-restricted URL through the fallback
/// source. Otherwise the order is: direct `src`, the known lazy-load
/// attributes, then the first `srcset`/`data-srcset` candidate before its
/// width or density descriptor.
fn resolve_image_url(element: ElementRef) -> Option<String> {
    if let Some(url) = picture_source_candidate(element) {
        return Some(url);
    }

    if let Some(src) = non_empty_attr(element, "src") {
        return Some(src);
    }
    for attribute in LAZY_ATTRIBUTES {
        if let Some(url) = non_empty_attr(element, attribute) {
            return Some(url);
        }
    }

    element
        .value()
        .attr("srcset")
        .or_else(|| element.value().attr("data-srcset"))
        .and_then(first_srcset_candidate)
}

fn picture_source_candidate(element: ElementRef) -> Option<String> {
    let parent = ElementRef::wrap(element.parent()?)?;
    if parent.value().name() != "picture" {
        return None;
    }
    parent
        .select(&SOURCE_SELECTOR)
        .find_map(|source| source.value().attr("srcset").and_then(first_srcset_candidate))
}

/// First candidate of a responsive candidate list, without its descriptor:
/// `"a.jpg 1x, b.jpg 2x"` yields `a.jpg`.
fn first_srcset_candidate(srcset: &str) -> Option<String> {
    srcset
        .split(',')
        .next()?
        .split_whitespace()
        .next()
        .map(str::to_string)
        .filter(|s| !s.is_empty())
}

fn non_empty_attr(element: ElementRef, name: &str) -> Option<String> {
    element
        .value()
        .attr(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor_with(selectors: DetailSelectors) -> SelectorExtractor {
        let profile = SiteProfile {
            selectors,
            ..SiteProfile::default()
        };
        SelectorExtractor::from_profile(&profile).expect("valid selectors")
    }

    #[test]
    fn first_match_text_trimmed() {
        let extractor = extractor_with(DetailSelectors {
            name: Some("h1.title".to_string()),
            price: Some(".price".to_string()),
            ..DetailSelectors::default()
        });
        let doc = Html::parse_document(
            r#"<html><body>
                <h1 class="title">  Necessär i läder  </h1>
                <h1 class="title">Second</h1>
                <span class="price">1 299,00 kr</span>
            </body></html>"#,
        );
        let record = extractor.extract(&doc, "u", FieldRequest::all());
        assert_eq!(record.name.as_deref(), Some("Necessär i läder"));
        assert_eq!(record.price, Some(1299.0));
    }

    #[test]
    fn unrequested_fields_stay_unset() {
        let extractor = extractor_with(DetailSelectors {
            name: Some("h1".to_string()),
            ..DetailSelectors::default()
        });
        let doc = Html::parse_document("<html><body><h1>Name</h1></body></html>");
        let record = extractor.extract(
            &doc,
            "u",
            FieldRequest {
                name: false,
                ..FieldRequest::default()
            },
        );
        assert_eq!(record.name, None);
    }

    #[test]
    fn lazy_load_attributes_resolve_in_order() {
        let extractor = extractor_with(DetailSelectors {
            image: Some("img.product".to_string()),
            ..DetailSelectors::default()
        });
        let doc = Html::parse_document(
            r#"<html><body>
                <img class="product" data-src="https://c.se/lazy.jpg">
                <img class="product" srcset="https://c.se/small.jpg 480w, https://c.se/big.jpg 960w">
            </body></html>"#,
        );
        let record = extractor.extract(&doc, "u", FieldRequest::all());
        assert_eq!(
            record.image_urls,
            vec!["https://c.se/lazy.jpg", "https://c.se/small.jpg"]
        );
    }

    #[test]
    fn direct_src_beats_lazy_attributes() {
        let extractor = extractor_with(DetailSelectors {
            image: Some("img".to_string()),
            ..DetailSelectors::default()
        });
        let doc = Html::parse_document(
            r#"<html><body><img src="https://c.se/direct.jpg" data-src="https://c.se/lazy.jpg"></body></html>"#,
        );
        let record = extractor.extract(&doc, "u", FieldRequest::all());
        assert_eq!(record.image_urls, vec!["https://c.se/direct.jpg"]);
    }

    #[test]
    fn picture_source_wins_over_img_attributes() {
        let extractor = extractor_with(DetailSelectors {
            image: Some("img".to_string()),
            ..DetailSelectors::default()
        });
        let doc = Html::parse_document(
            r#"<html><body>
                <picture>
                    <source srcset="https://c.se/public.jpg 1x, https://c.se/public@2x.jpg 2x">
                    <img src="https://cdn-origin.example.se/restricted.jpg">
                </picture>
            </body></html>"#,
        );
        let record = extractor.extract(&doc, "u", FieldRequest::all());
        assert_eq!(record.image_urls, vec!["https://c.se/public.jpg"]);
    }

    #[test]
    fn missing_from_requests_only_gaps() {
        let mut record = ProductRecord::new("u");
        record.name = Some("Found".to_string());
        record.color_locked = true;
        let request = FieldRequest::missing_from(&record);
        assert!(!request.name);
        assert!(!request.color);
        assert!(request.price);
        assert!(request.image);
    }
}
