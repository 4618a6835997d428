//! Article number extraction from detail-page URLs
//!
//! Last-resort source in the merge order; only ever contributes the
//! article number. Patterns run most specific first: a digit run before the
//! detail-page suffix, then a digit run at the end of the path or before a
//! query string, then any run of 7+ digits. Article identifiers in this
//! domain are conventionally 7+ digits, so shorter runs (years, prices)
//! never match.

use regex::Regex;
use scraper::{Html, Selector};

use super::error::{ExtractionError, ExtractionResult};
use crate::domain::site_profile::SiteProfile;

const DEFAULT_PATTERNS: [&str; 3] = [
    r"(\d{7,})\.html",
    r"(\d{7,})(?:\?|$)",
    r"(\d{7,})",
];

/// Ordered-regex extractor over the product page URL with an optional
/// brand-specific fallback selector.
pub struct UrlPatternExtractor {
    patterns: Vec<Regex>,
    fallback_selector: Option<Selector>,
}

impl UrlPatternExtractor {
    /// Build from a profile; empty `article_number_patterns` selects the
    /// built-in default set.
    pub fn from_profile(profile: &SiteProfile) -> ExtractionResult<Self> {
        let sources: Vec<&str> = if profile.article_number_patterns.is_empty() {
            DEFAULT_PATTERNS.to_vec()
        } else {
            profile
                .article_number_patterns
                .iter()
                .map(String::as_str)
                .collect()
        };

        let mut patterns = Vec::with_capacity(sources.len());
        for source in sources {
            let regex = Regex::new(source)
                .map_err(|e| ExtractionError::invalid_pattern(source, e))?;
            patterns.push(regex);
        }

        let fallback_selector = match &profile.article_number_fallback_selector {
            Some(selector_str) => Some(
                Selector::parse(selector_str)
                    .map_err(|e| ExtractionError::invalid_selector(selector_str, e))?,
            ),
            None => None,
        };

        Ok(Self {
            patterns,
            fallback_selector,
        })
    }

    /// First capture group of the first pattern that matches the URL; the
    /// fallback selector is tried against the document only when no pattern
    /// matched.
    pub fn extract(&self, url: &str, document: &Html) -> Option<String> {
        for pattern in &self.patterns {
            if let Some(captures) = pattern.captures(url) {
                if let Some(group) = captures.get(1) {
                    return Some(group.as_str().to_string());
                }
            }
        }

        let selector = self.fallback_selector.as_ref()?;
        document
            .select(selector)
            .next()
            .map(|element| element.text().collect::<String>().trim().to_string())
            .filter(|text| !text.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> UrlPatternExtractor {
        UrlPatternExtractor::from_profile(&SiteProfile::default()).expect("default patterns")
    }

    #[test]
    fn html_suffix_pattern_wins_over_generic_run() {
        let doc = Html::parse_document("<html></html>");
        assert_eq!(
            extractor().extract("https://shop.example.se/p/7325708333070.html", &doc),
            Some("7325708333070".to_string())
        );
    }

    #[test]
    fn end_or_query_pattern_matches() {
        let doc = Html::parse_document("<html></html>");
        assert_eq!(
            extractor().extract("https://shop.example.se/p/7325708333070?v=1", &doc),
            Some("7325708333070".to_string())
        );
        assert_eq!(
            extractor().extract("https://shop.example.se/p/7325708333070", &doc),
            Some("7325708333070".to_string())
        );
    }

    #[test]
    fn short_digit_runs_never_match() {
        let doc = Html::parse_document("<html></html>");
        assert_eq!(
            extractor().extract("https://shop.example.se/rea-2024/vaskor?price=199", &doc),
            None
        );
    }

    #[test]
    fn fallback_selector_is_tried_last() {
        let profile = SiteProfile {
            article_number_fallback_selector: Some("span.artnr".to_string()),
            ..SiteProfile::default()
        };
        let extractor = UrlPatternExtractor::from_profile(&profile).expect("valid selector");
        let doc =
            Html::parse_document(r#"<html><body><span class="artnr"> 9970239-5 </span></body></html>"#);

        assert_eq!(
            extractor.extract("https://shop.example.se/necessar", &doc),
            Some("9970239-5".to_string())
        );
        // A matching pattern still wins over the fallback
        assert_eq!(
            extractor.extract("https://shop.example.se/p/7325708333070.html", &doc),
            Some("7325708333070".to_string())
        );
    }
}
