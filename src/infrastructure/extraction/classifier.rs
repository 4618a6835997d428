//! Listing vs detail page classification
//!
//! Pure URL check driving the orchestrator's branch; holds no state.

use crate::domain::site_profile::SiteProfile;

/// The two page kinds a crawl session distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Listing,
    Detail,
}

/// Classify a URL using the profile's detail-URL marker.
pub fn classify(url: &str, profile: &SiteProfile) -> PageKind {
    if url.contains(&profile.detail_url_marker) {
        PageKind::Detail
    } else {
        PageKind::Listing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_substring_means_detail() {
        let profile = SiteProfile {
            detail_url_marker: ".html".to_string(),
            ..SiteProfile::default()
        };
        assert_eq!(
            classify("https://shop.example.se/p/7325708333070.html", &profile),
            PageKind::Detail
        );
        assert_eq!(
            classify("https://shop.example.se/vaskor?page=2", &profile),
            PageKind::Listing
        );
    }
}
