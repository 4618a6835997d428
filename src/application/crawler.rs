//! Crawl orchestrator
//!
//! A `CrawlSession` processes one target site's listing and product pages
//! sequentially: fetch, classify, run the three extractors in the fixed
//! merge order, validate images, hand the finished record to the batch
//! upsert engine. Pages are processed one at a time; the only intra-page
//! concurrency is image-candidate validation.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{error, info, warn};
use url::Url;

use crate::domain::product::ProductRecord;
use crate::domain::site_profile::{FetchStrategy, SiteProfile};
use crate::infrastructure::batch::{BatchUpsertEngine, FlushStats};
use crate::infrastructure::config::CrawlerConfig;
use crate::infrastructure::extraction::classifier::{classify, PageKind};
use crate::infrastructure::extraction::images::ImageValidator;
use crate::infrastructure::extraction::metadata::MetadataExtractor;
use crate::infrastructure::extraction::selectors::{FieldRequest, SelectorExtractor};
use crate::infrastructure::extraction::url_pattern::UrlPatternExtractor;
use crate::infrastructure::http_client::HttpClient;
use crate::infrastructure::repository::ProductRepository;

static ANCHOR_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("static selector"));

/// External browser-automation collaborator. Produces the fully rendered,
/// already-deduplicated link list of a JavaScript-driven listing page; the
/// session treats it as opaque input.
#[async_trait]
pub trait RenderedLinkProvider: Send + Sync {
    async fn rendered_links(&self, listing_url: &str) -> Result<Vec<String>>;
}

/// Counters reported at session end.
#[derive(Debug, Clone, Default)]
pub struct CrawlStats {
    pub pages_fetched: u32,
    pub records_produced: u32,
    /// Detail pages dropped because no source yielded an article number.
    pub pages_skipped: u32,
    pub fetch_failures: u32,
    pub flush: FlushStats,
    /// Messages of failed flush cycles; the batches behind them were
    /// discarded, so losing these silently is unacceptable.
    pub flush_errors: Vec<String>,
}

/// One crawl session against one site profile. Owns its batch state;
/// concurrent sessions are independent.
pub struct CrawlSession {
    profile: SiteProfile,
    http: Arc<HttpClient>,
    metadata: MetadataExtractor,
    selectors: SelectorExtractor,
    url_pattern: UrlPatternExtractor,
    images: ImageValidator,
    batch: BatchUpsertEngine,
    delay: Duration,
    link_provider: Option<Arc<dyn RenderedLinkProvider>>,
    stats: CrawlStats,
}

impl CrawlSession {
    pub fn new(
        profile: SiteProfile,
        config: &CrawlerConfig,
        repository: ProductRepository,
        link_provider: Option<Arc<dyn RenderedLinkProvider>>,
    ) -> Result<Self> {
        let http = Arc::new(HttpClient::new(config.http.clone())?);
        let metadata = MetadataExtractor::from_profile(&profile)?;
        let selectors = SelectorExtractor::from_profile(&profile)?;
        let url_pattern = UrlPatternExtractor::from_profile(&profile)?;
        let images = ImageValidator::new(Arc::clone(&http), profile.cdn_rewrite.clone());
        let batch = BatchUpsertEngine::with_batch_size(repository, config.batch_size);

        let delay_ms = if profile.request_delay_ms > 0 {
            profile.request_delay_ms
        } else {
            config.request_delay_ms
        };

        Ok(Self {
            profile,
            http,
            metadata,
            selectors,
            url_pattern,
            images,
            batch,
            delay: Duration::from_millis(delay_ms),
            link_provider,
            stats: CrawlStats::default(),
        })
    }

    /// Crawl the configured listing and every discovered detail page.
    /// Only an unusable listing page aborts the session; everything else
    /// is logged and skipped.
    pub async fn run(mut self) -> Result<CrawlStats> {
        info!(
            "Starting crawl session for '{}' ({:?})",
            self.profile.name, self.profile.fetch_strategy
        );

        let links = self.collect_detail_links().await?;
        info!("Collected {} detail-page links", links.len());

        for (index, link) in links.iter().enumerate() {
            if index > 0 {
                // Cooperative pacing between detail fetches, not a
                // concurrency limiter.
                tokio::time::sleep(self.delay).await;
            }
            self.process_detail_page(link).await;
        }

        match self.batch.flush().await {
            Ok(stats) => self.stats.flush.absorb(stats),
            Err(e) => self.stats.flush_errors.push(e.to_string()),
        }

        info!(
            "Crawl session finished: {} pages, {} records, {} skipped, {} inserted, {} updated",
            self.stats.pages_fetched,
            self.stats.records_produced,
            self.stats.pages_skipped,
            self.stats.flush.inserted,
            self.stats.flush.updated
        );
        Ok(self.stats)
    }

    /// Detail-page links in processing order, according to the session's
    /// fetch strategy.
    async fn collect_detail_links(&mut self) -> Result<Vec<String>> {
        match self.profile.fetch_strategy {
            FetchStrategy::RenderedList => {
                let provider = self.link_provider.as_ref().context(
                    "Fetch strategy 'rendered_list' requires a rendered-link provider",
                )?;
                provider
                    .rendered_links(&self.profile.listing_url)
                    .await
                    .context("Rendered-link provider failed")
            }
            FetchStrategy::InDocument => {
                let html = self
                    .http
                    .get_text(&self.profile.listing_url)
                    .await
                    .context("Failed to fetch listing page")?;
                self.stats.pages_fetched += 1;
                let document = Html::parse_document(&html);
                Ok(collect_in_document_links(
                    &document,
                    &self.profile.listing_url,
                    &self.profile,
                ))
            }
        }
    }

    async fn process_detail_page(&mut self, url: &str) {
        let html = match self.http.get_text(url).await {
            Ok(html) => html,
            Err(e) => {
                warn!("Skipping detail page {}: {}", url, e);
                self.stats.fetch_failures += 1;
                return;
            }
        };
        self.stats.pages_fetched += 1;

        let document = Html::parse_document(&html);
        let mut record = self.build_record(&document, url);

        if !record.has_article_number() {
            warn!("No article number extractable from {}, dropping page", url);
            self.stats.pages_skipped += 1;
            return;
        }

        let validated = self
            .images
            .find_valid_image_urls(&document, &record.article_number, url)
            .await;
        if !validated.is_empty() {
            record.image_urls = validated;
        }

        self.stats.records_produced += 1;
        match self.batch.add(record).await {
            Ok(Some(stats)) => self.stats.flush.absorb(stats),
            Ok(None) => {}
            Err(e) => {
                error!("Flush cycle failed: {}", e);
                self.stats.flush_errors.push(e.to_string());
            }
        }
    }

    /// Run the enabled extraction sources in the fixed merge order:
    /// structured metadata first (most authoritative), then profile
    /// selectors for whatever is still missing, then URL patterns as the
    /// article-number last resort.
    pub fn build_record(&self, document: &Html, url: &str) -> ProductRecord {
        let mut record = if self.profile.sources.metadata {
            self.metadata.extract(document, url)
        } else {
            ProductRecord::new(url)
        };

        if self.profile.sources.selectors {
            let request = FieldRequest::missing_from(&record);
            let secondary = self.selectors.extract(document, url, request);
            record.merge_from(secondary);
        }

        if self.profile.sources.url_pattern && !record.has_article_number() {
            if let Some(article_number) = self.url_pattern.extract(url, document) {
                let mut secondary = ProductRecord::new(url);
                secondary.article_number = article_number;
                record.merge_from(secondary);
            }
        }

        record
    }
}

/// Anchors of a server-rendered listing page that classify as detail
/// pages, resolved to absolute URLs, de-duplicated in document order.
pub fn collect_in_document_links(
    document: &Html,
    listing_url: &str,
    profile: &SiteProfile,
) -> Vec<String> {
    let Ok(base) = Url::parse(listing_url) else {
        return Vec::new();
    };

    let mut links = Vec::new();
    for anchor in document.select(&ANCHOR_SELECTOR) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Ok(absolute) = base.join(href) else {
            continue;
        };
        let absolute = absolute.to_string();
        if classify(&absolute, profile) == PageKind::Detail && !links.contains(&absolute) {
            links.push(absolute);
        }
    }
    links
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_document_links_are_classified_resolved_and_deduplicated() {
        let profile = SiteProfile {
            detail_url_marker: ".html".to_string(),
            ..SiteProfile::default()
        };
        let document = Html::parse_document(
            r#"<html><body>
                <a href="/p/7325708333070.html">Necessär</a>
                <a href="https://shop.example.se/p/9970239.html">Väska</a>
                <a href="/p/7325708333070.html">Necessär igen</a>
                <a href="/vaskor?page=2">Nästa sida</a>
            </body></html>"#,
        );

        let links =
            collect_in_document_links(&document, "https://shop.example.se/vaskor", &profile);
        assert_eq!(
            links,
            vec![
                "https://shop.example.se/p/7325708333070.html",
                "https://shop.example.se/p/9970239.html",
            ]
        );
    }

    struct FixedLinks(Vec<String>);

    #[async_trait]
    impl RenderedLinkProvider for FixedLinks {
        async fn rendered_links(&self, _listing_url: &str) -> Result<Vec<String>> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn rendered_list_strategy_requires_a_provider() {
        let pool = sqlx::SqlitePool::connect("sqlite::memory:")
            .await
            .expect("pool");
        let profile = SiteProfile {
            fetch_strategy: FetchStrategy::RenderedList,
            ..SiteProfile::default()
        };
        let mut session = CrawlSession::new(
            profile,
            &CrawlerConfig::default(),
            ProductRepository::new(pool),
            None,
        )
        .expect("session");

        assert!(session.collect_detail_links().await.is_err());
    }

    #[tokio::test]
    async fn rendered_list_strategy_uses_the_provider_output_in_order() {
        let pool = sqlx::SqlitePool::connect("sqlite::memory:")
            .await
            .expect("pool");
        let profile = SiteProfile {
            fetch_strategy: FetchStrategy::RenderedList,
            ..SiteProfile::default()
        };
        let provider = Arc::new(FixedLinks(vec![
            "https://shop.example.se/p/1.html".to_string(),
            "https://shop.example.se/p/2.html".to_string(),
        ]));
        let mut session = CrawlSession::new(
            profile,
            &CrawlerConfig::default(),
            ProductRepository::new(pool),
            Some(provider),
        )
        .expect("session");

        let links = session.collect_detail_links().await.expect("links");
        assert_eq!(
            links,
            vec![
                "https://shop.example.se/p/1.html",
                "https://shop.example.se/p/2.html",
            ]
        );
    }
}
