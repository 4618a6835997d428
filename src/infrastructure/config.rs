//! Crawler configuration
//!
//! Settings that tune one crawl session independently of the site profile:
//! pacing, batch size and HTTP behavior. Loaded from a JSON file when
//! present, otherwise defaults apply.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::info;

use crate::infrastructure::batch::DEFAULT_BATCH_SIZE;
use crate::infrastructure::http_client::HttpClientConfig;

/// Crawl session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Records accumulated before an automatic flush.
    pub batch_size: usize,
    /// Default delay between detail-page fetches; a site profile's
    /// `request_delay_ms` takes precedence when set to a non-zero value.
    pub request_delay_ms: u64,
    pub http: HttpClientConfig,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            request_delay_ms: 300,
            http: HttpClientConfig::default(),
        }
    }
}

impl CrawlerConfig {
    /// Load configuration from a JSON file, falling back to defaults when
    /// the file does not exist.
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Persist the configuration as pretty-printed JSON.
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let config = CrawlerConfig::load(Path::new("/nonexistent/config.json"))
            .await
            .expect("defaults");
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
    }

    #[tokio::test]
    async fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("crawler.json");

        let config = CrawlerConfig {
            batch_size: 10,
            request_delay_ms: 1000,
            http: HttpClientConfig::default(),
        };
        config.save(&path).await.expect("save");

        let loaded = CrawlerConfig::load(&path).await.expect("load");
        assert_eq!(loaded.batch_size, 10);
        assert_eq!(loaded.request_delay_ms, 1000);
    }
}
