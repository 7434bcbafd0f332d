//! Extract command: one detection pass over a page.

use super::{is_remote, load_snapshot};
use crate::config::Config;
use crate::engine::Engine;
use crate::fetch::{HttpFetcher, PageFetcher};
use crate::format::Formatter;
use crate::strategy::ExtractContext;
use anyhow::{Context, Result};
use tracing::info;

/// Fetches or reads a page and prints the extracted record.
pub struct ExtractCommand {
    config: Config,
}

impl ExtractCommand {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub async fn execute(&self, source: &str, url: Option<&str>) -> Result<String> {
        if is_remote(source) {
            let fetcher = HttpFetcher::new(&self.config).context("Failed to create HTTP client")?;
            self.execute_with_fetcher(Some(&fetcher), source, url).await
        } else {
            self.execute_with_fetcher(None, source, url).await
        }
    }

    /// Runs with a provided fetcher (for testing).
    pub async fn execute_with_fetcher(
        &self,
        fetcher: Option<&dyn PageFetcher>,
        source: &str,
        url: Option<&str>,
    ) -> Result<String> {
        let snapshot = load_snapshot(fetcher, source, url).await?;

        let engine = Engine::standard(ExtractContext::new(self.config.extract_settings()));
        let record = engine.extract(&snapshot);
        info!("Extracted {} via {:?} (success: {})", record.url, record.extraction_method, record.success);

        Ok(Formatter::new(self.config.format).format_record(&record))
    }
}
