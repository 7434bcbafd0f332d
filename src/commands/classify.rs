//! Classify command: prints the product page signals.

use super::{is_remote, load_snapshot};
use crate::config::Config;
use crate::engine::Engine;
use crate::fetch::{HttpFetcher, PageFetcher};
use crate::format::Formatter;
use anyhow::{Context, Result};

pub struct ClassifyCommand {
    config: Config,
}

impl ClassifyCommand {
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

    pub async fn execute_with_fetcher(
        &self,
        fetcher: Option<&dyn PageFetcher>,
        source: &str,
        url: Option<&str>,
    ) -> Result<String> {
        let snapshot = load_snapshot(fetcher, source, url).await?;
        let classification = Engine::default().classify(&snapshot)?;
        Ok(Formatter::new(self.config.format).format_classification(&snapshot.url, &classification))
    }
}
