//! CLI command implementations.

pub mod classify;
pub mod extract;
pub mod watch;

pub use classify::ClassifyCommand;
pub use extract::ExtractCommand;
pub use watch::WatchCommand;

use crate::engine::PageSnapshot;
use crate::fetch::PageFetcher;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::debug;
use url::Url;

/// True when `source` names a remote page rather than a local file.
pub fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Loads a page from an http(s) URL or a local HTML file.
///
/// `url` overrides the page URL; a local file otherwise gets a `file://` URL,
/// which no URL-based signal or site strategy matches.
pub async fn load_snapshot(
    fetcher: Option<&dyn PageFetcher>,
    source: &str,
    url: Option<&str>,
) -> Result<PageSnapshot> {
    if is_remote(source) {
        let fetcher = fetcher.context("No HTTP fetcher available")?;
        let page = fetcher.fetch(source).await?;
        let url = url.map(str::to_string).unwrap_or(page.url);
        return Ok(PageSnapshot::new(url, page.body));
    }

    let path = Path::new(source);
    debug!("Reading page from {}", path.display());
    let markup = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read HTML file: {}", path.display()))?;

    let url = match url {
        Some(url) => url.to_string(),
        None => file_url(path)?,
    };
    Ok(PageSnapshot::new(url, markup))
}

fn file_url(path: &Path) -> Result<String> {
    let absolute = std::fs::canonicalize(path)
        .with_context(|| format!("Failed to resolve path: {}", path.display()))?;
    Url::from_file_path(&absolute)
        .map(String::from)
        .map_err(|_| anyhow::anyhow!("Cannot express {} as a URL", absolute.display()))
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::config::Config;
    use crate::fetch::{FetchedPage, PageFetcher};
    use anyhow::Result;
    use async_trait::async_trait;

    /// Mock fetcher serving fixed markup.
    pub struct MockFetcher {
        pub body: String,
        pub should_fail: bool,
    }

    impl MockFetcher {
        pub fn new(body: &str) -> Self {
            Self { body: body.to_string(), should_fail: false }
        }

        pub fn failing() -> Self {
            Self { body: String::new(), should_fail: true }
        }
    }

    #[async_trait]
    impl PageFetcher for MockFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchedPage> {
            if self.should_fail {
                anyhow::bail!("Simulated network error")
            }
            Ok(FetchedPage { url: url.to_string(), body: self.body.clone() })
        }
    }

    pub fn make_test_config() -> Config {
        Config { delay_ms: 0, delay_jitter_ms: 0, ..Config::default() }
    }
}
