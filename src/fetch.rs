//! HTTP page fetching with browser TLS fingerprint emulation.

use crate::config::Config;
use crate::engine::PageSnapshot;
use crate::scheduler::PageSource;
use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::Rng;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};
use wreq::Client;
use wreq_util::Emulation;

const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9,tr;q=0.8,de;q=0.7";

/// A fetched document and the URL it was finally served from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub url: String,
    pub body: String,
}

/// Trait for page fetching - enables mocking for tests.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage>;
}

/// HTTP client with browser impersonation and request pacing.
pub struct HttpFetcher {
    client: Client,
    delay_ms: u64,
    delay_jitter_ms: u64,
}

impl HttpFetcher {
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = Client::builder()
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10));

        if let Some(proxy_url) = &config.proxy {
            debug!("Configuring proxy: {}", proxy_url);
            let proxy = wreq::Proxy::all(proxy_url).context("Failed to configure proxy")?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build()?;

        Ok(Self { client, delay_ms: config.delay_ms, delay_jitter_ms: config.delay_jitter_ms })
    }

    /// Adds a random delay to mimic human behavior.
    async fn delay(&self) {
        if self.delay_ms == 0 {
            return;
        }

        let jitter = if self.delay_jitter_ms > 0 {
            rand::rng().random_range(0..=self.delay_jitter_ms)
        } else {
            0
        };

        let total_delay = self.delay_ms + jitter;
        debug!("Delaying {}ms", total_delay);
        tokio::time::sleep(Duration::from_millis(total_delay)).await;
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        self.delay().await;

        info!("Fetching {}", url);

        let response = self
            .client
            .get(url)
            .emulation(Emulation::Chrome131)
            .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8")
            .header("Accept-Language", ACCEPT_LANGUAGE)
            .header("Accept-Encoding", "gzip, deflate, br")
            .header("Cache-Control", "no-cache")
            .header("Sec-Fetch-Dest", "document")
            .header("Sec-Fetch-Mode", "navigate")
            .header("Sec-Fetch-Site", "none")
            .header("Sec-Fetch-User", "?1")
            .header("Upgrade-Insecure-Requests", "1")
            .send()
            .await
            .with_context(|| format!("Failed to request {url}"))?;

        let status = response.status();
        debug!("Response status: {}", status);

        if status == 429 || status == 503 {
            warn!("Rate limited ({}). Consider using a proxy or increasing delay.", status);
            anyhow::bail!("Rate limited by {url}. Try increasing --delay or using a proxy.");
        }

        if !status.is_success() {
            anyhow::bail!("Request failed with status: {}", status);
        }

        let final_url = response.uri().to_string();
        if final_url != url {
            debug!("Redirected to {}", final_url);
        }

        let body = response.text().await.context("Failed to read response body")?;
        Ok(FetchedPage { url: final_url, body })
    }
}

/// Page source that re-fetches a URL for every snapshot.
///
/// The current URL follows redirects, so a server-side redirect shows up to
/// the scheduler as a navigation.
pub struct HttpPageSource<F> {
    fetcher: F,
    url: String,
    current: Mutex<String>,
}

impl<F: PageFetcher> HttpPageSource<F> {
    pub fn new(fetcher: F, url: impl Into<String>) -> Self {
        let url = url.into();
        Self { fetcher, current: Mutex::new(url.clone()), url }
    }

    fn set_current(&self, url: &str) {
        let mut current = match self.current.lock() {
            Ok(current) => current,
            Err(poisoned) => poisoned.into_inner(),
        };
        url.clone_into(&mut current);
    }
}

#[async_trait]
impl<F: PageFetcher> PageSource for HttpPageSource<F> {
    async fn current_url(&self) -> Result<String> {
        let current = match self.current.lock() {
            Ok(current) => current,
            Err(poisoned) => poisoned.into_inner(),
        };
        Ok(current.clone())
    }

    async fn snapshot(&self) -> Result<PageSnapshot> {
        let page = self.fetcher.fetch(&self.url).await?;
        self.set_current(&page.url);
        Ok(PageSnapshot::new(page.url, page.body))
    }
}
