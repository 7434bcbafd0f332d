//! Watch command: keeps re-detecting a live URL and streams records.

use crate::config::Config;
use crate::engine::Engine;
use crate::fetch::{HttpFetcher, HttpPageSource, PageFetcher};
use crate::scheduler::{PageEvent, Scheduler};
use crate::sink::{JsonLinesSink, ReportSink};
use crate::strategy::ExtractContext;
use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Polls a URL with the detection scheduler, writing JSON lines to stdout
/// until interrupted.
pub struct WatchCommand {
    config: Config,
}

impl WatchCommand {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub async fn execute(&self, url: &str) -> Result<()> {
        let fetcher = HttpFetcher::new(&self.config).context("Failed to create HTTP client")?;

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Interrupted; stopping watch"),
                Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
            }
            let _ = tx.send(PageEvent::Unloaded);
        });

        self.execute_with(fetcher, url, JsonLinesSink::stdout(), rx).await;
        Ok(())
    }

    /// Runs the scheduler with a provided fetcher, sink and event stream.
    pub async fn execute_with<F, K>(&self, fetcher: F, url: &str, sink: K, events: mpsc::UnboundedReceiver<PageEvent>)
    where
        F: PageFetcher,
        K: ReportSink,
    {
        info!("Watching {}", url);
        let source = HttpPageSource::new(fetcher, url);
        let engine = Engine::standard(ExtractContext::new(self.config.extract_settings()));
        Scheduler::new(engine, source, sink, self.config.scheduler()).run(events).await;
    }
}
