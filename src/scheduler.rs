//! Detection scheduler.
//!
//! Re-runs the engine as the page settles, mutates and navigates. Everything
//! happens on one task: a single `select!` loop over the page event channel
//! and four deadlines (settle, debounce, retry, poll). Extraction is
//! synchronous, so a pass is never interleaved with another trigger.
//!
//! The scheduler owns the last successfully reported record. It is cleared
//! together with every pending deadline when the URL changes.

use crate::engine::{Engine, PageSnapshot};
use crate::error::EngineError;
use crate::model::ProductRecord;
use crate::sink::ReportSink;
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, trace, warn};

/// Timing and retry policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Wait after load before the first pass
    pub settle_delay: Duration,
    /// Quiet period that closes a burst of mutations
    pub mutation_debounce: Duration,
    /// URL check and safety-net interval while detecting
    pub poll_interval: Duration,
    /// Reduced poll interval once a product was reported
    pub steady_poll_interval: Duration,
    /// Failed passes before giving up on the current URL
    pub max_retries: u32,
    /// Base retry delay, multiplied by the attempt number
    pub retry_delay: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(1500),
            mutation_debounce: Duration::from_millis(750),
            poll_interval: Duration::from_millis(2000),
            steady_poll_interval: Duration::from_millis(15000),
            max_retries: 5,
            retry_delay: Duration::from_millis(1000),
        }
    }
}

/// Notifications from the host page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageEvent {
    /// A full page load finished; all state starts over.
    Loaded,
    /// The document tree changed.
    Mutated,
    /// The page is going away; the scheduler stops.
    Unloaded,
}

/// Where the scheduler stands for the current URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No product reported yet, retries left
    Detecting,
    /// A product was reported; only the slow poll re-checks it
    Steady,
    /// Retries used up without success
    Exhausted,
}

/// Read access to the live page.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn current_url(&self) -> Result<String>;

    async fn snapshot(&self) -> Result<PageSnapshot>;
}

#[derive(Debug, Clone, Copy)]
enum Trigger {
    Settle,
    Mutation,
    Retry,
    Poll,
}

#[derive(Debug)]
struct Deadlines {
    settle: Option<Instant>,
    debounce: Option<Instant>,
    retry: Option<Instant>,
    poll: Instant,
}

/// State for one URL; replaced wholesale on navigation.
#[derive(Debug)]
struct Lifecycle {
    url: Option<String>,
    phase: Phase,
    attempts: u32,
    last_reported: Option<ProductRecord>,
}

impl Lifecycle {
    fn new(url: Option<String>) -> Self {
        Self { url, phase: Phase::Detecting, attempts: 0, last_reported: None }
    }
}

pub struct Scheduler<S, K> {
    engine: Engine,
    source: S,
    sink: K,
    config: SchedulerConfig,
    lifecycle: Lifecycle,
    deadlines: Deadlines,
}

impl<S: PageSource, K: ReportSink> Scheduler<S, K> {
    pub fn new(engine: Engine, source: S, sink: K, config: SchedulerConfig) -> Self {
        let now = Instant::now();
        let deadlines = Deadlines {
            settle: Some(after(now, config.settle_delay)),
            debounce: None,
            retry: None,
            poll: after(now, config.poll_interval),
        };
        Self { engine, source, sink, config, lifecycle: Lifecycle::new(None), deadlines }
    }

    /// Drives detection until `Unloaded` arrives or the event channel closes.
    /// Pending deadlines are dropped with the loop.
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<PageEvent>) {
        self.restart().await;

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(PageEvent::Loaded) => {
                        debug!("Page loaded; starting over");
                        self.restart().await;
                    }
                    Some(PageEvent::Mutated) => {
                        self.deadlines.debounce = Some(after(Instant::now(), self.config.mutation_debounce));
                    }
                    Some(PageEvent::Unloaded) | None => {
                        debug!("Page unloaded; scheduler stopping");
                        break;
                    }
                },
                _ = sleep_until_opt(self.deadlines.settle) => {
                    self.deadlines.settle = None;
                    self.detect(Trigger::Settle).await;
                }
                _ = sleep_until_opt(self.deadlines.debounce) => {
                    self.deadlines.debounce = None;
                    self.detect(Trigger::Mutation).await;
                }
                _ = sleep_until_opt(self.deadlines.retry) => {
                    self.deadlines.retry = None;
                    self.detect(Trigger::Retry).await;
                }
                _ = sleep_until(self.deadlines.poll) => {
                    self.poll().await;
                    self.deadlines.poll = after(Instant::now(), self.poll_interval());
                }
            }
        }
    }

    async fn restart(&mut self) {
        let url = match self.source.current_url().await {
            Ok(url) => Some(url),
            Err(e) => {
                warn!("Could not read page URL: {:#}", e);
                None
            }
        };
        self.lifecycle = Lifecycle::new(url);
        self.reset_deadlines();
    }

    fn reset_deadlines(&mut self) {
        let now = Instant::now();
        self.deadlines = Deadlines {
            settle: Some(after(now, self.config.settle_delay)),
            debounce: None,
            retry: None,
            poll: after(now, self.config.poll_interval),
        };
    }

    fn poll_interval(&self) -> Duration {
        match self.lifecycle.phase {
            Phase::Steady => self.config.steady_poll_interval,
            Phase::Detecting | Phase::Exhausted => self.config.poll_interval,
        }
    }

    async fn poll(&mut self) {
        let url = match self.source.current_url().await {
            Ok(url) => url,
            Err(e) => {
                warn!("Could not read page URL: {:#}", e);
                return;
            }
        };

        match &self.lifecycle.url {
            None => self.lifecycle.url = Some(url),
            Some(known) if *known != url => {
                self.navigate(url);
                return;
            }
            Some(_) => {}
        }

        let idle = self.deadlines.settle.is_none() && self.deadlines.retry.is_none();
        match self.lifecycle.phase {
            Phase::Steady => self.detect(Trigger::Poll).await,
            Phase::Detecting if idle => self.detect(Trigger::Poll).await,
            _ => {}
        }
    }

    /// Same-document URL change: signal it, forget the old page, settle again.
    fn navigate(&mut self, url: String) {
        info!("Navigated from {:?} to {}", self.lifecycle.url, url);
        self.sink.deliver(ProductRecord::navigated(&url));
        self.lifecycle = Lifecycle::new(Some(url));
        self.reset_deadlines();
    }

    async fn detect(&mut self, trigger: Trigger) {
        trace!("Detection pass ({:?}, attempt {})", trigger, self.lifecycle.attempts + 1);

        let snapshot = match self.source.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                let url = self.lifecycle.url.clone().unwrap_or_default();
                let fault = EngineError::Source(format!("{e:#}"));
                warn!("{}", fault);
                self.failed(ProductRecord::error(url, false, fault), true);
                return;
            }
        };

        match &self.lifecycle.url {
            None => self.lifecycle.url = Some(snapshot.url.clone()),
            Some(url) if *url != snapshot.url => {
                self.navigate(snapshot.url);
                return;
            }
            Some(_) => {}
        }

        let record = self.engine.extract(&snapshot);
        if record.error.is_some() {
            self.failed(record, true);
        } else if record.is_product_page && record.success {
            self.succeeded(record);
        } else {
            self.failed(record, false);
        }
    }

    fn succeeded(&mut self, record: ProductRecord) {
        let changed = self.lifecycle.last_reported.as_ref().map_or(true, |last| record.differs_from(last));
        if changed {
            self.sink.deliver(record.clone());
            self.lifecycle.last_reported = Some(record);
        } else {
            trace!("Record unchanged; not reporting");
        }

        if self.lifecycle.phase != Phase::Steady {
            debug!("Product reported; switching to steady polling");
            self.lifecycle.phase = Phase::Steady;
            self.lifecycle.attempts = 0;
            self.deadlines.retry = None;
            self.deadlines.poll = after(Instant::now(), self.config.steady_poll_interval);
        }
    }

    /// Faults are always reported. Plain failures only once retries run out.
    fn failed(&mut self, record: ProductRecord, fault: bool) {
        if fault {
            self.sink.deliver(record.clone());
        }
        if self.lifecycle.phase != Phase::Detecting {
            trace!("Failed pass in {:?} phase ignored", self.lifecycle.phase);
            return;
        }

        self.lifecycle.attempts += 1;
        let attempts = self.lifecycle.attempts;
        if attempts >= self.config.max_retries {
            info!("Giving up on {} after {} attempts", record.url, attempts);
            self.lifecycle.phase = Phase::Exhausted;
            self.deadlines.retry = None;
            if !fault {
                self.sink.deliver(record);
            }
            return;
        }

        let delay = self.config.retry_delay.saturating_mul(attempts);
        debug!("Attempt {} failed; retrying in {:?}", attempts, delay);
        self.deadlines.retry = Some(after(Instant::now(), delay));
    }
}

/// Stand-in for "never" when a configured delay overflows the clock.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Deadline `delay` after `from`, clamped instead of overflowing.
fn after(from: Instant, delay: Duration) -> Instant {
    from.checked_add(delay).or_else(|| from.checked_add(FAR_FUTURE)).unwrap_or(from)
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::ChannelSink;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::task::JoinHandle;
    use tokio::time::sleep;
    use tokio_test::assert_ok;

    const TEE: &str = r#"<h1>Classic Tee</h1><span class="price">$25.00</span>"#;
    const HOODIE: &str = r#"<h1>Zip Hoodie</h1><span class="price">$55.00</span>"#;
    const ABOUT: &str = "<h1>About us</h1><p>We print tees.</p>";

    struct Page {
        url: String,
        markup: String,
        broken: bool,
    }

    #[derive(Clone)]
    struct ScriptedSource {
        page: Arc<Mutex<Page>>,
        snapshots: Arc<AtomicUsize>,
    }

    impl ScriptedSource {
        fn new(url: &str, markup: &str) -> Self {
            let page = Page { url: url.to_string(), markup: markup.to_string(), broken: false };
            Self { page: Arc::new(Mutex::new(page)), snapshots: Arc::new(AtomicUsize::new(0)) }
        }

        fn set(&self, url: &str, markup: &str) {
            let mut page = self.page.lock().unwrap();
            page.url = url.to_string();
            page.markup = markup.to_string();
        }

        fn break_page(&self) {
            self.page.lock().unwrap().broken = true;
        }

        fn snapshots(&self) -> usize {
            self.snapshots.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PageSource for ScriptedSource {
        async fn current_url(&self) -> Result<String> {
            Ok(self.page.lock().unwrap().url.clone())
        }

        async fn snapshot(&self) -> Result<PageSnapshot> {
            self.snapshots.fetch_add(1, Ordering::SeqCst);
            let page = self.page.lock().unwrap();
            if page.broken {
                anyhow::bail!("renderer crashed");
            }
            Ok(PageSnapshot::new(page.url.clone(), page.markup.clone()))
        }
    }

    struct Harness {
        events: mpsc::UnboundedSender<PageEvent>,
        records: mpsc::UnboundedReceiver<ProductRecord>,
        handle: JoinHandle<()>,
    }

    impl Harness {
        fn start(source: &ScriptedSource, config: SchedulerConfig) -> Self {
            let (sink, records) = ChannelSink::channel();
            let (events, rx) = mpsc::unbounded_channel();
            let scheduler = Scheduler::new(Engine::default(), source.clone(), sink, config);
            let handle = tokio::spawn(scheduler.run(rx));
            Self { events, records, handle }
        }

        fn drain(&mut self) -> Vec<ProductRecord> {
            let mut out = Vec::new();
            while let Ok(record) = self.records.try_recv() {
                out.push(record);
            }
            out
        }

        async fn stop(mut self) -> Vec<ProductRecord> {
            assert_ok!(self.events.send(PageEvent::Unloaded));
            assert_ok!(self.handle.await);
            self.drain()
        }
    }

    fn config(max_retries: u32) -> SchedulerConfig {
        SchedulerConfig { max_retries, ..SchedulerConfig::default() }
    }

    #[tokio::test(start_paused = true)]
    async fn test_reports_once_then_polls_slowly() {
        let source = ScriptedSource::new("https://shop.test/products/tee", TEE);
        let harness = Harness::start(&source, config(5));

        sleep(Duration::from_secs(61)).await;
        let records = harness.stop().await;

        assert_eq!(records.len(), 1);
        assert!(records[0].success);
        assert_eq!(records[0].title.as_deref(), Some("Classic Tee"));
        // settle pass plus steady polls at 16.5 s, 31.5 s and 46.5 s
        assert_eq!(source.snapshots(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_stop_after_limit() {
        let source = ScriptedSource::new("https://shop.test/about", ABOUT);
        let harness = Harness::start(&source, config(3));

        sleep(Duration::from_secs(120)).await;
        let records = harness.stop().await;

        assert_eq!(source.snapshots(), 3);
        assert_eq!(records.len(), 1);
        assert!(!records[0].success);
        assert!(!records[0].is_product_page);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_delay_grows_linearly() {
        let source = ScriptedSource::new("https://shop.test/about", ABOUT);
        let harness = Harness::start(&source, config(4));

        // settle 1.5 s, then retries after 1 s, 2 s and 3 s
        sleep(Duration::from_millis(1600)).await;
        assert_eq!(source.snapshots(), 1);
        sleep(Duration::from_millis(1000)).await;
        assert_eq!(source.snapshots(), 2);
        sleep(Duration::from_millis(1500)).await;
        assert_eq!(source.snapshots(), 2);
        sleep(Duration::from_millis(600)).await;
        assert_eq!(source.snapshots(), 3);
        sleep(Duration::from_millis(3000)).await;
        assert_eq!(source.snapshots(), 4);

        harness.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_retry_delay_does_not_overflow() {
        let source = ScriptedSource::new("https://shop.test/about", ABOUT);
        let huge = SchedulerConfig { retry_delay: Duration::MAX, ..config(u32::MAX) };
        let harness = Harness::start(&source, huge);

        sleep(Duration::from_secs(30)).await;
        let records = harness.stop().await;

        // One settle pass, then the retry is parked far in the future
        assert_eq!(source.snapshots(), 1);
        assert!(records.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_clamped() {
        let now = Instant::now();
        assert_eq!(after(now, Duration::from_secs(5)), now + Duration::from_secs(5));
        assert!(after(now, Duration::MAX) > now);
        assert_eq!(Duration::MAX.saturating_mul(3), Duration::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigation_resets_and_signals() {
        let source = ScriptedSource::new("https://shop.test/products/tee", TEE);
        let mut harness = Harness::start(&source, config(5));

        sleep(Duration::from_secs(3)).await;
        let first = harness.drain();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].title.as_deref(), Some("Classic Tee"));

        source.set("https://shop.test/products/hoodie", HOODIE);
        sleep(Duration::from_secs(30)).await;
        let records = harness.stop().await;

        assert_eq!(records.len(), 2);
        assert!(records[0].navigated);
        assert!(!records[0].is_product_page);
        assert_eq!(records[0].url, "https://shop.test/products/hoodie");
        assert_eq!(records[1].title.as_deref(), Some("Zip Hoodie"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigation_restores_retry_budget() {
        let source = ScriptedSource::new("https://shop.test/about", ABOUT);
        let mut harness = Harness::start(&source, config(2));

        sleep(Duration::from_secs(30)).await;
        assert_eq!(source.snapshots(), 2);
        assert_eq!(harness.drain().len(), 1);

        source.set("https://shop.test/contact", ABOUT);
        sleep(Duration::from_secs(30)).await;
        let records = harness.stop().await;

        assert_eq!(source.snapshots(), 4);
        assert_eq!(records.len(), 2);
        assert!(records[0].navigated);
        assert_eq!(records[1].url, "https://shop.test/contact");
    }

    #[tokio::test(start_paused = true)]
    async fn test_mutation_burst_runs_once() {
        let source = ScriptedSource::new("https://shop.test/products/tee", ABOUT);
        let slow_retry = SchedulerConfig { retry_delay: Duration::from_secs(60), ..config(10) };
        let harness = Harness::start(&source, slow_retry);

        sleep(Duration::from_secs(2)).await;
        assert_eq!(source.snapshots(), 1);

        source.set("https://shop.test/products/tee", TEE);
        for _ in 0..5 {
            assert_ok!(harness.events.send(PageEvent::Mutated));
            sleep(Duration::from_millis(100)).await;
        }
        sleep(Duration::from_secs(2)).await;
        assert_eq!(source.snapshots(), 2);

        let records = harness.stop().await;
        assert_eq!(records.len(), 1);
        assert!(records[0].success);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_record_not_repeated() {
        let source = ScriptedSource::new("https://shop.test/products/tee", TEE);
        let mut harness = Harness::start(&source, config(5));

        sleep(Duration::from_secs(2)).await;
        for _ in 0..3 {
            assert_ok!(harness.events.send(PageEvent::Mutated));
            sleep(Duration::from_secs(1)).await;
        }
        assert_eq!(harness.drain().len(), 1);

        source.set("https://shop.test/products/tee", &TEE.replace("25.00", "19.00"));
        assert_ok!(harness.events.send(PageEvent::Mutated));
        sleep(Duration::from_secs(1)).await;

        let records = harness.stop().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].price, Some(rust_decimal::Decimal::from(19)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_faults_report_and_count() {
        let source = ScriptedSource::new("https://shop.test/products/tee", TEE);
        source.break_page();
        let harness = Harness::start(&source, config(3));

        sleep(Duration::from_secs(60)).await;
        let records = harness.stop().await;

        assert_eq!(source.snapshots(), 3);
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| !r.success));
        assert!(records[0].error.as_deref().is_some_and(|e| e.contains("renderer crashed")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unload_stops_pending_work() {
        let source = ScriptedSource::new("https://shop.test/products/tee", TEE);
        let harness = Harness::start(&source, config(5));

        sleep(Duration::from_millis(500)).await;
        let records = harness.stop().await;
        sleep(Duration::from_secs(10)).await;

        assert!(records.is_empty());
        assert_eq!(source.snapshots(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loaded_starts_over() {
        let source = ScriptedSource::new("https://shop.test/products/tee", TEE);
        let harness = Harness::start(&source, config(5));

        sleep(Duration::from_secs(2)).await;
        assert_ok!(harness.events.send(PageEvent::Loaded));
        sleep(Duration::from_secs(2)).await;

        // Reload forgets the last report, so the same product is sent again
        let records = harness.stop().await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title, records[1].title);
    }
}
