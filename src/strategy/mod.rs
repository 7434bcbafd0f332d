//! Extraction strategy chain.
//!
//! Strategies run in a fixed priority order: site-specific, then storefront
//! platform, then the generic structured data, meta tag, common selector and
//! content scan strategies. The first record with `success = true` wins.

pub mod common;
pub mod content_scan;
pub mod meta;
pub mod platform;
pub mod site;
pub mod structured;

use crate::dom::Document;
use crate::model::{ExtractionMethod, ProductRecord};
use crate::reveal::{NoReveal, RevealTrigger};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

pub use common::{CommonSelectors, FieldSelectors, PriceFormat};
pub use content_scan::ContentScan;
pub use meta::MetaTags;
pub use structured::StructuredData;

/// Tunables shared by every strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractSettings {
    /// Images with a side at or below this are never product images.
    pub min_image_side: f64,
    /// Images with both sides above this are preferred.
    pub preferred_image_side: f64,
    /// Upper bound for a reveal probe.
    pub reveal_timeout: Duration,
}

impl Default for ExtractSettings {
    fn default() -> Self {
        Self {
            min_image_side: 100.0,
            preferred_image_side: 300.0,
            reveal_timeout: Duration::from_millis(1500),
        }
    }
}

/// Everything a strategy may use besides the page itself.
#[derive(Clone)]
pub struct ExtractContext {
    pub reveal: Arc<dyn RevealTrigger>,
    pub settings: ExtractSettings,
}

impl ExtractContext {
    pub fn new(settings: ExtractSettings) -> Self {
        Self { reveal: Arc::new(NoReveal), settings }
    }

    pub fn with_reveal(mut self, reveal: Arc<dyn RevealTrigger>) -> Self {
        self.reveal = reveal;
        self
    }
}

impl Default for ExtractContext {
    fn default() -> Self {
        Self::new(ExtractSettings::default())
    }
}

/// One self-contained extraction algorithm.
///
/// `extract` never fails: a strategy that finds too little returns a record
/// with `success = false` so the chain can move on.
pub trait Strategy: Send + Sync {
    fn method(&self) -> ExtractionMethod;

    fn applicable(&self, page: &Document) -> bool;

    fn extract(&self, page: &Document, ctx: &ExtractContext) -> ProductRecord;
}

/// Ordered list of strategies.
pub struct StrategyChain {
    strategies: Vec<Box<dyn Strategy>>,
}

impl StrategyChain {
    pub fn new(strategies: Vec<Box<dyn Strategy>>) -> Self {
        Self { strategies }
    }

    /// Site strategies, platform strategies, then the generic cascade.
    pub fn standard() -> Self {
        let mut strategies: Vec<Box<dyn Strategy>> = Vec::new();
        strategies.extend(site::all());
        strategies.extend(platform::all());
        strategies.push(Box::new(StructuredData));
        strategies.push(Box::new(MetaTags));
        strategies.push(Box::new(CommonSelectors));
        strategies.push(Box::new(ContentScan));
        Self { strategies }
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Method tags in evaluation order.
    pub fn methods(&self) -> Vec<ExtractionMethod> {
        self.strategies.iter().map(|s| s.method()).collect()
    }

    /// Runs applicable strategies until one succeeds.
    ///
    /// Without a winner the failure records are merged into one `partial`
    /// record, earlier strategies taking precedence field by field.
    pub fn run(&self, page: &Document, ctx: &ExtractContext) -> ProductRecord {
        let mut failures = Vec::new();

        for strategy in &self.strategies {
            if !strategy.applicable(page) {
                trace!("Strategy {} not applicable", strategy.method());
                continue;
            }

            let record = strategy.extract(page, ctx);
            if record.success {
                debug!("Strategy {} extracted {:?}", strategy.method(), record.title);
                return record;
            }

            debug!(
                "Strategy {} found insufficient data (title: {}, price: {})",
                strategy.method(),
                record.title.is_some(),
                record.price.is_some()
            );
            failures.push(record);
        }

        merge_partial(page.url().as_str(), &failures)
    }
}

/// Combines failed records, first non-empty field wins.
pub fn merge_partial(url: &str, failures: &[ProductRecord]) -> ProductRecord {
    let mut merged = ProductRecord::new(url, ExtractionMethod::Partial);
    for failure in failures {
        merged.fill_from(failure);
    }
    merged.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    struct Fixed {
        method: &'static str,
        applicable: bool,
        title: Option<&'static str>,
        price: Option<i64>,
    }

    impl Strategy for Fixed {
        fn method(&self) -> ExtractionMethod {
            ExtractionMethod::site(self.method)
        }

        fn applicable(&self, _page: &Document) -> bool {
            self.applicable
        }

        fn extract(&self, page: &Document, _ctx: &ExtractContext) -> ProductRecord {
            let mut record = ProductRecord::new(page.url().as_str(), self.method());
            record.title = self.title.map(String::from);
            record.price = self.price.map(Decimal::from);
            record.finish()
        }
    }

    fn page() -> Document {
        Document::parse("https://shop.test/products/tee", "<html></html>").unwrap()
    }

    #[test]
    fn test_first_success_wins() {
        let chain = StrategyChain::new(vec![
            Box::new(Fixed { method: "skipped", applicable: false, title: Some("A"), price: Some(1) }),
            Box::new(Fixed { method: "first", applicable: true, title: Some("B"), price: Some(2) }),
            Box::new(Fixed { method: "second", applicable: true, title: Some("C"), price: Some(3) }),
        ]);
        let record = chain.run(&page(), &ExtractContext::default());
        assert!(record.success);
        assert_eq!(record.title.as_deref(), Some("B"));
        assert_eq!(record.extraction_method, Some(ExtractionMethod::site("first")));
    }

    #[test]
    fn test_failures_merge_into_partial() {
        let chain = StrategyChain::new(vec![
            Box::new(Fixed { method: "titles", applicable: true, title: Some("Tee"), price: None }),
            Box::new(Fixed { method: "prices", applicable: true, title: None, price: Some(25) }),
        ]);
        let record = chain.run(&page(), &ExtractContext::default());
        assert_eq!(record.extraction_method, Some(ExtractionMethod::Partial));
        assert_eq!(record.title.as_deref(), Some("Tee"));
        assert_eq!(record.price, Some(Decimal::from(25)));
        assert!(record.success);
    }

    #[test]
    fn test_nothing_applicable() {
        let chain = StrategyChain::new(vec![Box::new(Fixed {
            method: "never",
            applicable: false,
            title: Some("A"),
            price: Some(1),
        })]);
        let record = chain.run(&page(), &ExtractContext::default());
        assert!(!record.success);
        assert!(record.is_product_page);
        assert_eq!(record.extraction_method, Some(ExtractionMethod::Partial));
    }

    #[test]
    fn test_standard_order() {
        let methods = StrategyChain::standard().methods();
        let names: Vec<_> = methods.iter().map(|m| m.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "amazon",
                "trendyol",
                "beymen",
                "shopify",
                "woocommerce",
                "magento",
                "structured_data",
                "meta_tags",
                "common_selectors",
                "content_scan",
            ]
        );
    }
}
