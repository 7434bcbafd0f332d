//! One detection pass: parse, classify, run the strategy chain.
//!
//! The engine is stateless between passes. It never returns an error; a
//! fault becomes an error record so the host always gets an answer.

use crate::classifier::{self, Classification};
use crate::dom::{Document, Layout};
use crate::error::EngineError;
use crate::model::ProductRecord;
use crate::strategy::{ExtractContext, StrategyChain};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

/// Page state captured by the host for one detection pass.
#[derive(Clone)]
pub struct PageSnapshot {
    pub url: String,
    pub markup: String,
    /// Host geometry; static layout when absent
    pub layout: Option<Arc<dyn Layout>>,
}

impl PageSnapshot {
    pub fn new(url: impl Into<String>, markup: impl Into<String>) -> Self {
        Self { url: url.into(), markup: markup.into(), layout: None }
    }

    pub fn with_layout(mut self, layout: Arc<dyn Layout>) -> Self {
        self.layout = Some(layout);
        self
    }

    fn document(&self) -> Result<Document, EngineError> {
        let page = Document::parse(&self.url, &self.markup)?;
        Ok(match &self.layout {
            Some(layout) => page.with_layout(Arc::clone(layout)),
            None => page,
        })
    }
}

impl std::fmt::Debug for PageSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageSnapshot")
            .field("url", &self.url)
            .field("markup_len", &self.markup.len())
            .field("layout", &self.layout.is_some())
            .finish()
    }
}

/// Classifier plus strategy chain.
pub struct Engine {
    chain: StrategyChain,
    ctx: ExtractContext,
}

impl Engine {
    pub fn new(chain: StrategyChain, ctx: ExtractContext) -> Self {
        Self { chain, ctx }
    }

    /// Standard chain with the given context.
    pub fn standard(ctx: ExtractContext) -> Self {
        Self::new(StrategyChain::standard(), ctx)
    }

    pub fn chain(&self) -> &StrategyChain {
        &self.chain
    }

    /// Classifier signals for a snapshot.
    pub fn classify(&self, snapshot: &PageSnapshot) -> Result<Classification, EngineError> {
        let page = snapshot.document()?;
        Ok(classifier::classify(&page))
    }

    /// Runs one full detection pass.
    ///
    /// Non-product pages yield a `not_product` record. Invalid URLs and
    /// panics inside classification or extraction yield an error record.
    pub fn extract(&self, snapshot: &PageSnapshot) -> ProductRecord {
        let page = match snapshot.document() {
            Ok(page) => page,
            Err(e) => {
                warn!("{}", e);
                return ProductRecord::error(&snapshot.url, false, e);
            }
        };

        let mut is_product = false;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            if !classifier::classify(&page).is_product_page() {
                debug!("Not a product page: {}", snapshot.url);
                return ProductRecord::not_product(&snapshot.url);
            }
            is_product = true;
            self.chain.run(&page, &self.ctx)
        }));

        outcome.unwrap_or_else(|payload| {
            let fault = EngineError::from_panic(&snapshot.url, payload.as_ref());
            warn!("{}", fault);
            ProductRecord::error(&snapshot.url, is_product, fault)
        })
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::standard(ExtractContext::default())
    }
}
