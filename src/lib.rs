//! product-lens - Multi-strategy product extraction for arbitrary shop pages
//!
//! Decides whether a page is a product detail page and pulls a normalized
//! product record out of it, falling back from site-specific and platform
//! strategies to generic ones.

pub mod classifier;
pub mod commands;
pub mod config;
pub mod dom;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod format;
pub mod model;
pub mod normalize;
pub mod reveal;
pub mod scheduler;
pub mod selectors;
pub mod sink;
pub mod strategy;
pub mod variants;

pub use classifier::Classification;
pub use config::Config;
pub use engine::{Engine, PageSnapshot};
pub use error::EngineError;
pub use model::{Availability, ExtractionMethod, ProductRecord, VariantOption, Variants};
pub use scheduler::{PageEvent, PageSource, Scheduler, SchedulerConfig};
pub use sink::ReportSink;
