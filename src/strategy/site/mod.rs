//! Retailer-specific strategies, matched by host name.
//!
//! These run before everything else. Each encodes selector sets and option
//! pickers for one retailer whose markup the generic strategies misread.

pub mod amazon;
pub mod beymen;
pub mod trendyol;

pub use amazon::Amazon;
pub use beymen::Beymen;
pub use trendyol::Trendyol;

use super::Strategy;
use crate::dom::Document;

/// Site strategies in evaluation order.
pub fn all() -> Vec<Box<dyn Strategy>> {
    vec![Box::new(Amazon), Box::new(Trendyol), Box::new(Beymen)]
}

/// True when the page host is `domain` or one of its subdomains.
pub fn host_is(page: &Document, domain: &str) -> bool {
    let host = page.host();
    host == domain || host.strip_suffix(domain).is_some_and(|rest| rest.ends_with('.'))
}
