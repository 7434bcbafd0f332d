//! Product page classification.
//!
//! Four independent signals are combined with a logical OR. Nothing here is
//! cached: the page may have changed since the last call.

use crate::dom::{self, Document};
use crate::normalize::parse_price;
use crate::selectors;
use regex_lite::Regex;
use serde::Serialize;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::debug;

/// Path shapes used by product detail pages.
static PRODUCT_PATH: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"/p/",
        r"/product/",
        r"/products/",
        r"/pd/",
        r"-p-\d+",
        r"/dp/[A-Z0-9]{10}",
        r"/gp/product/",
        r"/urun/",
        r"/produkt/",
        r"/produit/",
        r"/prodotto/",
        r"/producto/",
        r"/produto/",
        r"/item/\d+",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Paths that look like product URLs but are listings.
static LISTING_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(collections|category|categories|search|cart|checkout)/?$").unwrap());

/// Minimum DOM indicator score that accepts a page.
pub const DOM_SCORE_THRESHOLD: u32 = 4;

/// Outcome of classifying one page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub url_pattern: bool,
    pub structured_data: bool,
    pub meta_tags: bool,
    pub add_to_cart: bool,
    pub dom_score: u32,
}

impl Classification {
    /// True when any strong signal fires or the DOM score reaches the threshold.
    pub fn is_product_page(&self) -> bool {
        self.url_pattern
            || self.structured_data
            || self.meta_tags
            || self.add_to_cart
            || self.dom_score >= DOM_SCORE_THRESHOLD
    }
}

/// Runs every signal against the page.
pub fn classify(page: &Document) -> Classification {
    let classification = Classification {
        url_pattern: url_matches(page),
        structured_data: page.json_ld().iter().any(|doc| find_product(doc).is_some()),
        meta_tags: meta_signal(page),
        add_to_cart: has_add_to_cart(page),
        dom_score: dom_score(page),
    };

    debug!("Classified {}: {:?}", page.url(), classification);
    classification
}

/// Checks the URL path against known product path shapes.
pub fn url_matches(page: &Document) -> bool {
    let path = page.url().path();
    if path == "/" || LISTING_PATH.is_match(path) {
        return false;
    }
    PRODUCT_PATH.iter().any(|re| re.is_match(path))
}

/// Finds the first JSON object typed `Product`, searching arrays and
/// nested objects (`@graph`, `mainEntity`, ...) in any order.
pub fn find_product(value: &Value) -> Option<&Value> {
    match value {
        Value::Object(map) => {
            if map.get("@type").is_some_and(is_product_type) {
                return Some(value);
            }
            map.values().find_map(find_product)
        }
        Value::Array(items) => items.iter().find_map(find_product),
        _ => None,
    }
}

fn is_product_type(kind: &Value) -> bool {
    let matches = |s: &str| {
        let s = s.rsplit('/').next().unwrap_or(s);
        s.eq_ignore_ascii_case("Product") || s.eq_ignore_ascii_case("ProductGroup")
    };
    match kind {
        Value::String(s) => matches(s),
        Value::Array(items) => items.iter().filter_map(Value::as_str).any(matches),
        _ => false,
    }
}

fn meta_signal(page: &Document) -> bool {
    let og_product = page
        .meta(&["og:type"])
        .is_some_and(|t| t.eq_ignore_ascii_case("product") || t.eq_ignore_ascii_case("og:product"));

    og_product || page.meta(&["product:price:amount", "og:price:amount"]).is_some()
}

/// Add-to-cart form or button, by selector or by localized button text.
pub fn has_add_to_cart(page: &Document) -> bool {
    if page.exists(selectors::ADD_TO_CART) {
        return true;
    }

    page.find_all(selectors::BUTTONS).into_iter().any(|button| {
        let label = dom::text(button).to_lowercase();
        let label = if label.is_empty() { dom::attr(button, "value", "").to_lowercase() } else { label };
        selectors::ADD_TO_CART_TEXT.iter().any(|phrase| label.contains(phrase))
    })
}

/// Weighted sum of weak DOM indicators.
pub fn dom_score(page: &Document) -> u32 {
    let mut score = 0;

    let priced = page.find_all(selectors::PRICE).into_iter().any(|el| {
        let raw = el.value().attr("content").map(str::to_string).unwrap_or_else(|| dom::text(el));
        raw.len() < 64 && parse_price(&raw).is_some()
    });
    if priced {
        score += 2;
    }
    if page.exists(selectors::TITLE) {
        score += 2;
    }
    if page.exists(selectors::GALLERY) {
        score += 1;
    }
    if page.exists(selectors::DESCRIPTION) {
        score += 1;
    }

    score
}
