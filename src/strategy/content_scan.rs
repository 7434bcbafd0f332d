//! Last-resort free-text scan.
//!
//! Every visible text node is searched for currency amounts. The amount
//! closest to the title element wins, and the largest visible image becomes
//! the product image.

use super::common::title_from_document;
use super::{ExtractContext, Strategy};
use crate::dom::{self, Document, Rect};
use crate::model::{ExtractionMethod, ProductRecord};
use crate::normalize::{find_currency, parse_price, DEFAULT_CURRENCY};
use crate::selectors;
use regex_lite::Regex;
use rust_decimal::Decimal;
use std::sync::LazyLock;
use tracing::trace;

/// A currency symbol or code next to an amount, on either side. The grouped
/// branch needs at least one separator group, so ungrouped runs of digits
/// fall through to the plain branch whole.
static MONEY: LazyLock<Regex> = LazyLock::new(|| {
    let symbol = r"(?:US\$|C\$|A\$|R\$|[$€£₺¥₹₽]|TL|TRY|EUR|USD|GBP|CHF|zł)";
    let amount = r"\d{1,3}(?:[.,]\d{3})+(?:[.,]\d{1,2})?|\d+(?:[.,]\d{1,2})?";
    Regex::new(&format!(r"{symbol}\s?(?:{amount})|(?:{amount})\s?{symbol}")).unwrap()
});

/// One amount found in the page text.
#[derive(Debug, Clone)]
struct Candidate {
    price: Decimal,
    currency: Option<String>,
    rect: Rect,
    struck: bool,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ContentScan;

impl Strategy for ContentScan {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::ContentScan
    }

    fn applicable(&self, _page: &Document) -> bool {
        true
    }

    fn extract(&self, page: &Document, ctx: &ExtractContext) -> ProductRecord {
        let mut record = ProductRecord::new(page.url().as_str(), self.method());

        let title_element = page.find(selectors::TITLE).filter(|el| !dom::text(*el).is_empty());
        record.title = title_element
            .map(dom::text)
            .or_else(|| page.title().and_then(|t| title_from_document(&t)));
        let anchor = title_element.map(|el| page.rect(el)).unwrap_or_default();

        let candidates = scan(page);
        trace!("Content scan found {} amounts", candidates.len());

        let nearest = |struck: bool| {
            candidates
                .iter()
                .filter(|c| c.struck == struck)
                .min_by(|a, b| a.rect.distance(&anchor).total_cmp(&b.rect.distance(&anchor)))
        };

        if let Some(primary) = nearest(false) {
            record.price = Some(primary.price);
            record.currency =
                Some(primary.currency.clone().unwrap_or_else(|| DEFAULT_CURRENCY.to_string()));
            record.original_price = nearest(true).map(|c| c.price).filter(|p| *p > primary.price);
        }

        let settings = &ctx.settings;
        record.image_url = page
            .largest_visible_image(settings.min_image_side, settings.preferred_image_side)
            .and_then(|img| page.image_src(img))
            .or_else(|| page.meta(&["og:image"]).and_then(|src| page.absolutize(&src)));

        record.finish()
    }
}

/// Currency amounts in visible text nodes.
fn scan(page: &Document) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    for node in page.text_nodes() {
        if !page.is_visible(node.element) {
            continue;
        }
        let struck = dom::within_tag(node.element, &["del", "s", "strike"])
            || page.computed_style(node.element, "text-decoration").contains("line-through");

        for found in MONEY.find_iter(&node.text) {
            let raw = found.as_str();
            let Some(price) = parse_price(raw) else {
                continue;
            };
            candidates.push(Candidate {
                price,
                currency: find_currency(raw),
                rect: page.rect(node.element),
                struck,
            });
        }
    }

    candidates
}
