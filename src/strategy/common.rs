//! Generic DOM extraction with ordered selector lists per field.
//!
//! Site and platform strategies reuse [`extract_fields`] with their own
//! selector sets and price format.

use super::{ExtractContext, Strategy};
use crate::dom::{self, Document};
use crate::model::{ExtractionMethod, ProductRecord};
use crate::normalize::{
    clean_text, find_currency, format_availability, parse_price_with, DecimalConvention, DEFAULT_CURRENCY,
};
use crate::selectors;
use crate::variants::VariantCollector;
use rust_decimal::Decimal;
use scraper::ElementRef;

/// Price texts longer than this belong to a container, not a price.
const MAX_PRICE_TEXT: usize = 64;

/// Separators between product name and shop name in `<title>`.
const TITLE_SEPARATORS: &[&str] = &[" | ", "|", " - ", " – ", " — ", " :: "];

/// Ordered selector lists for each record field.
#[derive(Debug, Clone, Copy)]
pub struct FieldSelectors {
    pub title: &'static [&'static str],
    pub price: &'static [&'static str],
    pub original_price: &'static [&'static str],
    pub image: &'static [&'static str],
    pub description: &'static [&'static str],
    pub sku: &'static [&'static str],
    pub availability: &'static [&'static str],
    pub brand: &'static [&'static str],
}

impl FieldSelectors {
    pub const GENERIC: FieldSelectors = FieldSelectors {
        title: selectors::TITLE,
        price: selectors::PRICE,
        original_price: selectors::ORIGINAL_PRICE,
        image: selectors::IMAGE,
        description: selectors::DESCRIPTION,
        sku: selectors::SKU,
        availability: selectors::AVAILABILITY,
        brand: selectors::BRAND,
    };
}

/// How prices on a page are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceFormat {
    pub convention: DecimalConvention,
    /// Currency known from the site, overriding symbol detection.
    pub currency: Option<&'static str>,
}

impl Default for PriceFormat {
    fn default() -> Self {
        Self { convention: DecimalConvention::Continental, currency: None }
    }
}

/// The generic selector strategy.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommonSelectors;

impl Strategy for CommonSelectors {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::CommonSelectors
    }

    fn applicable(&self, _page: &Document) -> bool {
        true
    }

    fn extract(&self, page: &Document, _ctx: &ExtractContext) -> ProductRecord {
        extract_fields(
            page,
            &FieldSelectors::GENERIC,
            PriceFormat::default(),
            &VariantCollector::default(),
            self.method(),
        )
    }
}

/// Fills a record field by field from selector lists.
pub fn extract_fields(
    page: &Document,
    fields: &FieldSelectors,
    format: PriceFormat,
    variants: &VariantCollector,
    method: ExtractionMethod,
) -> ProductRecord {
    let mut record = ProductRecord::new(page.url().as_str(), method);

    record.title = page
        .find(fields.title)
        .map(dom::text)
        .filter(|t| !t.is_empty())
        .or_else(|| page.title().and_then(|t| title_from_document(&t)));

    if let Some((price, raw)) = first_price(page, fields.price, format.convention) {
        record.price = Some(price);
        record.currency = Some(resolve_currency(page, &raw, format));
    }
    record.original_price = first_price(page, fields.original_price, format.convention).map(|(p, _)| p);

    record.image_url = page
        .find(fields.image)
        .and_then(|el| page.image_src(el))
        .or_else(|| page.meta(&["og:image"]).and_then(|src| page.absolutize(&src)));

    record.description = page.find(fields.description).map(dom::text);
    record.sku = page.find(fields.sku).map(|el| content_or_text(el, &["content", "data-sku"]));
    record.availability = page
        .find(fields.availability)
        .map(|el| format_availability(&content_or_text(el, &["content", "href"])));
    record.brand = page.find(fields.brand).map(|el| content_or_text(el, &["content"]));

    record.variants = variants.collect(page);
    record.finish()
}

/// First element in `list` carrying a parsable price, with its raw text.
pub fn first_price(
    page: &Document,
    list: &[&str],
    convention: DecimalConvention,
) -> Option<(Decimal, String)> {
    page.find_all(list).into_iter().find_map(|el| {
        let raw = price_text(el);
        if raw.is_empty() || raw.len() > MAX_PRICE_TEXT {
            return None;
        }
        parse_price_with(&raw, convention).map(|price| (price, raw))
    })
}

/// Price text of an element: machine `content`, else the sale (`ins`) part,
/// else the text without struck-through parts.
pub fn price_text(element: ElementRef<'_>) -> String {
    if let Some(content) = element.value().attr("content").map(clean_text).filter(|c| !c.is_empty()) {
        return content;
    }
    if let Some(amount) = element.value().attr("data-price-amount") {
        return clean_text(amount);
    }
    if let Some(sale) = dom::find_within(element, &["ins"]) {
        return dom::text(sale);
    }
    dom::text_excluding_struck(element)
}

/// Site currency, else a symbol in the price text, else page metadata,
/// else the default.
fn resolve_currency(page: &Document, raw: &str, format: PriceFormat) -> String {
    if let Some(code) = format.currency {
        return code.to_string();
    }
    find_currency(raw)
        .or_else(|| {
            page.find(&["[itemprop='priceCurrency']"])
                .map(|el| content_or_text(el, &["content"]))
                .filter(|c| !c.is_empty())
        })
        .or_else(|| page.meta(&["product:price:currency", "og:price:currency"]))
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string())
}

/// First non-empty attribute among `attrs`, else the element text.
pub fn content_or_text(element: ElementRef<'_>, attrs: &[&str]) -> String {
    attrs
        .iter()
        .filter_map(|name| element.value().attr(name))
        .map(clean_text)
        .find(|v| !v.is_empty())
        .unwrap_or_else(|| dom::text(element))
}

/// Product name from a document title such as `Classic Tee | Shop`.
pub fn title_from_document(title: &str) -> Option<String> {
    let title = clean_text(title);
    let head = TITLE_SEPARATORS
        .iter()
        .find_map(|sep| title.split_once(sep).map(|(head, _)| head.trim().to_string()))
        .unwrap_or(title);
    (!head.is_empty()).then_some(head)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn page(url: &str, markup: &str) -> Document {
        Document::parse(url, markup).unwrap()
    }

    fn run(markup: &str) -> ProductRecord {
        CommonSelectors.extract(&page("https://shop.test/products/tee", markup), &ExtractContext::default())
    }

    #[test]
    fn test_classic_tee() {
        let record = run(r#"<h1>Classic Tee</h1><div class="price">$25.00</div>"#);
        assert!(record.success);
        assert_eq!(record.title.as_deref(), Some("Classic Tee"));
        assert_eq!(record.price, Some(Decimal::from_str("25.00").unwrap()));
        assert_eq!(record.currency.as_deref(), Some("USD"));
        assert_eq!(record.extraction_method, Some(ExtractionMethod::CommonSelectors));
    }

    #[test]
    fn test_sale_price_skips_struck_text() {
        let record = run(
            r#"<h1>Linen Shirt</h1>
               <div class="product-price"><del>€59,90</del> <ins>€39,90</ins></div>
               <div class="price"><s class="original-price">€59,90</s></div>"#,
        );
        assert_eq!(record.price, Some(Decimal::from_str("39.90").unwrap()));
        assert_eq!(record.original_price, Some(Decimal::from_str("59.90").unwrap()));
        assert_eq!(record.currency.as_deref(), Some("EUR"));
    }

    #[test]
    fn test_title_falls_back_to_document_title() {
        let record = run(r#"<head><title>Wool Scarf | Cozy Shop</title></head><span class="price">12,00 €</span>"#);
        assert_eq!(record.title.as_deref(), Some("Wool Scarf"));
        assert!(record.success);
    }

    #[test]
    fn test_microdata_fields() {
        let record = run(
            r#"<div itemscope itemtype="https://schema.org/Product">
                <h1 itemprop="name">Trail Shoe</h1>
                <meta itemprop="price" content="89.99">
                <meta itemprop="priceCurrency" content="GBP">
                <link itemprop="availability" href="https://schema.org/InStock">
                <span itemprop="sku">TS-100</span>
                <div itemprop="brand"><span itemprop="name">Peak</span></div>
                <img itemprop="image" src="/img/shoe.jpg">
            </div>"#,
        );
        assert!(record.success);
        assert_eq!(record.price, Some(Decimal::from_str("89.99").unwrap()));
        assert_eq!(record.currency.as_deref(), Some("GBP"));
        assert_eq!(record.sku.as_deref(), Some("TS-100"));
        assert_eq!(record.brand.as_deref(), Some("Peak"));
        assert_eq!(record.availability, Some(crate::model::Availability::InStock));
        assert_eq!(record.image_url.as_deref(), Some("https://shop.test/img/shoe.jpg"));
    }

    #[test]
    fn test_missing_price_is_failure_record() {
        let record = run(r#"<h1>Only a title</h1>"#);
        assert!(!record.success);
        assert_eq!(record.title.as_deref(), Some("Only a title"));
        assert!(record.price.is_none());
    }

    #[test]
    fn test_title_from_document() {
        assert_eq!(title_from_document("Tee - Brand").as_deref(), Some("Tee"));
        assert_eq!(title_from_document("Just Tee").as_deref(), Some("Just Tee"));
        assert_eq!(title_from_document(" | Shop"), None);
    }
}
