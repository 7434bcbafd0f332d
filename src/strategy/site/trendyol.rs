//! Trendyol product pages.
//!
//! The product detail app hydrates from
//! `window.__PRODUCT_DETAIL_APP_INITIAL_STATE__ = {...};`. When that payload
//! is missing or malformed the rendered markup is read instead.

use super::host_is;
use crate::dom::{self, Document};
use crate::model::{Availability, ExtractionMethod, ProductRecord, VariantOption, Variants};
use crate::normalize::{clean_text, price_from_json, DecimalConvention};
use crate::strategy::common::{extract_fields, FieldSelectors, PriceFormat};
use crate::strategy::{ExtractContext, Strategy};
use crate::variants::{dedupe, VariantCollector, VariantSelectors};
use serde_json::{json, Value};
use tracing::{debug, trace};

const NAME: &str = "trendyol";
const DOMAIN: &str = "trendyol.com";
const STATE_MARKER: &str = "__PRODUCT_DETAIL_APP_INITIAL_STATE__";
const IMAGE_CDN: &str = "https://cdn.dsmcdn.com";
const CURRENCY: &str = "TRY";

const FIELDS: FieldSelectors = FieldSelectors {
    title: &["h1.pr-new-br span", "h1.pr-new-br", ".product-name-container h1", "h1"],
    price: &[".product-price-container .prc-dsc", ".prc-dsc", ".product-price-container .prc-slg"],
    original_price: &[".product-price-container .prc-org", ".prc-org"],
    image: &[".base-product-image img", ".gallery-modal-content img", ".product-slide img"],
    description: &[".detail-desc-list", ".info-wrapper"],
    sku: &[],
    availability: &[".sold-out-text", ".pr-in-sold-out"],
    brand: &["h1.pr-new-br a", ".product-brand-name-with-link", ".product-brand-name-without-link"],
};

const VARIANTS: VariantSelectors = VariantSelectors {
    colors: &[".slicing-attributes .slc-img", ".styles-module_slider__o0fqa a[title]", ".slc-img"],
    sizes: &[".variants .sp-itm", ".size-variant-wrapper .sp-itm", ".sp-itm"],
    other: &[],
};

#[derive(Debug, Default, Clone, Copy)]
pub struct Trendyol;

impl Strategy for Trendyol {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::site(NAME)
    }

    fn applicable(&self, page: &Document) -> bool {
        host_is(page, DOMAIN)
    }

    fn extract(&self, page: &Document, _ctx: &ExtractContext) -> ProductRecord {
        let format = PriceFormat { convention: DecimalConvention::Thousands, currency: Some(CURRENCY) };
        let mut rendered = extract_fields(page, &FIELDS, format, &VariantCollector::new(VARIANTS), self.method());
        rendered.variants.sizes = dom_sizes(page);

        match initial_state(page).and_then(|state| from_state(page, &state, self.method())) {
            Some(mut record) => {
                debug!("Trendyol payload found for {}", page.url());
                record.fill_from(&rendered);
                record.finish()
            }
            None => rendered.finish(),
        }
    }
}

/// The hydration object, parsed up to its closing brace.
fn initial_state(page: &Document) -> Option<Value> {
    page.scripts_containing(STATE_MARKER).iter().find_map(|script| {
        let start = script.find(STATE_MARKER)?;
        let rest = &script[start + STATE_MARKER.len()..];
        let body = rest[rest.find('=')? + 1..].trim_start();

        // Trailing `;` and any later statements are left unread
        match serde_json::Deserializer::from_str(body).into_iter::<Value>().next() {
            Some(Ok(value)) => Some(value),
            Some(Err(e)) => {
                trace!("Skipping malformed Trendyol state: {}", e);
                None
            }
            None => None,
        }
    })
}

fn from_state(page: &Document, state: &Value, method: ExtractionMethod) -> Option<ProductRecord> {
    let product = state.get("product").filter(|p| p.is_object())?;
    let mut record = ProductRecord::new(page.url().as_str(), method);

    record.title = product["name"].as_str().map(clean_text);
    record.brand = product["brand"]["name"].as_str().map(clean_text);
    record.sku = product["productCode"]
        .as_str()
        .map(str::to_string)
        .or_else(|| product["id"].as_i64().map(|id| id.to_string()));

    let price = &product["price"];
    record.price = price_from_json(&price["discountedPrice"]["value"])
        .or_else(|| price_from_json(&price["sellingPrice"]["value"]));
    record.original_price = price_from_json(&price["originalPrice"]["value"]);
    record.currency = Some(price["currency"].as_str().unwrap_or(CURRENCY).to_string());

    record.image_url = product["images"]
        .as_array()
        .and_then(|images| images.iter().find_map(Value::as_str))
        .and_then(image_url);

    record.description = product["contentDescriptions"].as_array().map(|items| {
        let lines: Vec<String> =
            items.iter().filter_map(|d| d["description"].as_str()).map(clean_text).collect();
        lines.join(" ")
    });

    record.availability = product["hasStock"]
        .as_bool()
        .or_else(|| product["inStock"].as_bool())
        .map(|stock| if stock { Availability::InStock } else { Availability::OutOfStock });

    record.variants = Variants {
        colors: product["color"]
            .as_str()
            .map(|color| vec![VariantOption::new(clean_text(color), true, None)])
            .unwrap_or_default(),
        sizes: state_sizes(product),
        other_options: Vec::new(),
    };

    Some(record)
}

/// CDN paths come relative to the image host.
fn image_url(path: &str) -> Option<String> {
    if path.starts_with("http") {
        Some(path.to_string())
    } else if path.starts_with('/') {
        Some(format!("{IMAGE_CDN}{path}"))
    } else if !path.is_empty() {
        Some(format!("{IMAGE_CDN}/{path}"))
    } else {
        None
    }
}

fn state_sizes(product: &Value) -> Vec<VariantOption> {
    let list = product["allVariants"]
        .as_array()
        .filter(|v| !v.is_empty())
        .or_else(|| product["variants"].as_array())
        .map(Vec::as_slice)
        .unwrap_or_default();

    let sizes = list
        .iter()
        .filter_map(|variant| {
            let size = variant["value"]
                .as_str()
                .or_else(|| variant["attributeValue"].as_str())
                .map(clean_text)
                .filter(|s| !s.is_empty())?;
            let in_stock = variant["inStock"]
                .as_bool()
                .or_else(|| variant["stock"].as_i64().map(|n| n > 0))
                .unwrap_or(true);
            let value = json!({ "size": size, "inStock": in_stock }).to_string();
            Some(VariantOption::new(size, false, Some(value)))
        })
        .collect();

    dedupe(sizes)
}

/// Size buttons: `so` marks sold out, `selected` the chosen one.
fn dom_sizes(page: &Document) -> Vec<VariantOption> {
    let sizes = page
        .find_all(VARIANTS.sizes)
        .into_iter()
        .filter_map(|item| {
            let size = dom::text(item);
            if size.is_empty() {
                return None;
            }
            let class = dom::attr(item, "class", "");
            let classes: Vec<&str> = class.split_whitespace().collect();
            let in_stock = !classes.iter().any(|c| *c == "so" || c.contains("disabled"));
            let value = json!({ "size": size, "inStock": in_stock }).to_string();
            Some(VariantOption::new(size, classes.contains(&"selected"), Some(value)))
        })
        .collect();

    dedupe(sizes)
}
