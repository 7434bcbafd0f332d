//! Shopify storefronts.
//!
//! Themes embed the product as JSON (`script[data-product-json]`,
//! `#ProductJson-*`). Prices in that payload are integers in minor units.

use super::{complete, dedupe_all, push_option, OptionKind};
use crate::dom::Document;
use crate::model::{Availability, ExtractionMethod, ProductRecord, VariantOption, Variants};
use crate::normalize::{clean_text, parse_machine_price};
use crate::strategy::common::FieldSelectors;
use crate::strategy::{ExtractContext, Strategy};
use regex_lite::Regex;
use rust_decimal::Decimal;
use scraper::Html;
use serde_json::{json, Value};
use std::sync::LazyLock;
use tracing::trace;

const NAME: &str = "shopify";

const FINGERPRINT: &[&str] = &[
    "script[src*='cdn.shopify.com']",
    "link[href*='cdn.shopify.com']",
    "meta[name='shopify-checkout-api-token']",
    "meta[name='shopify-digital-wallet']",
];

const PAYLOAD: &[&str] = &[
    "script[type='application/json'][data-product-json]",
    "script[data-product-json]",
    "script[id^='ProductJson']",
    "script.product-json",
    "script[type='application/json'][data-product]",
];

static ACTIVE_CURRENCY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"Shopify\.currency\s*=\s*\{\s*"active"\s*:\s*"([A-Z]{3})""#).unwrap());

#[derive(Debug, Default, Clone, Copy)]
pub struct Shopify;

impl Strategy for Shopify {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::platform(NAME)
    }

    fn applicable(&self, page: &Document) -> bool {
        page.exists(FINGERPRINT)
            || !page.scripts_containing("Shopify.shop").is_empty()
            || !page.scripts_containing("ShopifyAnalytics").is_empty()
    }

    fn extract(&self, page: &Document, _ctx: &ExtractContext) -> ProductRecord {
        let payload = product_json(page).map(|product| from_payload(page, &product, self.method()));
        complete(page, payload, &FieldSelectors::GENERIC, self.method())
    }
}

/// The embedded product object, unwrapping `{"product": {...}}`.
fn product_json(page: &Document) -> Option<Value> {
    page.find_all(PAYLOAD).into_iter().find_map(|script| {
        let body = script.text().collect::<String>();
        match serde_json::from_str::<Value>(body.trim()) {
            Ok(Value::Object(mut map)) => match map.remove("product") {
                Some(product @ Value::Object(_)) => Some(product),
                _ => Some(Value::Object(map)),
            },
            Ok(_) => None,
            Err(e) => {
                trace!("Skipping malformed Shopify product JSON: {}", e);
                None
            }
        }
    })
}

fn from_payload(page: &Document, product: &Value, method: ExtractionMethod) -> ProductRecord {
    let mut record = ProductRecord::new(page.url().as_str(), method);
    let variants = product["variants"].as_array().map(Vec::as_slice).unwrap_or_default();
    let selected = selected_variant(page, variants);

    record.title = product["title"].as_str().map(clean_text);
    record.brand = product["vendor"].as_str().map(clean_text);
    record.description = product["description"].as_str().map(html_to_text);

    let source = selected.unwrap_or(product);
    record.price = minor_units(&source["price"]).or_else(|| minor_units(&product["price"]));
    record.original_price =
        minor_units(&source["compare_at_price"]).or_else(|| minor_units(&product["compare_at_price"]));
    record.currency = currency(page);

    if let Some(variant) = selected {
        record.sku = variant["sku"].as_str().map(str::to_string);
        record.availability = variant["available"].as_bool().map(|available| {
            if available {
                Availability::InStock
            } else {
                Availability::OutOfStock
            }
        });
    }

    record.image_url = selected
        .and_then(|v| image_src(&v["featured_image"]))
        .or_else(|| image_src(&product["featured_image"]))
        .or_else(|| product["images"].as_array().and_then(|imgs| imgs.iter().find_map(image_src)))
        .and_then(|src| page.absolutize(&src));

    record.variants = options(product, variants, selected);
    record
}

/// Variant named by the `variant` query parameter, else the first available one.
fn selected_variant<'a>(page: &Document, variants: &'a [Value]) -> Option<&'a Value> {
    let requested = page
        .url()
        .query_pairs()
        .find(|(key, _)| key == "variant")
        .map(|(_, value)| value.into_owned());

    requested
        .and_then(|id| variants.iter().find(|v| v["id"].to_string().trim_matches('"') == id))
        .or_else(|| variants.iter().find(|v| v["available"].as_bool() == Some(true)))
        .or_else(|| variants.first())
}

/// Integer prices are minor units; strings are already major units.
fn minor_units(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => n.as_i64().map(|cents| Decimal::new(cents, 2)),
        Value::String(s) => parse_machine_price(s),
        _ => None,
    }
}

fn currency(page: &Document) -> Option<String> {
    page.scripts_containing("Shopify.currency")
        .iter()
        .find_map(|script| ACTIVE_CURRENCY.captures(script).map(|c| c[1].to_string()))
        .or_else(|| page.meta(&["og:price:currency", "product:price:currency"]))
}

fn image_src(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(map) => map.get("src").and_then(image_src),
        _ => None,
    }
}

fn html_to_text(markup: &str) -> String {
    clean_text(&Html::parse_fragment(markup).root_element().text().collect::<String>())
}

/// Option names come as strings or `{name, values}` objects.
fn option_names(product: &Value) -> Vec<String> {
    product["options"]
        .as_array()
        .map(|opts| {
            opts.iter()
                .filter_map(|o| o.as_str().or_else(|| o["name"].as_str()).map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn options(product: &Value, variants: &[Value], selected: Option<&Value>) -> Variants {
    let mut result = Variants::default();

    for (index, name) in option_names(product).iter().enumerate() {
        // "Title" / "Default Title" marks a product without real options
        if name.eq_ignore_ascii_case("title") {
            continue;
        }
        let key = format!("option{}", index + 1);
        let kind = OptionKind::from_name(name);

        for variant in variants {
            let Some(text) = variant[&key].as_str().map(clean_text).filter(|t| !t.is_empty()) else {
                continue;
            };
            let in_stock = variants
                .iter()
                .any(|v| v[&key].as_str() == Some(text.as_str()) && v["available"].as_bool() == Some(true));
            let is_selected = selected.is_some_and(|s| s[&key].as_str() == Some(text.as_str()));
            let value = match kind {
                OptionKind::Size => json!({ "size": text, "inStock": in_stock }).to_string(),
                _ => text.clone(),
            };
            push_option(&mut result, kind, VariantOption::new(text, is_selected, Some(value)));
        }
    }

    dedupe_all(result)
}
