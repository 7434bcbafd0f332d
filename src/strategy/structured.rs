//! JSON-LD `Product` extraction.

use super::{ExtractContext, Strategy};
use crate::classifier::find_product;
use crate::dom::Document;
use crate::model::{Availability, ExtractionMethod, ProductRecord, VariantOption};
use crate::normalize::{clean_text, format_availability, price_from_json, DEFAULT_CURRENCY};
use crate::variants::{dedupe, VariantCollector};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tracing::trace;

#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredData;

impl Strategy for StructuredData {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::StructuredData
    }

    fn applicable(&self, page: &Document) -> bool {
        page.json_ld().iter().any(|doc| find_product(doc).is_some())
    }

    fn extract(&self, page: &Document, _ctx: &ExtractContext) -> ProductRecord {
        let documents = page.json_ld();
        let Some(product) = documents.iter().find_map(find_product) else {
            trace!("No Product node in JSON-LD");
            return ProductRecord::new(page.url().as_str(), self.method()).finish();
        };

        let mut record = product_record(page, product, self.method());
        if record.variants.is_empty() {
            record.variants = VariantCollector::default().collect(page);
        }
        record.finish()
    }
}

/// Maps one `Product` node onto a record. Also used by platform strategies
/// whose payloads follow schema.org.
pub fn product_record(page: &Document, product: &Value, method: ExtractionMethod) -> ProductRecord {
    let mut record = ProductRecord::new(page.url().as_str(), method);

    record.title = string_field(&product["name"]);
    record.description = string_field(&product["description"]);
    record.sku = string_field(&product["sku"]).or_else(|| string_field(&product["mpn"]));
    record.brand = match &product["brand"] {
        Value::Object(brand) => brand.get("name").and_then(string_field),
        other => string_field(other),
    };
    record.image_url = image_field(&product["image"]).and_then(|src| page.absolutize(&src));

    let offers = offer_list(&product["offers"]);
    if let Some(offer) = offers.iter().find(|o| offer_price(o).is_some()) {
        record.price = offer_price(offer);
        record.currency = string_field(&offer["priceCurrency"])
            .or_else(|| string_field(&offer["priceSpecification"]["priceCurrency"]));
        record.availability = string_field(&offer["availability"]).map(|a| format_availability(&a));
    }

    // Aggregate offers: a high price above the low price means a sale
    let aggregate = &product["offers"];
    if let (Some(low), Some(high)) =
        (price_from_json(&aggregate["lowPrice"]), price_from_json(&aggregate["highPrice"]))
    {
        if high > low {
            record.price = Some(low);
            record.original_price = Some(high);
        }
        if record.currency.is_none() {
            record.currency = string_field(&aggregate["priceCurrency"]);
        }
    }

    if record.price.is_some() && record.currency.is_none() {
        record.currency = Some(DEFAULT_CURRENCY.to_string());
    }

    let mut colors = Vec::new();
    let mut sizes = Vec::new();
    for offer in &offers {
        collect_offer_variant(offer, &mut colors, &mut sizes);
    }
    for variant in product["hasVariant"].as_array().into_iter().flatten() {
        for offer in offer_list(&variant["offers"]) {
            collect_offer_variant(&merge_variant(variant, offer), &mut colors, &mut sizes);
        }
    }
    record.variants.colors = dedupe(colors);
    record.variants.sizes = dedupe(sizes);

    record
}

/// `offers` may be a single offer, an aggregate with nested offers, or a list.
fn offer_list(offers: &Value) -> Vec<&Value> {
    match offers {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => match map.get("offers") {
            Some(nested @ (Value::Array(_) | Value::Object(_))) => {
                let mut list = vec![offers];
                list.extend(offer_list(nested));
                list
            }
            _ => vec![offers],
        },
        _ => Vec::new(),
    }
}

fn offer_price(offer: &Value) -> Option<Decimal> {
    price_from_json(&offer["price"])
        .or_else(|| price_from_json(&offer["priceSpecification"]["price"]))
        .or_else(|| price_from_json(&offer["lowPrice"]))
}

/// Variant attributes live on the offer or on its `itemOffered`.
fn collect_offer_variant(offer: &Value, colors: &mut Vec<VariantOption>, sizes: &mut Vec<VariantOption>) {
    let item = &offer["itemOffered"];
    let attr = |key: &str| string_field(&offer[key]).or_else(|| string_field(&item[key]));

    let in_stock = string_field(&offer["availability"])
        .map(|a| !matches!(format_availability(&a), Availability::OutOfStock))
        .unwrap_or(true);

    if let Some(color) = attr("color") {
        colors.push(VariantOption::new(color.clone(), false, Some(color)));
    }
    if let Some(size) = attr("size") {
        let value = json!({ "size": size, "inStock": in_stock }).to_string();
        sizes.push(VariantOption::new(size, false, Some(value)));
    }
}

/// Lifts a `hasVariant` product's size and colour onto its offer.
fn merge_variant(variant: &Value, offer: &Value) -> Value {
    let mut merged = offer.clone();
    if let Value::Object(map) = &mut merged {
        for key in ["size", "color"] {
            if let Some(value) = variant.get(key) {
                map.entry(key).or_insert_with(|| value.clone());
            }
        }
    }
    merged
}

/// Text from a string, number or `{name}`/`{@value}` node.
fn string_field(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => clean_text(s),
        Value::Number(n) => n.to_string(),
        Value::Object(map) => return map.get("name").or_else(|| map.get("@value")).and_then(string_field),
        Value::Array(items) => return items.iter().find_map(string_field),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// First URL from a string, list, or `ImageObject`.
fn image_field(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Array(items) => items.iter().find_map(image_field),
        Value::Object(map) => map.get("url").or_else(|| map.get("contentUrl")).and_then(image_field),
        _ => None,
    }
}
