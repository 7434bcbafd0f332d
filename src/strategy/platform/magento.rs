//! Magento 2 storefronts.
//!
//! Configurable products declare their attributes in a `jsonConfig` (swatch
//! renderer) or `spConfig` (configurable dropdowns) block inside a
//! `text/x-magento-init` script. Prices are exposed as `data-price-amount`.

use super::{complete, dedupe_all, push_option, OptionKind};
use crate::dom::{self, Document};
use crate::model::{ExtractionMethod, ProductRecord, VariantOption, Variants};
use crate::normalize::{find_currency, price_from_json};
use crate::strategy::common::FieldSelectors;
use crate::strategy::{ExtractContext, Strategy};
use serde_json::Value;
use tracing::trace;

const NAME: &str = "magento";

const INIT_SCRIPTS: &[&str] = &["script[type='text/x-magento-init']"];

const FIELDS: FieldSelectors = FieldSelectors {
    title: &["h1.page-title span", "h1.page-title", "[data-ui-id='page-title-wrapper']"],
    price: &[
        ".product-info-main [data-price-type='finalPrice'][data-price-amount]",
        "[data-price-type='finalPrice'][data-price-amount]",
        ".product-info-main .price",
    ],
    original_price: &[
        ".product-info-main [data-price-type='oldPrice'][data-price-amount]",
        "[data-price-type='oldPrice'][data-price-amount]",
    ],
    image: &[
        ".gallery-placeholder img",
        "img.gallery-placeholder__image",
        "[data-gallery-role='gallery-placeholder'] img",
    ],
    description: &[".product.attribute.description .value", "#description", ".product.attribute.overview"],
    sku: &[".product.attribute.sku .value", "[itemprop='sku']"],
    availability: &[".product-info-stock-sku .stock span", ".stock.available", ".stock.unavailable", ".stock"],
    brand: &[".product.attribute.brand .value", "[itemprop='brand']"],
};

#[derive(Debug, Default, Clone, Copy)]
pub struct Magento;

impl Strategy for Magento {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::platform(NAME)
    }

    fn applicable(&self, page: &Document) -> bool {
        page.exists(INIT_SCRIPTS) || page.exists(&["body.catalog-product-view"])
    }

    fn extract(&self, page: &Document, _ctx: &ExtractContext) -> ProductRecord {
        let init = init_blocks(page);
        let payload = init
            .iter()
            .find_map(|block| find_key(block, "jsonConfig").or_else(|| find_key(block, "spConfig")))
            .map(|config| from_config(page, config, &init, self.method()));

        let mut record = complete(page, payload, &FIELDS, self.method());
        // `data-price-amount` carries no symbol; the rendered price does
        if let Some(code) = rendered_currency(page, &init) {
            record.currency = Some(code);
        }
        record
    }
}

fn init_blocks(page: &Document) -> Vec<Value> {
    page.find_all(INIT_SCRIPTS)
        .into_iter()
        .filter_map(|script| {
            let body = script.text().collect::<String>();
            serde_json::from_str::<Value>(body.trim())
                .map_err(|e| trace!("Skipping malformed x-magento-init block: {}", e))
                .ok()
        })
        .collect()
}

/// Depth-first search for the first value stored under `key`.
fn find_key<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(key).or_else(|| map.values().find_map(|v| find_key(v, key))),
        Value::Array(items) => items.iter().find_map(|v| find_key(v, key)),
        _ => None,
    }
}

fn from_config(page: &Document, config: &Value, init: &[Value], method: ExtractionMethod) -> ProductRecord {
    let mut record = ProductRecord::new(page.url().as_str(), method);

    record.price = price_from_json(&config["prices"]["finalPrice"]["amount"]);
    record.original_price = price_from_json(&config["prices"]["oldPrice"]["amount"]);

    let swatches = init.iter().find_map(|block| find_key(block, "jsonSwatchConfig"));
    record.variants = attribute_options(config, swatches);
    record
}

fn attribute_options(config: &Value, swatches: Option<&Value>) -> Variants {
    let mut result = Variants::default();
    let Some(attributes) = config["attributes"].as_object() else {
        return result;
    };

    for (attribute_id, attribute) in attributes {
        let name = attribute["code"].as_str().or_else(|| attribute["label"].as_str()).unwrap_or_default();
        let kind = OptionKind::from_name(name);

        for option in attribute["options"].as_array().into_iter().flatten() {
            let Some(text) = option["label"].as_str().map(str::trim).filter(|t| !t.is_empty()) else {
                continue;
            };
            let option_id = option["id"].as_str().map(str::to_string).unwrap_or_else(|| option["id"].to_string());

            // Swatch colour or image, else the option id
            let value = swatches
                .and_then(|s| s[attribute_id.as_str()][option_id.as_str()]["value"].as_str())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .unwrap_or(option_id);

            push_option(&mut result, kind, VariantOption::new(text, false, Some(value)));
        }
    }

    dedupe_all(result)
}

/// Currency from the rendered price text or the init `priceFormat` pattern.
fn rendered_currency(page: &Document, init: &[Value]) -> Option<String> {
    page.find(&["[data-price-type='finalPrice'] .price", ".price-box .price"])
        .and_then(|el| find_currency(&dom::text(el)))
        .or_else(|| {
            init.iter()
                .find_map(|block| find_key(block, "priceFormat"))
                .and_then(|format| format["pattern"].as_str())
                .and_then(find_currency)
        })
}
