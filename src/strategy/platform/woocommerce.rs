//! WooCommerce storefronts.
//!
//! Variable products carry every variation as JSON in the
//! `data-product_variations` attribute of `form.variations_form`.

use super::{complete, dedupe_all, push_option, OptionKind};
use crate::dom::{self, Document};
use crate::model::{ExtractionMethod, ProductRecord, VariantOption, Variants};
use crate::normalize::{find_currency, price_from_json};
use crate::selectors;
use crate::strategy::common::FieldSelectors;
use crate::strategy::{ExtractContext, Strategy};
use serde_json::{json, Value};
use tracing::trace;

const NAME: &str = "woocommerce";

const FINGERPRINT: &[&str] = &[
    "body[class*='woocommerce']",
    "form.variations_form",
    ".woocommerce-product-gallery",
    "link[href*='woocommerce']",
];

const FIELDS: FieldSelectors = FieldSelectors {
    title: &["h1.product_title", ".summary .product_title", "h1.entry-title"],
    price: &[".summary p.price", ".summary .price", "p.price", ".woocommerce-variation-price .price"],
    original_price: &[".summary p.price del .amount", ".summary .price del .amount", "p.price del"],
    image: &[
        ".woocommerce-product-gallery__image a",
        ".woocommerce-product-gallery__image img",
        ".wp-post-image",
    ],
    description: &[
        ".woocommerce-product-details__short-description",
        "#tab-description",
        ".woocommerce-Tabs-panel--description",
    ],
    sku: &[".sku_wrapper .sku", ".sku"],
    availability: &[".summary .stock", ".stock"],
    brand: selectors::BRAND,
};

#[derive(Debug, Default, Clone, Copy)]
pub struct WooCommerce;

impl Strategy for WooCommerce {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::platform(NAME)
    }

    fn applicable(&self, page: &Document) -> bool {
        page.exists(FINGERPRINT)
    }

    fn extract(&self, page: &Document, _ctx: &ExtractContext) -> ProductRecord {
        let payload = variations(page).map(|list| from_variations(page, &list, self.method()));
        complete(page, payload, &FIELDS, self.method())
    }
}

fn variations(page: &Document) -> Option<Vec<Value>> {
    let form = page.find(&["form.variations_form[data-product_variations]"])?;
    let raw = form.value().attr("data-product_variations")?;
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(list)) if !list.is_empty() => Some(list),
        Ok(_) => None,
        Err(e) => {
            trace!("Skipping malformed variation data: {}", e);
            None
        }
    }
}

/// Variation payload: lowest price, variant lists labelled from the
/// attribute dropdowns. Title and the rest come from the page selectors.
fn from_variations(page: &Document, list: &[Value], method: ExtractionMethod) -> ProductRecord {
    let mut record = ProductRecord::new(page.url().as_str(), method);

    let cheapest = list
        .iter()
        .filter_map(|v| price_from_json(&v["display_price"]).map(|p| (p, v)))
        .min_by(|a, b| a.0.cmp(&b.0));
    if let Some((price, variation)) = cheapest {
        record.price = Some(price);
        record.original_price = price_from_json(&variation["display_regular_price"]);
        record.sku = variation["sku"].as_str().filter(|s| !s.is_empty()).map(str::to_string);
        record.image_url = variation["image"]["full_src"]
            .as_str()
            .or_else(|| variation["image"]["src"].as_str())
            .and_then(|src| page.absolutize(src));
    }

    // The page price carries the currency symbol; prefer it when present
    if let Some(symbol) = page.find(&[".woocommerce-Price-currencySymbol"]).map(dom::text) {
        record.currency = find_currency(&symbol);
    }

    record.variants = attribute_options(page, list);
    record
}

fn attribute_options(page: &Document, list: &[Value]) -> Variants {
    let mut result = Variants::default();

    for select in page.find_all(&["form.variations_form select[name^='attribute_']"]) {
        let name = dom::attr(select, "name", "");
        let kind = OptionKind::from_name(&name);

        for option in dom::find_all_within(select, &["option"]) {
            let slug = dom::attr(option, "value", "");
            let text = dom::text(option);
            if slug.is_empty() || text.is_empty() {
                continue;
            }

            // An empty attribute value in a variation means "any"
            let in_stock = list.iter().any(|v| {
                let attr = v["attributes"][&name].as_str().unwrap_or_default();
                (attr.is_empty() || attr == slug) && v["is_in_stock"].as_bool() != Some(false)
            });
            let value = match kind {
                OptionKind::Size => json!({ "size": text, "value": slug, "inStock": in_stock }).to_string(),
                _ => slug,
            };
            let selected = option.value().attr("selected").is_some();
            push_option(&mut result, kind, VariantOption::new(text, selected, Some(value)));
        }
    }

    dedupe_all(result)
}
