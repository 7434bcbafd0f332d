//! Open Graph, Twitter Card and `product:*` meta tags.

use super::{ExtractContext, Strategy};
use crate::dom::Document;
use crate::model::{ExtractionMethod, ProductRecord};
use crate::normalize::{detect_currency, find_currency, format_availability, parse_machine_price, parse_price};
use crate::variants::VariantCollector;

const TITLE: &[&str] = &["og:title", "twitter:title", "product:title"];
const PRICE: &[&str] = &["product:price:amount", "og:price:amount", "product:sale_price:amount"];
const CURRENCY: &[&str] = &["product:price:currency", "og:price:currency"];
const ORIGINAL_PRICE: &[&str] = &["product:original_price:amount", "og:original_price:amount"];
const IMAGE: &[&str] = &["og:image:secure_url", "og:image", "twitter:image", "twitter:image:src"];
const DESCRIPTION: &[&str] = &["og:description", "twitter:description", "description"];
const AVAILABILITY: &[&str] = &["product:availability", "og:availability"];
const BRAND: &[&str] = &["product:brand", "og:brand"];
const SKU: &[&str] = &["product:retailer_item_id", "product:sku"];

/// Twitter "label/data" pairs often hold a formatted price.
const TWITTER_DATA: &[&str] = &["twitter:data1", "twitter:data2"];

#[derive(Debug, Default, Clone, Copy)]
pub struct MetaTags;

impl Strategy for MetaTags {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::MetaTags
    }

    fn applicable(&self, page: &Document) -> bool {
        page.meta(TITLE).is_some() || page.meta(PRICE).is_some()
    }

    fn extract(&self, page: &Document, _ctx: &ExtractContext) -> ProductRecord {
        let mut record = ProductRecord::new(page.url().as_str(), self.method());

        record.title = page.meta(TITLE);

        if let Some(amount) = page.meta(PRICE) {
            record.price = parse_machine_price(&amount);
            record.currency = Some(page.meta(CURRENCY).unwrap_or_else(|| detect_currency(&amount)));
        } else if let Some(data) = page.meta(TWITTER_DATA).filter(|d| find_currency(d).is_some()) {
            // "$25.00" style card data: only trusted when it names a currency
            record.price = parse_price(&data);
            record.currency = find_currency(&data);
        }

        record.original_price = page.meta(ORIGINAL_PRICE).and_then(|p| parse_machine_price(&p));
        record.image_url = page.meta(IMAGE).and_then(|src| page.absolutize(&src));
        record.description = page.meta(DESCRIPTION);
        record.availability = page.meta(AVAILABILITY).map(|a| format_availability(&a));
        record.brand = page.meta(BRAND);
        record.sku = page.meta(SKU);
        record.variants = VariantCollector::default().collect(page);

        record.finish()
    }
}
