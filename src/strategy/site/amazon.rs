//! Amazon product detail pages across marketplaces.
//!
//! The marketplace table fixes currency and decimal convention per domain, so
//! `¥2,999` on amazon.co.jp and `2.999,00 €` on amazon.de both parse right.
//! Update the selector lists here when Amazon changes its markup.

use super::host_is;
use crate::dom::{self, Document};
use crate::model::{ExtractionMethod, ProductRecord};
use crate::normalize::{clean_text, DecimalConvention};
use crate::strategy::common::{extract_fields, FieldSelectors, PriceFormat};
use crate::strategy::{ExtractContext, Strategy};
use crate::variants::{VariantCollector, VariantSelectors};
use regex_lite::Regex;
use std::sync::LazyLock;
use tracing::{debug, warn};
use DecimalConvention::{Point, Thousands};

const NAME: &str = "amazon";

/// One Amazon marketplace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marketplace {
    pub domain: &'static str,
    pub currency: &'static str,
    pub convention: DecimalConvention,
}

const fn market(domain: &'static str, currency: &'static str, convention: DecimalConvention) -> Marketplace {
    Marketplace { domain, currency, convention }
}

/// Known marketplaces. Longer domains first so `amazon.com.au` wins over
/// `amazon.com`.
pub const MARKETPLACES: &[Marketplace] = &[
    market("amazon.com.au", "AUD", Point),
    market("amazon.com.br", "BRL", Thousands),
    market("amazon.com.mx", "MXN", Point),
    market("amazon.com.tr", "TRY", Thousands),
    market("amazon.co.uk", "GBP", Point),
    market("amazon.co.jp", "JPY", Point),
    market("amazon.com", "USD", Point),
    market("amazon.ca", "CAD", Point),
    market("amazon.de", "EUR", Thousands),
    market("amazon.fr", "EUR", Thousands),
    market("amazon.es", "EUR", Thousands),
    market("amazon.it", "EUR", Thousands),
    market("amazon.nl", "EUR", Thousands),
    market("amazon.se", "SEK", Thousands),
    market("amazon.pl", "PLN", Thousands),
    market("amazon.in", "INR", Point),
];

/// Marketplace serving the page, if any.
pub fn marketplace(page: &Document) -> Option<&'static Marketplace> {
    MARKETPLACES.iter().find(|m| host_is(page, m.domain))
}

const FIELDS: FieldSelectors = FieldSelectors {
    title: &["#productTitle", "#title span", ".product-title-word-break"],
    price: &[
        "#corePrice_feature_div .a-price .a-offscreen",
        "#corePriceDisplay_desktop_feature_div .a-price .a-offscreen",
        "#priceblock_ourprice",
        "#priceblock_dealprice",
        ".a-price .a-offscreen",
    ],
    original_price: &[
        "#corePrice_feature_div .a-text-price .a-offscreen",
        "#corePriceDisplay_desktop_feature_div .basisPrice .a-offscreen",
        ".a-text-price .a-offscreen",
    ],
    image: &["#landingImage", "#imgTagWrapperId img", "#main-image"],
    description: &["#feature-bullets", "#productDescription"],
    sku: &[],
    availability: &["#availability span", "#outOfStock span", "#availability"],
    brand: &["#bylineInfo", ".po-brand .po-break-word"],
};

const VARIANTS: VariantSelectors = VariantSelectors {
    colors: &["#variation_color_name li", "#inline-twister-row-color_name li"],
    sizes: &[
        "#native_dropdown_selected_size_name option",
        "#variation_size_name li",
        "#inline-twister-row-size_name li",
    ],
    other: &["#variation_style_name li", "#native_dropdown_selected_style_name option"],
};

/// CAPTCHA and "dog" error pages.
const BLOCKED: &[&str] = &["form[action*='validateCaptcha']", "img[src*='captcha']", "img[alt*='dog']"];

static ASIN_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(?:dp|gp/product)/([A-Z0-9]{10})").unwrap());

#[derive(Debug, Default, Clone, Copy)]
pub struct Amazon;

impl Strategy for Amazon {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::site(NAME)
    }

    fn applicable(&self, page: &Document) -> bool {
        marketplace(page).is_some()
    }

    fn extract(&self, page: &Document, _ctx: &ExtractContext) -> ProductRecord {
        let Some(market) = marketplace(page) else {
            return ProductRecord::new(page.url().as_str(), self.method()).finish();
        };

        if page.exists(BLOCKED) {
            warn!("Amazon served a CAPTCHA or error page for {}", page.url());
            return ProductRecord::new(page.url().as_str(), self.method()).finish();
        }

        let format = PriceFormat { convention: market.convention, currency: Some(market.currency) };
        let mut record =
            extract_fields(page, &FIELDS, format, &VariantCollector::new(VARIANTS), self.method());

        // Hi-res image sits in a data attribute on the landing image
        if let Some(hires) = page
            .find(&["#landingImage[data-old-hires]", "#imgBlkFront[data-old-hires]"])
            .and_then(|img| img.value().attr("data-old-hires"))
            .and_then(|src| page.absolutize(src))
        {
            record.image_url = Some(hires);
        }

        record.brand = record.brand.as_deref().map(clean_brand).filter(|b| !b.is_empty());
        record.sku = page
            .find(&["input#ASIN[value]", "input[name='ASIN'][value]"])
            .and_then(|input| input.value().attr("value"))
            .map(str::to_string)
            .or_else(|| asin_from_url(page));
        tidy_variants(page, &mut record);

        debug!("Amazon {} record: {:?} {:?}", market.domain, record.title, record.price);
        record.finish()
    }
}

/// "Visit the Acme Store" / "Brand: Acme" to "Acme".
pub fn clean_brand(raw: &str) -> String {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix("Brand:").unwrap_or(trimmed).trim();
    let trimmed = trimmed.strip_prefix("Visit the").unwrap_or(trimmed).trim();
    let trimmed = trimmed.strip_suffix("Store").unwrap_or(trimmed).trim();
    trimmed.to_string()
}

fn asin_from_url(page: &Document) -> Option<String> {
    ASIN_PATH.captures(page.url().path()).map(|c| c[1].to_string())
}

/// Swatches are labelled "Click to select Red"; the chosen one is named in
/// the `.selection` span next to the list.
fn tidy_variants(page: &Document, record: &mut ProductRecord) {
    for option in record.variants.colors.iter_mut().chain(record.variants.sizes.iter_mut()) {
        if let Some(rest) = option.text.strip_prefix("Click to select ") {
            option.text = clean_text(rest);
        }
    }

    let chosen = |list: &[&str]| page.find(list).map(dom::text).filter(|t| !t.is_empty());
    if let Some(color) = chosen(&["#variation_color_name .selection", "#inline-twister-expanded-dimension-text-color_name"]) {
        for option in &mut record.variants.colors {
            option.selected |= option.text == color;
        }
    }
    if let Some(size) = chosen(&["#variation_size_name .selection"]) {
        for option in &mut record.variants.sizes {
            option.selected |= option.text == size;
        }
    }
}
