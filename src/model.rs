//! Data models for extracted product records and their variants.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical result of one extraction attempt.
///
/// Records are built fresh for every attempt and handed to the sink by value;
/// nothing mutates a record after it has been reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    /// Whether the classifier accepted the page as a product page
    pub is_product_page: bool,
    /// True iff both `title` and `price` are present
    pub success: bool,
    pub title: Option<String>,
    pub price: Option<Decimal>,
    /// Price before discount, only set when on sale
    pub original_price: Option<Decimal>,
    /// ISO 4217-like currency code
    pub currency: Option<String>,
    /// Absolute, scheme-qualified image URL
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub sku: Option<String>,
    pub availability: Option<Availability>,
    pub brand: Option<String>,
    /// Strategy that produced the record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction_method: Option<ExtractionMethod>,
    pub url: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub variants: Variants,
    /// Set on the record emitted right after a same-document URL change
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub navigated: bool,
    /// Fault description for error records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProductRecord {
    /// Creates an empty record for a product page, tagged with a strategy.
    pub fn new(url: impl Into<String>, method: ExtractionMethod) -> Self {
        Self {
            is_product_page: true,
            success: false,
            title: None,
            price: None,
            original_price: None,
            currency: None,
            image_url: None,
            description: None,
            sku: None,
            availability: None,
            brand: None,
            extraction_method: Some(method),
            url: url.into(),
            timestamp: Utc::now(),
            variants: Variants::default(),
            navigated: false,
            error: None,
        }
    }

    /// Record for a page the classifier rejected.
    pub fn not_product(url: impl Into<String>) -> Self {
        let mut record = Self::new(url, ExtractionMethod::Partial);
        record.is_product_page = false;
        record.extraction_method = None;
        record
    }

    /// Record emitted immediately after a same-document navigation.
    pub fn navigated(url: impl Into<String>) -> Self {
        let mut record = Self::not_product(url);
        record.navigated = true;
        record
    }

    /// Minimal record sent when the pipeline faults.
    pub fn error(url: impl Into<String>, is_product_page: bool, error: impl fmt::Display) -> Self {
        let mut record = Self::new(url, ExtractionMethod::Error);
        record.is_product_page = is_product_page;
        record.error = Some(error.to_string());
        record
    }

    /// Normalizes empty strings away and recomputes `success`.
    ///
    /// Every strategy calls this as its last step so the success invariant
    /// holds no matter how the fields were filled.
    pub fn finish(mut self) -> Self {
        for field in [
            &mut self.title,
            &mut self.currency,
            &mut self.image_url,
            &mut self.description,
            &mut self.sku,
            &mut self.brand,
        ] {
            if field.as_deref().is_some_and(|s| s.trim().is_empty()) {
                *field = None;
            }
        }

        // An original price only makes sense above the current one
        if let (Some(price), Some(original)) = (self.price, self.original_price) {
            if original <= price {
                self.original_price = None;
            }
        }

        self.success = self.title.is_some() && self.price.is_some();
        self
    }

    /// Fills every missing field of `self` from `other`.
    pub fn fill_from(&mut self, other: &ProductRecord) {
        fn fill<T: Clone>(target: &mut Option<T>, source: &Option<T>) {
            if target.is_none() {
                target.clone_from(source);
            }
        }

        fill(&mut self.title, &other.title);
        fill(&mut self.price, &other.price);
        fill(&mut self.original_price, &other.original_price);
        fill(&mut self.currency, &other.currency);
        fill(&mut self.image_url, &other.image_url);
        fill(&mut self.description, &other.description);
        fill(&mut self.sku, &other.sku);
        fill(&mut self.availability, &other.availability);
        fill(&mut self.brand, &other.brand);

        if self.variants.is_empty() {
            self.variants = other.variants.clone();
        }
    }

    /// True when the `title`+`price` pair differs from `other`.
    pub fn differs_from(&self, other: &ProductRecord) -> bool {
        self.title != other.title || self.price != other.price
    }

    /// Returns discount percentage if on sale.
    pub fn discount_percent(&self) -> Option<u8> {
        let price = self.price?;
        let original = self.original_price?;
        if original.is_zero() {
            return None;
        }
        let discount = ((original - price) / original * Decimal::ONE_HUNDRED).round();
        Some(discount.to_u8()?.min(99))
    }
}

/// Stock state of a product.
///
/// Text that matches none of the known states is kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Availability {
    InStock,
    OutOfStock,
    LimitedAvailability,
    PreOrder,
    Unknown,
    Other(String),
}

impl From<String> for Availability {
    fn from(value: String) -> Self {
        match value.as_str() {
            "InStock" => Availability::InStock,
            "OutOfStock" => Availability::OutOfStock,
            "LimitedAvailability" => Availability::LimitedAvailability,
            "PreOrder" => Availability::PreOrder,
            "Unknown" => Availability::Unknown,
            _ => Availability::Other(value),
        }
    }
}

impl From<Availability> for String {
    fn from(value: Availability) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Availability::InStock => write!(f, "InStock"),
            Availability::OutOfStock => write!(f, "OutOfStock"),
            Availability::LimitedAvailability => write!(f, "LimitedAvailability"),
            Availability::PreOrder => write!(f, "PreOrder"),
            Availability::Unknown => write!(f, "Unknown"),
            Availability::Other(raw) => write!(f, "{}", raw),
        }
    }
}

/// Tag naming the strategy that produced a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ExtractionMethod {
    StructuredData,
    MetaTags,
    CommonSelectors,
    ContentScan,
    /// Storefront platform (shopify, woocommerce, ...)
    Platform(String),
    /// Retailer-specific extractor
    Site(String),
    Partial,
    Error,
}

impl ExtractionMethod {
    pub fn platform(name: &str) -> Self {
        ExtractionMethod::Platform(name.to_string())
    }

    pub fn site(name: &str) -> Self {
        ExtractionMethod::Site(name.to_string())
    }

    pub fn as_str(&self) -> &str {
        match self {
            ExtractionMethod::StructuredData => "structured_data",
            ExtractionMethod::MetaTags => "meta_tags",
            ExtractionMethod::CommonSelectors => "common_selectors",
            ExtractionMethod::ContentScan => "content_scan",
            ExtractionMethod::Platform(name) | ExtractionMethod::Site(name) => name,
            ExtractionMethod::Partial => "partial",
            ExtractionMethod::Error => "error",
        }
    }
}

impl From<String> for ExtractionMethod {
    fn from(value: String) -> Self {
        match value.as_str() {
            "structured_data" => ExtractionMethod::StructuredData,
            "meta_tags" => ExtractionMethod::MetaTags,
            "common_selectors" => ExtractionMethod::CommonSelectors,
            "content_scan" => ExtractionMethod::ContentScan,
            "partial" => ExtractionMethod::Partial,
            "error" => ExtractionMethod::Error,
            // Platform and site names share one namespace on the wire
            _ => ExtractionMethod::Site(value),
        }
    }
}

impl From<ExtractionMethod> for String {
    fn from(value: ExtractionMethod) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Selectable product options grouped by category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variants {
    pub colors: Vec<VariantOption>,
    pub sizes: Vec<VariantOption>,
    pub other_options: Vec<VariantOption>,
}

impl Variants {
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty() && self.sizes.is_empty() && self.other_options.is_empty()
    }

    /// Total number of options across all categories.
    pub fn len(&self) -> usize {
        self.colors.len() + self.sizes.len() + self.other_options.len()
    }
}

/// One selectable option.
///
/// `value` may hold a swatch colour, an image URL, or a serialized JSON
/// object such as `{"size":"M","inStock":true}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantOption {
    pub text: String,
    pub selected: bool,
    pub value: Option<String>,
}

impl VariantOption {
    pub fn new(text: impl Into<String>, selected: bool, value: Option<String>) -> Self {
        Self { text: text.into(), selected, value }
    }
}
