//! Storefront platform strategies.
//!
//! A platform is recognized by its fingerprint (a global JS object, a script
//! signature, a CDN host). Its product payload is read directly when the page
//! embeds one; otherwise the strategy falls back to the common selector pass
//! and tags the result with the platform name.

pub mod magento;
pub mod shopify;
pub mod woocommerce;

pub use magento::Magento;
pub use shopify::Shopify;
pub use woocommerce::WooCommerce;

use super::common::{extract_fields, FieldSelectors, PriceFormat};
use super::Strategy;
use crate::dom::Document;
use crate::model::{ExtractionMethod, ProductRecord, VariantOption, Variants};
use crate::variants::{dedupe, VariantCollector};
use tracing::debug;

/// Platform strategies in evaluation order.
pub fn all() -> Vec<Box<dyn Strategy>> {
    vec![Box::new(Shopify), Box::new(WooCommerce), Box::new(Magento)]
}

/// Which variant list an option name belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Color,
    Size,
    Other,
}

impl OptionKind {
    /// Classifies an option name such as `Color`, `attribute_pa_size` or `Beden`.
    pub fn from_name(name: &str) -> Self {
        let name = name.to_lowercase();
        const COLOR: &[&str] = &["color", "colour", "renk", "farbe", "couleur", "colore", "kleur"];
        const SIZE: &[&str] = &["size", "beden", "größe", "grosse", "taille", "talla", "taglia", "maat"];

        if COLOR.iter().any(|k| name.contains(k)) {
            OptionKind::Color
        } else if SIZE.iter().any(|k| name.contains(k)) {
            OptionKind::Size
        } else {
            OptionKind::Other
        }
    }
}

/// Adds an option to the list its kind selects.
pub fn push_option(variants: &mut Variants, kind: OptionKind, option: VariantOption) {
    match kind {
        OptionKind::Color => variants.colors.push(option),
        OptionKind::Size => variants.sizes.push(option),
        OptionKind::Other => variants.other_options.push(option),
    }
}

/// Deduplicates every list.
pub fn dedupe_all(variants: Variants) -> Variants {
    Variants {
        colors: dedupe(variants.colors),
        sizes: dedupe(variants.sizes),
        other_options: dedupe(variants.other_options),
    }
}

/// Completes a payload record with the common selector pass, or returns
/// the common selector record when there was no payload.
pub fn complete(
    page: &Document,
    payload: Option<ProductRecord>,
    fields: &FieldSelectors,
    method: ExtractionMethod,
) -> ProductRecord {
    let fallback =
        extract_fields(page, fields, PriceFormat::default(), &VariantCollector::default(), method.clone());

    match payload {
        Some(mut record) => {
            record.fill_from(&fallback);
            record.finish()
        }
        None => {
            debug!("No {} payload, using page selectors", method);
            fallback
        }
    }
}
