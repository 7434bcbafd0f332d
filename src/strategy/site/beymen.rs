//! Beymen product pages.
//!
//! Colours live in a swiper carousel whose slides only name the colour in a
//! tooltip. Sizes sit in a dropdown that some page versions render only
//! after it is opened, so a reveal probe is issued when the list is absent.

use super::host_is;
use crate::dom::{self, Document};
use crate::model::{ExtractionMethod, ProductRecord, VariantOption};
use crate::normalize::{clean_text, DecimalConvention};
use crate::reveal::RevealRequest;
use crate::selectors;
use crate::strategy::common::{extract_fields, FieldSelectors, PriceFormat};
use crate::strategy::{ExtractContext, Strategy};
use crate::variants::{dedupe, is_noise, is_selected, VariantCollector, VariantSelectors};
use scraper::ElementRef;
use serde_json::json;
use tracing::debug;

const NAME: &str = "beymen";
const DOMAIN: &str = "beymen.com";
const CURRENCY: &str = "TRY";

const FIELDS: FieldSelectors = FieldSelectors {
    title: &[".o-productDetail__description", "h1.o-productDetail__title", ".o-productDetail h1"],
    price: &["#priceNew", ".m-price__new", ".m-productPrice__salePrice", ".o-productDetail__price .m-price"],
    original_price: &["#priceOld", ".m-price__old", ".m-productPrice__lastPrice"],
    image: &[".o-productDetail__image img", ".m-productImageList__item img", ".o-productDetail .swiper-slide img"],
    description: &[".m-productDescription__content", ".o-productDetail__productDescription", "#productDescription"],
    sku: &[".m-productDescription__code span", "[data-product-code]"],
    availability: &[".m-productDetail__stockInfo", ".o-productDetail__soldOut"],
    brand: &[".o-productDetail__brand", ".o-productDetail__brandLink", ".m-productDetail__brand"],
};

/// Everything but colours and sizes goes through the generic collector.
const OTHER_ONLY: VariantSelectors = VariantSelectors { colors: &[], sizes: &[], other: selectors::VARIANT_OTHER };

const COLOR_SLIDES: &[&str] = &[
    ".m-colorsSlider .swiper-slide",
    ".o-productDetail__colors .swiper-slide",
    ".m-variationColor__item",
];

/// Tooltip text holders inside a colour slide.
const TOOLTIP: &[&str] = &[".m-tooltip__content", "[data-tooltip]", "[title]"];

const SIZE_ITEMS: &[&str] = &[".m-variation__item", ".o-productDetail__sizes .m-variation__item"];
const SIZE_TRIGGER: &[&str] = &[".m-variation__button", ".o-productDetail__sizeButton", "[data-size-dropdown]"];

#[derive(Debug, Default, Clone, Copy)]
pub struct Beymen;

impl Strategy for Beymen {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::site(NAME)
    }

    fn applicable(&self, page: &Document) -> bool {
        host_is(page, DOMAIN)
    }

    fn extract(&self, page: &Document, ctx: &ExtractContext) -> ProductRecord {
        let format = PriceFormat { convention: DecimalConvention::Thousands, currency: Some(CURRENCY) };
        let mut record =
            extract_fields(page, &FIELDS, format, &VariantCollector::new(OTHER_ONLY), self.method());

        record.variants.colors = colors(page);
        record.variants.sizes = sizes(page);
        if record.variants.sizes.is_empty() && page.exists(SIZE_TRIGGER) {
            record.variants.sizes = revealed_sizes(page, ctx);
        }

        let variants = &mut record.variants;
        let listed: Vec<String> = variants.colors.iter().chain(&variants.sizes).map(|o| o.text.clone()).collect();
        variants.other_options.retain(|o| !listed.contains(&o.text));

        record.finish()
    }
}

fn colors(page: &Document) -> Vec<VariantOption> {
    let options = page
        .find_all(COLOR_SLIDES)
        .into_iter()
        .filter_map(|slide| {
            let text = color_name(slide);
            if is_noise(&text) {
                return None;
            }
            let value = dom::find_within(slide, &["img"])
                .and_then(|img| page.image_src(img))
                .or_else(|| {
                    dom::find_within(slide, &["a[href]"])
                        .and_then(|a| a.value().attr("href"))
                        .and_then(|href| page.absolutize(href))
                });
            Some(VariantOption::new(text, is_selected(slide), value))
        })
        .collect();

    dedupe(options)
}

/// Tooltip content, else the tooltip attributes, else the swatch alt text.
fn color_name(slide: ElementRef<'_>) -> String {
    if let Some(tip) = dom::find_within(slide, &[".m-tooltip__content"]).map(dom::text).filter(|t| !t.is_empty()) {
        return tip;
    }

    std::iter::once(slide)
        .chain(dom::find_all_within(slide, TOOLTIP))
        .find_map(|el| {
            ["data-tooltip", "data-original-title", "title"]
                .iter()
                .find_map(|name| el.value().attr(name))
                .map(clean_text)
                .filter(|t| !t.is_empty())
        })
        .or_else(|| {
            dom::find_within(slide, &["img[alt]"])
                .and_then(|img| img.value().attr("alt"))
                .map(clean_text)
        })
        .unwrap_or_default()
}

fn sizes(page: &Document) -> Vec<VariantOption> {
    size_options(page.find_all(SIZE_ITEMS))
}

/// Opens the size dropdown and reads the list it renders.
fn revealed_sizes(page: &Document, ctx: &ExtractContext) -> Vec<VariantOption> {
    let request = RevealRequest::new(SIZE_TRIGGER, SIZE_ITEMS, ctx.settings.reveal_timeout);
    let Some(markup) = ctx.reveal.reveal(&request) else {
        debug!("Size list did not appear within {:?}", request.timeout);
        return Vec::new();
    };

    let fragment = Document::fragment(page.url().clone(), &markup);
    size_options(fragment.find_all(SIZE_ITEMS))
}

/// Items marked `-disabled` are sold out; `-delayed` or a delivery note
/// means the size ships later.
fn size_options(items: Vec<ElementRef<'_>>) -> Vec<VariantOption> {
    let options = items
        .into_iter()
        .filter_map(|item| {
            let size = dom::find_within(item, &[".m-variation__size", "span"])
                .map(dom::text)
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| dom::text(item));
            if is_noise(&size) {
                return None;
            }

            let classes = dom::attr(item, "class", "");
            let in_stock = !classes.contains("-disabled") && item.value().attr("disabled").is_none();
            let delayed = classes.contains("-delayed")
                || item.value().attr("data-delayed").is_some_and(|v| v == "true")
                || dom::find_within(item, &[".m-variation__delivery"]).is_some();

            let value = json!({ "size": size, "inStock": in_stock, "delayedDelivery": delayed }).to_string();
            Some(VariantOption::new(size, is_selected(item), Some(value)))
        })
        .collect();

    dedupe(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reveal::StaticReveal;
    use rust_decimal::Decimal;
    use serde_json::Value;
    use std::str::FromStr;
    use std::sync::Arc;

    const URL: &str = "https://www.beymen.com/p_kasmir-kazak_123456";

    const HEAD: &str = r#"
        <div class="o-productDetail">
            <a class="o-productDetail__brandLink">Brunello Cucinelli</a>
            <span class="o-productDetail__description">Kaşmir Kazak</span>
            <div class="m-price"><span id="priceOld">64.500 TL</span><span id="priceNew">51.600 TL</span></div>
            <div class="m-colorsSlider">
                <div class="swiper-slide -active"><a href="/p_kasmir-kazak_123456"><img src="/img/bej.jpg" alt=""></a>
                    <div class="m-tooltip__content">Bej</div></div>
                <div class="swiper-slide" data-tooltip="Lacivert"><a href="/p_kasmir-kazak_123457"><img src="/img/lacivert.jpg"></a></div>
            </div>
            <button class="m-variation__button">Beden Seçiniz</button>
        </div>"#;

    const SIZE_LIST: &str = r#"
        <ul class="m-variation">
            <li class="m-variation__item"><span class="m-variation__size">S</span></li>
            <li class="m-variation__item -disabled"><span class="m-variation__size">M</span></li>
            <li class="m-variation__item -delayed"><span class="m-variation__size">L</span>
                <span class="m-variation__delivery">3 gün içinde</span></li>
        </ul>"#;

    fn size_values(record: &ProductRecord) -> Vec<Value> {
        record
            .variants
            .sizes
            .iter()
            .map(|o| serde_json::from_str(o.value.as_deref().unwrap()).unwrap())
            .collect()
    }

    #[test]
    fn test_rendered_sizes_and_tooltip_colors() {
        let p = Document::parse(URL, &format!("{HEAD}{SIZE_LIST}")).unwrap();
        assert!(Beymen.applicable(&p));

        let record = Beymen.extract(&p, &ExtractContext::default());
        assert!(record.success);
        assert_eq!(record.extraction_method, Some(ExtractionMethod::site("beymen")));
        assert_eq!(record.title.as_deref(), Some("Kaşmir Kazak"));
        assert_eq!(record.brand.as_deref(), Some("Brunello Cucinelli"));
        assert_eq!(record.price, Some(Decimal::from_str("51600").unwrap()));
        assert_eq!(record.original_price, Some(Decimal::from_str("64500").unwrap()));
        assert_eq!(record.currency.as_deref(), Some("TRY"));

        let colors: Vec<_> = record.variants.colors.iter().map(|o| (o.text.as_str(), o.selected)).collect();
        assert_eq!(colors, vec![("Bej", true), ("Lacivert", false)]);
        assert_eq!(record.variants.colors[0].value.as_deref(), Some("https://www.beymen.com/img/bej.jpg"));

        assert_eq!(
            size_values(&record),
            vec![
                json!({"size": "S", "inStock": true, "delayedDelivery": false}),
                json!({"size": "M", "inStock": false, "delayedDelivery": false}),
                json!({"size": "L", "inStock": true, "delayedDelivery": true}),
            ]
        );
        assert!(record.variants.other_options.is_empty());
    }

    #[test]
    fn test_other_options_from_generic_pickers() {
        let options = r#"
            <div class="product-options">
                <select name="option-paket">
                    <option>Hediye Paketi</option>
                    <option>S</option>
                    <option>Standart Paket</option>
                </select>
            </div>"#;
        let p = Document::parse(URL, &format!("{HEAD}{SIZE_LIST}{options}")).unwrap();

        let record = Beymen.extract(&p, &ExtractContext::default());
        let other: Vec<_> = record.variants.other_options.iter().map(|o| o.text.as_str()).collect();
        assert_eq!(other, vec!["Hediye Paketi", "Standart Paket"]);
    }

    #[test]
    fn test_reveal_probe_for_lazy_size_list() {
        let p = Document::parse(URL, HEAD).unwrap();
        let ctx = ExtractContext::default().with_reveal(Arc::new(StaticReveal::new(SIZE_LIST)));

        let record = Beymen.extract(&p, &ctx);
        assert!(record.success);
        assert_eq!(record.variants.sizes.len(), 3);
        assert_eq!(size_values(&record)[1]["inStock"], false);
    }

    #[test]
    fn test_reveal_timeout_leaves_sizes_empty() {
        let p = Document::parse(URL, HEAD).unwrap();
        let record = Beymen.extract(&p, &ExtractContext::default());
        assert!(record.success);
        assert!(record.variants.sizes.is_empty());
    }
}
