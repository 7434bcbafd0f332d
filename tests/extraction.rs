//! End-to-end extraction tests over saved pages in `fixtures/`.

use product_lens::commands::ExtractCommand;
use product_lens::config::{Config, OutputFormat};
use product_lens::{Availability, Engine, ExtractionMethod, PageSnapshot};
use rust_decimal::Decimal;
use serde_json::Value;

const COMMON_TEE: &str = include_str!("fixtures/common_tee.html");
const JSONLD_JACKET: &str = include_str!("fixtures/jsonld_jacket.html");
const SHOPIFY_BEANIE: &str = include_str!("fixtures/shopify_beanie.html");
const ABOUT: &str = include_str!("fixtures/about.html");
const TITLE_ONLY: &str = include_str!("fixtures/title_only.html");

fn fixture_path(name: &str) -> String {
    format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
}

#[test]
fn test_common_selectors_page() {
    let snapshot = PageSnapshot::new("https://shop.test/products/classic-tee", COMMON_TEE);
    let record = Engine::default().extract(&snapshot);

    assert!(record.is_product_page);
    assert!(record.success);
    assert_eq!(record.title.as_deref(), Some("Classic Tee"));
    assert_eq!(record.price, Some(Decimal::new(2500, 2)));
    assert_eq!(record.currency.as_deref(), Some("USD"));
    assert_eq!(record.extraction_method, Some(ExtractionMethod::CommonSelectors));
}

#[test]
fn test_structured_data_page() {
    // No product-looking path: JSON-LD alone classifies the page
    let snapshot = PageSnapshot::new("https://shop.test/rain-jacket", JSONLD_JACKET);
    let engine = Engine::default();

    let signals = engine.classify(&snapshot).unwrap();
    assert!(!signals.url_pattern);
    assert!(signals.structured_data);

    let record = engine.extract(&snapshot);
    assert!(record.success);
    assert_eq!(record.extraction_method, Some(ExtractionMethod::StructuredData));
    assert_eq!(record.title.as_deref(), Some("Rain Jacket"));
    assert_eq!(record.price, Some(Decimal::new(8990, 2)));
    assert_eq!(record.currency.as_deref(), Some("EUR"));
    assert_eq!(record.brand.as_deref(), Some("Fjordline"));
    assert_eq!(record.sku.as_deref(), Some("RJ-100"));
    assert_eq!(record.availability, Some(Availability::InStock));
    assert_eq!(record.image_url.as_deref(), Some("https://shop.test/img/rain-jacket.jpg"));

    let sizes: Vec<_> = record.variants.sizes.iter().map(|o| o.text.as_str()).collect();
    assert_eq!(sizes, vec!["S", "M", "L"]);

    let large: Value = serde_json::from_str(record.variants.sizes[2].value.as_deref().unwrap()).unwrap();
    assert_eq!(large["inStock"], false);
}

#[test]
fn test_shopify_page() {
    let snapshot = PageSnapshot::new("https://shop.test/products/wool-beanie", SHOPIFY_BEANIE);
    let record = Engine::default().extract(&snapshot);

    assert!(record.success);
    assert_eq!(record.extraction_method, Some(ExtractionMethod::platform("shopify")));
    assert_eq!(record.title.as_deref(), Some("Wool Beanie"));
    assert_eq!(record.brand.as_deref(), Some("Northwind"));
    assert_eq!(record.description.as_deref(), Some("Warm wool"));
    assert_eq!(record.price, Some(Decimal::new(2900, 2)));
    assert_eq!(record.original_price, Some(Decimal::new(3500, 2)));
    assert_eq!(record.currency.as_deref(), Some("CAD"));
    assert_eq!(record.sku.as_deref(), Some("BEANIE-RED-M"));
    assert_eq!(record.discount_percent(), Some(17));

    let colors: Vec<_> = record.variants.colors.iter().map(|o| (o.text.as_str(), o.selected)).collect();
    assert_eq!(colors, vec![("Red", true), ("Blue", false)]);

    let sizes: Vec<_> = record.variants.sizes.iter().map(|o| (o.text.as_str(), o.selected)).collect();
    assert_eq!(sizes, vec![("S", false), ("M", true)]);
}

#[test]
fn test_variant_query_selects_variant() {
    let snapshot = PageSnapshot::new("https://shop.test/products/wool-beanie?variant=3", SHOPIFY_BEANIE);
    let record = Engine::default().extract(&snapshot);

    assert_eq!(record.sku.as_deref(), Some("BEANIE-BLUE-M"));
    assert_eq!(record.price, Some(Decimal::new(3100, 2)));
    // Falls back to the product-level compare-at price
    assert_eq!(record.original_price, Some(Decimal::new(3500, 2)));
}

#[test]
fn test_non_product_page() {
    let snapshot = PageSnapshot::new("https://shop.test/about", ABOUT);
    let record = Engine::default().extract(&snapshot);

    assert!(!record.is_product_page);
    assert!(!record.success);
    assert!(record.title.is_none());
    assert!(record.extraction_method.is_none());
}

#[test]
fn test_partial_record() {
    let snapshot = PageSnapshot::new("https://shop.test/products/linen-shirt", TITLE_ONLY);
    let record = Engine::default().extract(&snapshot);

    assert!(record.is_product_page);
    assert!(!record.success);
    assert_eq!(record.title.as_deref(), Some("Linen Shirt"));
    assert!(record.price.is_none());
    assert_eq!(record.extraction_method, Some(ExtractionMethod::Partial));
}

#[tokio::test]
async fn test_extract_command_on_saved_file() {
    let config = Config { format: OutputFormat::Json, ..Config::default() };
    let cmd = ExtractCommand::new(config);

    let output = cmd
        .execute(&fixture_path("common_tee.html"), Some("https://shop.test/products/classic-tee"))
        .await
        .unwrap();

    let value: Value = serde_json::from_str(&output).unwrap();
    assert_eq!(value["title"], "Classic Tee");
    assert_eq!(value["url"], "https://shop.test/products/classic-tee");
    assert_eq!(value["extractionMethod"], "common_selectors");
}

#[tokio::test]
async fn test_extract_command_file_url() {
    // A bare file has no product path, but the page signals still hold
    let cmd = ExtractCommand::new(Config { format: OutputFormat::Json, ..Config::default() });
    let output = cmd.execute(&fixture_path("jsonld_jacket.html"), None).await.unwrap();

    let value: Value = serde_json::from_str(&output).unwrap();
    assert!(value["url"].as_str().unwrap().starts_with("file://"));
    assert_eq!(value["extractionMethod"], "structured_data");
}
