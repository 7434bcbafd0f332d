//! Locale-aware normalization of prices, currencies, availability and URLs.

use crate::model::Availability;
use rust_decimal::Decimal;
use std::str::FromStr;
use url::Url;

/// Which character separates the decimal part of a price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecimalConvention {
    /// `1.234,56` - the generic default, also used when only `,` appears
    Continental,
    /// `1,234.56`
    Point,
    /// Locales that group with `.` and separate decimals with `,`: a
    /// dot-only amount whose groups after the first all have three digits
    /// (`51.600`, `1.299.000`) is read as thousands
    Thousands,
}

/// Ordered symbol/code table. Multi-character literals come before the
/// single symbols they contain (`US$` before `$`).
const CURRENCY_TABLE: &[(&str, &str)] = &[
    ("US$", "USD"),
    ("CA$", "CAD"),
    ("C$", "CAD"),
    ("AU$", "AUD"),
    ("A$", "AUD"),
    ("R$", "BRL"),
    ("MX$", "MXN"),
    ("€", "EUR"),
    ("£", "GBP"),
    ("₺", "TRY"),
    ("TL", "TRY"),
    ("TRY", "TRY"),
    ("¥", "JPY"),
    ("₹", "INR"),
    ("₽", "RUB"),
    ("zł", "PLN"),
    ("CHF", "CHF"),
    ("SEK", "SEK"),
    ("EUR", "EUR"),
    ("GBP", "GBP"),
    ("USD", "USD"),
    ("$", "USD"),
];

/// Currency assumed when no symbol or code is present.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Parses a price using the continental convention.
///
/// Everything except digits, `.` and `,` is stripped. With both separators
/// present `.` is read as thousands and `,` as decimal; a lone `,` is the
/// decimal separator.
pub fn parse_price(raw: &str) -> Option<Decimal> {
    parse_price_with(raw, DecimalConvention::Continental)
}

/// Parses a price with an explicit decimal convention.
pub fn parse_price_with(raw: &str, convention: DecimalConvention) -> Option<Decimal> {
    let cleaned: String =
        raw.chars().filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',').collect();

    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let normalized = match convention {
        DecimalConvention::Continental => {
            if cleaned.contains('.') && cleaned.contains(',') {
                cleaned.replace('.', "").replace(',', ".")
            } else if cleaned.contains(',') {
                cleaned.replace(',', ".")
            } else {
                cleaned
            }
        }
        DecimalConvention::Point => cleaned.replace(',', ""),
        DecimalConvention::Thousands => {
            if cleaned.contains(',') {
                cleaned.replace('.', "").replace(',', ".")
            } else if dot_grouped(&cleaned) {
                cleaned.replace('.', "")
            } else {
                cleaned
            }
        }
    };

    Decimal::from_str(normalized.trim_end_matches('.')).ok()
}

/// True for `51.600` or `1.299.000`, false for `51.6` or `12.99`.
fn dot_grouped(cleaned: &str) -> bool {
    let mut groups = cleaned.split('.');
    groups.next().is_some_and(|head| !head.is_empty() && head.len() <= 3)
        && cleaned.contains('.')
        && groups.all(|g| g.len() == 3)
}

/// Parses a JSON price node, which may be a number or a string.
pub fn price_from_json(value: &serde_json::Value) -> Option<Decimal> {
    match value {
        serde_json::Value::Number(n) => {
            let text = n.to_string();
            Decimal::from_str(&text).ok().or_else(|| Decimal::from_scientific(&text).ok())
        }
        serde_json::Value::String(s) => parse_machine_price(s),
        _ => None,
    }
}

/// Parses a machine-readable amount (meta content, JSON strings), which
/// normally uses `.` as decimal separator, falling back to [`parse_price`].
pub fn parse_machine_price(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw.trim()).ok().or_else(|| parse_price(raw))
}

/// Detects the currency code from symbols or codes in the text.
///
/// Falls back to [`DEFAULT_CURRENCY`] when nothing matches.
pub fn detect_currency(raw: &str) -> String {
    CURRENCY_TABLE
        .iter()
        .find(|(literal, _)| raw.contains(literal))
        .map(|(_, code)| *code)
        .unwrap_or(DEFAULT_CURRENCY)
        .to_string()
}

/// Returns the currency code only when the text actually names one.
pub fn find_currency(raw: &str) -> Option<String> {
    CURRENCY_TABLE
        .iter()
        .find(|(literal, _)| raw.contains(literal))
        .map(|(_, code)| code.to_string())
}

/// Maps schema.org availability URIs and common stock text to [`Availability`].
pub fn format_availability(raw: &str) -> Availability {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Availability::Unknown;
    }

    let key: String = trimmed
        .rsplit('/')
        .next()
        .unwrap_or(trimmed)
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect();

    // Negative states first: "unavailable" contains "available"
    const OUT: &[&str] =
        &["outofstock", "soldout", "unavailable", "discontinued", "tükendi", "ausverkauft", "épuisé"];
    const LIMITED: &[&str] = &["limitedavailability", "limitedstock", "onlyfewleft", "sonürünler"];
    const PREORDER: &[&str] = &["preorder", "presale", "backorder", "önsipariş"];
    const IN: &[&str] = &["instock", "available", "onlineonly", "instoreonly", "stokta", "lieferbar"];

    if OUT.iter().any(|k| key.contains(k)) {
        Availability::OutOfStock
    } else if LIMITED.iter().any(|k| key.contains(k)) {
        Availability::LimitedAvailability
    } else if PREORDER.iter().any(|k| key.contains(k)) {
        Availability::PreOrder
    } else if IN.iter().any(|k| key.contains(k)) {
        Availability::InStock
    } else {
        Availability::Other(trimmed.to_string())
    }
}

/// Resolves `href` against `base` into an absolute http(s) URL.
pub fn absolute_url(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if lowered.starts_with("data:") || lowered.starts_with("javascript:") {
        return None;
    }

    let resolved = base.join(href).ok()?;
    match resolved.scheme() {
        "http" | "https" => Some(resolved.to_string()),
        _ => None,
    }
}

/// Collapses runs of whitespace into single spaces and trims.
pub fn clean_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    // Price parsing tests

    #[test]
    fn test_parse_price_continental() {
        assert_eq!(parse_price("1.234,56 TL"), Some(dec("1234.56")));
        assert_eq!(parse_price("19,99 €"), Some(dec("19.99")));
        assert_eq!(parse_price("€29,99"), Some(dec("29.99")));
        assert_eq!(parse_price("0,99€"), Some(dec("0.99")));
    }

    #[test]
    fn test_parse_price_point_only() {
        assert_eq!(parse_price("$25.00"), Some(dec("25.00")));
        assert_eq!(parse_price("£29.99"), Some(dec("29.99")));
        assert_eq!(parse_price("$10"), Some(dec("10")));
    }

    #[test]
    fn test_parse_price_garbage() {
        assert_eq!(parse_price("abc"), None);
        assert_eq!(parse_price(""), None);
        assert_eq!(parse_price("   "), None);
        assert_eq!(parse_price("N/A"), None);
        assert_eq!(parse_price("1.2.3"), None);
    }

    #[test]
    fn test_parse_price_with_point_convention() {
        assert_eq!(parse_price_with("$1,234.56", DecimalConvention::Point), Some(dec("1234.56")));
        assert_eq!(parse_price_with("¥2,999", DecimalConvention::Point), Some(dec("2999")));
        assert_eq!(parse_price_with("29.99", DecimalConvention::Point), Some(dec("29.99")));
    }

    #[test]
    fn test_parse_price_with_thousands_convention() {
        let thousands = |raw| parse_price_with(raw, DecimalConvention::Thousands);
        assert_eq!(thousands("51.600 TL"), Some(dec("51600")));
        assert_eq!(thousands("1.299 TL"), Some(dec("1299")));
        assert_eq!(thousands("1.299.000 TL"), Some(dec("1299000")));
        assert_eq!(thousands("1.299,90 €"), Some(dec("1299.90")));
        assert_eq!(thousands("49,90 €"), Some(dec("49.90")));
        assert_eq!(thousands("12.99"), Some(dec("12.99")));
        assert_eq!(thousands("899 TL"), Some(dec("899")));

        // The generic rule keeps a lone dot as decimal separator
        assert_eq!(parse_price("1.299 TL"), Some(dec("1.299")));
    }

    #[test]
    fn test_price_from_json() {
        assert_eq!(price_from_json(&serde_json::json!(19.99)), Some(dec("19.99")));
        assert_eq!(price_from_json(&serde_json::json!(42)), Some(dec("42")));
        assert_eq!(price_from_json(&serde_json::json!("1299.00")), Some(dec("1299.00")));
        assert_eq!(price_from_json(&serde_json::json!("12,50")), Some(dec("12.50")));
        assert_eq!(price_from_json(&serde_json::json!(null)), None);
        assert_eq!(price_from_json(&serde_json::json!("call us")), None);
    }

    // Currency tests

    #[test]
    fn test_detect_currency() {
        assert_eq!(detect_currency("€19,99"), "EUR");
        assert_eq!(detect_currency("£5"), "GBP");
        assert_eq!(detect_currency("1.299,00 TL"), "TRY");
        assert_eq!(detect_currency("₺450"), "TRY");
        assert_eq!(detect_currency("US$ 12"), "USD");
        assert_eq!(detect_currency("C$ 12"), "CAD");
        assert_eq!(detect_currency("R$ 99,90"), "BRL");
    }

    #[test]
    fn test_detect_currency_defaults_to_usd() {
        assert_eq!(detect_currency("19.99"), "USD");
        assert_eq!(detect_currency(""), "USD");
        assert!(find_currency("19.99").is_none());
        assert_eq!(find_currency("19.99 EUR").as_deref(), Some("EUR"));
    }

    // Availability tests

    #[test]
    fn test_format_availability_schema_uris() {
        assert_eq!(format_availability("https://schema.org/InStock"), Availability::InStock);
        assert_eq!(format_availability("http://schema.org/OutOfStock"), Availability::OutOfStock);
        assert_eq!(
            format_availability("https://schema.org/LimitedAvailability"),
            Availability::LimitedAvailability
        );
        assert_eq!(format_availability("schema.org/PreOrder"), Availability::PreOrder);
        assert_eq!(format_availability("InStock"), Availability::InStock);
    }

    #[test]
    fn test_format_availability_free_text() {
        assert_eq!(format_availability("In stock"), Availability::InStock);
        assert_eq!(format_availability("Currently unavailable."), Availability::OutOfStock);
        assert_eq!(format_availability("Sold out"), Availability::OutOfStock);
        assert_eq!(format_availability("in_stock"), Availability::InStock);
        assert_eq!(format_availability("Pre-order now"), Availability::PreOrder);
        assert_eq!(format_availability(""), Availability::Unknown);
    }

    #[test]
    fn test_format_availability_passthrough() {
        assert_eq!(
            format_availability("Ships in 3 weeks"),
            Availability::Other("Ships in 3 weeks".to_string())
        );
    }

    // URL tests

    #[test]
    fn test_absolute_url() {
        let base = Url::parse("https://shop.test/products/tee?variant=1").unwrap();
        assert_eq!(
            absolute_url(&base, "/img/a.jpg").as_deref(),
            Some("https://shop.test/img/a.jpg")
        );
        assert_eq!(
            absolute_url(&base, "//cdn.test/a.jpg").as_deref(),
            Some("https://cdn.test/a.jpg")
        );
        assert_eq!(
            absolute_url(&base, "b.jpg").as_deref(),
            Some("https://shop.test/products/b.jpg")
        );
        assert_eq!(absolute_url(&base, "data:image/gif;base64,R0lGOD"), None);
        assert_eq!(absolute_url(&base, "javascript:void(0)"), None);
        assert_eq!(absolute_url(&base, "  "), None);
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  Classic \n\t Tee  "), "Classic Tee");
        assert_eq!(clean_text(""), "");
    }
}
