//! Output formatting for records and classifier signals (table, JSON, markdown).

use crate::classifier::Classification;
use crate::config::OutputFormat;
use crate::model::{ProductRecord, VariantOption};

/// Formats records for output.
pub struct Formatter {
    format: OutputFormat,
}

impl Formatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a single record.
    pub fn format_record(&self, record: &ProductRecord) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(record).unwrap_or_else(|_| "{}".to_string()),
            OutputFormat::Table => self.table_record(record),
            OutputFormat::Markdown => self.markdown_record(record),
        }
    }

    /// Formats the classifier signals for a page.
    pub fn format_classification(&self, url: &str, classification: &Classification) -> String {
        match self.format {
            OutputFormat::Json => {
                let value = serde_json::json!({
                    "url": url,
                    "isProductPage": classification.is_product_page(),
                    "signals": classification,
                });
                serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string())
            }
            OutputFormat::Table => {
                let yes_no = |b: bool| if b { "yes" } else { "no" };
                [
                    format!("URL:             {}", url),
                    format!("Product page:    {}", yes_no(classification.is_product_page())),
                    format!("URL pattern:     {}", yes_no(classification.url_pattern)),
                    format!("Structured data: {}", yes_no(classification.structured_data)),
                    format!("Meta tags:       {}", yes_no(classification.meta_tags)),
                    format!("Add to cart:     {}", yes_no(classification.add_to_cart)),
                    format!("DOM score:       {}", classification.dom_score),
                ]
                .join("\n")
            }
            OutputFormat::Markdown => {
                let check = |b: bool| if b { "x" } else { " " };
                [
                    format!("## {}", url),
                    String::new(),
                    format!("- [{}] Product page", check(classification.is_product_page())),
                    format!("- [{}] URL pattern", check(classification.url_pattern)),
                    format!("- [{}] Structured data", check(classification.structured_data)),
                    format!("- [{}] Meta tags", check(classification.meta_tags)),
                    format!("- [{}] Add to cart", check(classification.add_to_cart)),
                    format!("- DOM score: {}", classification.dom_score),
                ]
                .join("\n")
            }
        }
    }

    // Table formatting

    fn table_record(&self, record: &ProductRecord) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Title:   {}", record.title.as_deref().unwrap_or("N/A")));
        lines.push(format!("URL:     {}", record.url));
        lines.push(format!("Price:   {}", price_line(record, |p| format!("(was {p})"))));

        if let Some(brand) = &record.brand {
            lines.push(format!("Brand:   {}", brand));
        }
        if let Some(sku) = &record.sku {
            lines.push(format!("SKU:     {}", sku));
        }
        if let Some(availability) = &record.availability {
            lines.push(format!("Stock:   {}", availability));
        }
        if let Some(image) = &record.image_url {
            lines.push(format!("Image:   {}", image));
        }

        for (label, options) in option_groups(record) {
            lines.push(format!("{label:<8} {}", option_list(options, |o| format!("[{o}]"))));
        }

        if let Some(method) = &record.extraction_method {
            lines.push(format!("Method:  {}", method));
        }
        lines.push(format!("Success: {}", if record.success { "yes" } else { "no" }));
        if let Some(error) = &record.error {
            lines.push(format!("Error:   {}", error));
        }

        lines.join("\n")
    }

    // Markdown formatting

    fn markdown_record(&self, record: &ProductRecord) -> String {
        let mut lines = Vec::new();

        lines.push(format!("## {}", record.title.as_deref().unwrap_or("Unknown product")));
        lines.push(String::new());
        lines.push(format!("- **URL:** [{}]({})", record.url, record.url));
        lines.push(format!("- **Price:** {}", price_line(record, |p| format!("~~{p}~~"))));

        if let Some(brand) = &record.brand {
            lines.push(format!("- **Brand:** {}", brand));
        }
        if let Some(availability) = &record.availability {
            lines.push(format!("- **Availability:** {}", availability));
        }
        for (label, options) in option_groups(record) {
            let label = label.trim_end_matches(':');
            lines.push(format!("- **{label}:** {}", option_list(options, |o| format!("**{o}**"))));
        }
        if let Some(method) = &record.extraction_method {
            lines.push(format!("- **Method:** `{}`", method));
        }

        if let Some(description) = &record.description {
            lines.push(String::new());
            lines.push(format!("> {}", truncate(description, 300)));
        }

        lines.join("\n")
    }
}

fn price_line(record: &ProductRecord, was: impl Fn(String) -> String) -> String {
    let Some(price) = record.price else {
        return "N/A".to_string();
    };
    let currency = record.currency.as_deref().unwrap_or_default();

    match (record.original_price, record.discount_percent()) {
        (Some(original), Some(discount)) => {
            format!("{} {:.2} {} -{}%", currency, price, was(format!("{:.2}", original)), discount)
        }
        _ => format!("{} {:.2}", currency, price).trim().to_string(),
    }
}

fn option_groups(record: &ProductRecord) -> Vec<(&'static str, &[VariantOption])> {
    [
        ("Colors:", record.variants.colors.as_slice()),
        ("Sizes:", record.variants.sizes.as_slice()),
        ("Options:", record.variants.other_options.as_slice()),
    ]
    .into_iter()
    .filter(|(_, options)| !options.is_empty())
    .collect()
}

/// Comma-separated option texts, the selected one marked.
fn option_list(options: &[VariantOption], mark: impl Fn(&str) -> String) -> String {
    options
        .iter()
        .map(|o| if o.selected { mark(&o.text) } else { o.text.clone() })
        .collect::<Vec<_>>()
        .join(", ")
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max - 3).collect();
    format!("{}...", cut)
}
