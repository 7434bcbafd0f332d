//! Element geometry and computed style.
//!
//! A host that renders the page can supply real boxes and styles through
//! [`Layout`]. Without one, the helpers here estimate both from the markup.

use scraper::ElementRef;

/// Vertical spacing used to place elements by document order.
pub const STATIC_LINE_HEIGHT: f64 = 20.0;

/// Bounding box in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Euclidean distance between the centers of two boxes.
    pub fn distance(&self, other: &Rect) -> f64 {
        let (ax, ay) = self.center();
        let (bx, by) = other.center();
        ((ax - bx).powi(2) + (ay - by).powi(2)).sqrt()
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// Geometry and style as rendered by a host.
///
/// Both methods default to "unknown", which makes the document fall back to
/// markup-derived estimates.
pub trait Layout: Send + Sync {
    fn rect(&self, _element: ElementRef<'_>) -> Option<Rect> {
        None
    }

    fn computed_style(&self, _element: ElementRef<'_>, _property: &str) -> Option<String> {
        None
    }
}

/// Layout derived from the markup alone, used when no host renders the page.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticLayout;

impl Layout for StaticLayout {}

/// CSS properties that inherit from the parent when not declared.
const INHERITED: &[&str] = &["visibility", "color", "font-size", "font-weight", "text-decoration"];

/// Reads one declaration from an element's inline `style` attribute.
pub fn inline_style(element: ElementRef<'_>, property: &str) -> Option<String> {
    let style = element.value().attr("style")?;

    // Last declaration wins, as in the cascade
    style
        .split(';')
        .filter_map(|decl| decl.split_once(':'))
        .filter(|(name, _)| name.trim().eq_ignore_ascii_case(property))
        .map(|(_, value)| value.trim().trim_end_matches("!important").trim().to_string())
        .last()
}

/// Computed style estimated from inline declarations and the `hidden` attribute.
pub fn static_style(element: ElementRef<'_>, property: &str) -> Option<String> {
    if property == "display" && element.value().attr("hidden").is_some() {
        return Some("none".to_string());
    }

    if let Some(value) = inline_style(element, property) {
        return Some(value);
    }

    if INHERITED.contains(&property) {
        return element
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find_map(|ancestor| inline_style(ancestor, property));
    }

    None
}

/// Parses a CSS length such as `120px` or `120` into pixels.
fn parse_px(raw: &str) -> Option<f64> {
    let trimmed = raw.trim().trim_end_matches("px").trim();
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite() && *v >= 0.0)
}

/// Width and height declared in the markup, if any.
pub fn declared_size(element: ElementRef<'_>) -> (Option<f64>, Option<f64>) {
    let width = element
        .value()
        .attr("width")
        .and_then(parse_px)
        .or_else(|| inline_style(element, "width").as_deref().and_then(parse_px));
    let height = element
        .value()
        .attr("height")
        .and_then(parse_px)
        .or_else(|| inline_style(element, "height").as_deref().and_then(parse_px));
    (width, height)
}

/// Extracts the URL from a `background-image: url(...)` value.
pub fn css_url(value: &str) -> Option<String> {
    let start = value.find("url(")? + 4;
    let rest = &value[start..];
    let end = rest.find(')')?;
    let url = rest[..end].trim().trim_matches(|c| c == '"' || c == '\'');
    (!url.is_empty()).then(|| url.to_string())
}
