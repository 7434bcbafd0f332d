//! Document accessor: selector queries, text/attribute reads, style,
//! visibility and text-node walking over a parsed page.
//!
//! Every query takes an ordered list of selectors and stops at the first
//! selector that matches anything. Selectors that fail to parse count as
//! "no match".

pub mod layout;

pub use layout::{Layout, Rect, StaticLayout};

use crate::error::EngineError;
use crate::normalize::{absolute_url, clean_text};
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::sync::Arc;
use tracing::trace;
use url::Url;

/// Elements whose text never counts as visible page content.
const NON_CONTENT: &[&str] = &["script", "style", "noscript", "template", "head", "title"];

/// Image attributes probed in order; lazy-loading attributes first.
const IMAGE_ATTRS: &[&str] = &[
    "data-zoom-image",
    "data-large_image",
    "data-src",
    "data-original",
    "data-lazy-src",
    "src",
    "content",
    "href",
];

/// A text node together with its parent element and document position.
#[derive(Debug, Clone)]
pub struct TextNode<'a> {
    pub element: ElementRef<'a>,
    pub text: String,
    pub ordinal: usize,
}

/// A parsed page snapshot.
pub struct Document {
    html: Html,
    url: Url,
    layout: Arc<dyn Layout>,
}

impl Document {
    /// Parses page markup fetched from `url`.
    pub fn parse(url: &str, markup: &str) -> Result<Self, EngineError> {
        let url = Url::parse(url)
            .map_err(|source| EngineError::InvalidUrl { url: url.to_string(), source })?;
        Ok(Self { html: Html::parse_document(markup), url, layout: Arc::new(StaticLayout) })
    }

    /// Parses a markup fragment, e.g. a region revealed after a click.
    pub fn fragment(url: Url, markup: &str) -> Self {
        Self { html: Html::parse_fragment(markup), url, layout: Arc::new(StaticLayout) }
    }

    /// Attaches host-rendered geometry.
    pub fn with_layout(mut self, layout: Arc<dyn Layout>) -> Self {
        self.layout = layout;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Lower-cased host name, empty for host-less URLs.
    pub fn host(&self) -> String {
        self.url.host_str().unwrap_or_default().to_ascii_lowercase()
    }

    pub fn html(&self) -> &Html {
        &self.html
    }

    /// First element of the first selector that matches anything.
    pub fn find(&self, selectors: &[&str]) -> Option<ElementRef<'_>> {
        selectors.iter().filter_map(|css| compile(css)).find_map(|sel| self.html.select(&sel).next())
    }

    /// All elements of the first selector that matches anything.
    pub fn find_all(&self, selectors: &[&str]) -> Vec<ElementRef<'_>> {
        for sel in selectors.iter().filter_map(|css| compile(css)) {
            let found: Vec<_> = self.html.select(&sel).collect();
            if !found.is_empty() {
                return found;
            }
        }
        Vec::new()
    }

    /// Returns true when any selector matches.
    pub fn exists(&self, selectors: &[&str]) -> bool {
        self.find(selectors).is_some()
    }

    /// Computed style value, or an empty string when unknown.
    pub fn computed_style(&self, element: ElementRef<'_>, property: &str) -> String {
        self.layout
            .computed_style(element, property)
            .or_else(|| layout::static_style(element, property))
            .unwrap_or_default()
    }

    /// Bounding box from the host, or an estimate from document order and
    /// declared dimensions.
    pub fn rect(&self, element: ElementRef<'_>) -> Rect {
        if let Some(rect) = self.layout.rect(element) {
            return rect;
        }

        let (width, height) = layout::declared_size(element);
        Rect::new(
            0.0,
            self.ordinal(element) as f64 * layout::STATIC_LINE_HEIGHT,
            width.unwrap_or(0.0),
            height.unwrap_or(0.0),
        )
    }

    /// Known rendered dimensions, if any.
    fn known_size(&self, element: ElementRef<'_>) -> Option<(f64, f64)> {
        if let Some(rect) = self.layout.rect(element) {
            return Some((rect.width, rect.height));
        }
        match layout::declared_size(element) {
            (Some(w), Some(h)) => Some((w, h)),
            _ => None,
        }
    }

    /// True unless the element (or an ancestor) is hidden or has a zero box.
    pub fn is_visible(&self, element: ElementRef<'_>) -> bool {
        if element.value().attr("type").is_some_and(|t| t.eq_ignore_ascii_case("hidden")) {
            return false;
        }

        let hidden_by_style = |el: ElementRef<'_>| {
            let display = self.computed_style(el, "display");
            let visibility = self.computed_style(el, "visibility");
            let opacity = self.computed_style(el, "opacity");
            display.eq_ignore_ascii_case("none")
                || visibility.eq_ignore_ascii_case("hidden")
                || opacity.trim().parse::<f64>().is_ok_and(|o| o <= 0.0)
        };

        if hidden_by_style(element)
            || element.ancestors().filter_map(ElementRef::wrap).any(hidden_by_style)
        {
            return false;
        }

        match self.layout.rect(element) {
            Some(rect) => rect.width > 0.0 && rect.height > 0.0,
            None => {
                let (w, h) = layout::declared_size(element);
                w != Some(0.0) && h != Some(0.0)
            }
        }
    }

    /// Largest visible image, preferring ones whose sides both exceed
    /// `preferred_side` over ones that only exceed `min_side`.
    pub fn largest_visible_image(&self, min_side: f64, preferred_side: f64) -> Option<ElementRef<'_>> {
        let sized: Vec<(ElementRef<'_>, f64, f64)> = self
            .find_all(&["img"])
            .into_iter()
            .filter(|img| self.is_visible(*img))
            .filter_map(|img| self.known_size(img).map(|(w, h)| (img, w, h)))
            .collect();

        let largest = |side: f64| {
            sized
                .iter()
                .filter(|(_, w, h)| *w > side && *h > side)
                .max_by(|a, b| (a.1 * a.2).total_cmp(&(b.1 * b.2)))
                .map(|(img, _, _)| *img)
        };

        largest(preferred_side).or_else(|| largest(min_side))
    }

    /// Every non-empty text node outside scripts and styles, in document order.
    pub fn text_nodes(&self) -> Vec<TextNode<'_>> {
        let mut nodes = Vec::new();
        for (ordinal, node) in self.html.root_element().descendants().enumerate() {
            let Some(text) = node.value().as_text() else {
                continue;
            };
            let Some(parent) = node.parent().and_then(ElementRef::wrap) else {
                continue;
            };
            if NON_CONTENT.contains(&parent.value().name()) {
                continue;
            }
            let text = clean_text(text);
            if !text.is_empty() {
                nodes.push(TextNode { element: parent, text, ordinal });
            }
        }
        nodes
    }

    /// Position of an element in a depth-first walk of the tree.
    pub fn ordinal(&self, element: ElementRef<'_>) -> usize {
        let id = element.id();
        self.html.root_element().descendants().position(|node| node.id() == id).unwrap_or(0)
    }

    /// Document `<title>` text.
    pub fn title(&self) -> Option<String> {
        self.find(&["title"]).map(text).filter(|t| !t.is_empty())
    }

    /// Content of the first meta tag whose property, name or itemprop
    /// matches one of `keys`, tried in order.
    pub fn meta(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|key| {
            let selectors = [
                format!("meta[property='{key}']"),
                format!("meta[name='{key}']"),
                format!("meta[itemprop='{key}']"),
            ];
            let selectors: Vec<&str> = selectors.iter().map(String::as_str).collect();
            self.find_all(&selectors)
                .into_iter()
                .filter_map(|el| el.value().attr("content"))
                .map(clean_text)
                .find(|c| !c.is_empty())
        })
    }

    /// Parsed JSON-LD payloads; malformed scripts are skipped.
    pub fn json_ld(&self) -> Vec<Value> {
        self.find_all(&["script[type='application/ld+json']"])
            .into_iter()
            .filter_map(|script| {
                let body = script.text().collect::<String>();
                match serde_json::from_str::<Value>(body.trim()) {
                    Ok(value) => Some(value),
                    Err(e) => {
                        trace!("Skipping malformed JSON-LD block: {}", e);
                        None
                    }
                }
            })
            .collect()
    }

    /// Bodies of inline scripts containing `marker`.
    pub fn scripts_containing(&self, marker: &str) -> Vec<String> {
        self.find_all(&["script"])
            .into_iter()
            .map(|s| s.text().collect::<String>())
            .filter(|body| body.contains(marker))
            .collect()
    }

    /// Resolves a link against the page URL.
    pub fn absolutize(&self, href: &str) -> Option<String> {
        absolute_url(&self.url, href)
    }

    /// Best absolute image URL carried by an element or its first `<img>`.
    pub fn image_src(&self, element: ElementRef<'_>) -> Option<String> {
        let from_attrs = |el: ElementRef<'_>| {
            IMAGE_ATTRS
                .iter()
                .filter_map(|name| el.value().attr(name))
                .find_map(|value| self.absolutize(value))
                .or_else(|| {
                    el.value()
                        .attr("srcset")
                        .and_then(|set| set.split(',').next())
                        .and_then(|candidate| candidate.split_whitespace().next())
                        .and_then(|src| self.absolutize(src))
                })
        };

        from_attrs(element)
            .or_else(|| {
                let style = self.computed_style(element, "background-image");
                layout::css_url(&style).and_then(|u| self.absolutize(&u))
            })
            .or_else(|| {
                let img = compile("img")?;
                element.select(&img).next().and_then(from_attrs)
            })
    }
}

/// Parses a selector, treating invalid ones as matching nothing.
fn compile(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(sel) => Some(sel),
        Err(e) => {
            trace!("Ignoring invalid selector {:?}: {:?}", css, e);
            None
        }
    }
}

/// First element under `scope` matched by the first productive selector.
pub fn find_within<'a>(scope: ElementRef<'a>, selectors: &[&str]) -> Option<ElementRef<'a>> {
    selectors.iter().filter_map(|css| compile(css)).find_map(|sel| scope.select(&sel).next())
}

/// All elements under `scope` matched by the first productive selector.
pub fn find_all_within<'a>(scope: ElementRef<'a>, selectors: &[&str]) -> Vec<ElementRef<'a>> {
    for sel in selectors.iter().filter_map(|css| compile(css)) {
        let found: Vec<_> = scope.select(&sel).collect();
        if !found.is_empty() {
            return found;
        }
    }
    Vec::new()
}

/// Trimmed, whitespace-collapsed text content.
pub fn text(element: ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<String>())
}

/// Attribute value, or `default` when absent.
pub fn attr(element: ElementRef<'_>, name: &str, default: &str) -> String {
    element.value().attr(name).unwrap_or(default).to_string()
}

/// True when any ancestor-or-self matches one of the tag names.
pub fn within_tag(element: ElementRef<'_>, names: &[&str]) -> bool {
    std::iter::once(element)
        .chain(element.ancestors().filter_map(ElementRef::wrap))
        .any(|el| names.contains(&el.value().name()))
}

/// Element text with struck-through descendants (`del`, `s`, `strike`) left out.
pub fn text_excluding_struck(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in element.descendants() {
        let Some(t) = node.value().as_text() else {
            continue;
        };
        let struck = node
            .ancestors()
            .take_while(|a| a.id() != element.id())
            .filter_map(ElementRef::wrap)
            .any(|a| matches!(a.value().name(), "del" | "s" | "strike"));
        if !struck {
            out.push_str(t);
            out.push(' ');
        }
    }
    clean_text(&out)
}
