//! Variant collection: colour, size and other option pickers.
//!
//! Candidates are found with per-category selector lists, filtered for noise
//! (placeholders, honorifics, phone prefixes, unrelated form fields) and then
//! merged with [`dedupe`].

mod dedupe;

pub use dedupe::dedupe;

use crate::dom::{self, Document};
use crate::model::{VariantOption, Variants};
use crate::normalize::clean_text;
use crate::selectors;
use regex_lite::Regex;
use scraper::ElementRef;
use std::sync::LazyLock;
use tracing::trace;

/// Option labels longer than this are page copy, not options.
const MAX_OPTION_LEN: usize = 60;

/// Lower-case prefixes of "please choose" placeholder entries.
const PLACEHOLDERS: &[&str] = &[
    "select",
    "choose",
    "please select",
    "pick a",
    "seçiniz",
    "beden seç",
    "renk seç",
    "wählen",
    "bitte wählen",
    "choisir",
    "choisissez",
    "seleziona",
    "selecciona",
    "--",
];

/// Salutations offered by account and address forms.
const HONORIFICS: &[&str] = &[
    "mr", "mr.", "mrs", "mrs.", "ms", "ms.", "miss", "dr", "dr.", "mx", "sir", "madam", "herr", "frau",
    "m.", "mme", "mlle", "bay", "bayan", "sn.", "sayın",
];

/// Substrings of field names and labels that mark an unrelated form field.
const DENY_CONTEXT: &[&str] = &[
    "country",
    "phone",
    "tel",
    "dial",
    "address",
    "salutation",
    "title",
    "gender",
    "prefix",
    "ülke",
    "telefon",
    "adres",
    "cinsiyet",
    "unvan",
    "land",
    "anrede",
];

/// Country calling codes such as `+90` or `+1 (US)`.
static CALLING_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\+\d").unwrap());

/// Attributes carrying an explicit option value, in priority order.
const VALUE_ATTRS: &[&str] = &[
    "data-value",
    "data-color",
    "data-colour",
    "data-option-value",
    "data-variant",
    "data-swatch",
    "value",
];

/// Ordered selector lists per option category.
#[derive(Debug, Clone, Copy)]
pub struct VariantSelectors {
    pub colors: &'static [&'static str],
    pub sizes: &'static [&'static str],
    pub other: &'static [&'static str],
}

impl VariantSelectors {
    /// Selector lists that fit most storefronts.
    pub fn generic() -> Self {
        Self {
            colors: selectors::VARIANT_COLORS,
            sizes: selectors::VARIANT_SIZES,
            other: selectors::VARIANT_OTHER,
        }
    }
}

impl Default for VariantSelectors {
    fn default() -> Self {
        Self::generic()
    }
}

/// Turns option pickers into [`Variants`].
#[derive(Debug, Clone, Copy, Default)]
pub struct VariantCollector {
    selectors: VariantSelectors,
}

impl VariantCollector {
    pub fn new(selectors: VariantSelectors) -> Self {
        Self { selectors }
    }

    /// Collects options from the whole page.
    pub fn collect(&self, page: &Document) -> Variants {
        let gather = |list: &[&str]| options(page, page.find_all(list));
        self.assemble(gather(self.selectors.colors), gather(self.selectors.sizes), gather(self.selectors.other))
    }

    /// Collects options under `scope` only.
    pub fn collect_within(&self, page: &Document, scope: ElementRef<'_>) -> Variants {
        let gather = |list: &[&str]| options(page, dom::find_all_within(scope, list));
        self.assemble(gather(self.selectors.colors), gather(self.selectors.sizes), gather(self.selectors.other))
    }

    fn assemble(
        &self,
        colors: Vec<VariantOption>,
        sizes: Vec<VariantOption>,
        other: Vec<VariantOption>,
    ) -> Variants {
        let colors = dedupe(colors);
        let sizes = dedupe(sizes);
        // An "other" picker that repeats a colour or size list adds nothing
        let other_options = dedupe(other)
            .into_iter()
            .filter(|o| !colors.iter().chain(sizes.iter()).any(|c| c.text == o.text))
            .collect();

        Variants { colors, sizes, other_options }
    }
}

fn options(page: &Document, candidates: Vec<ElementRef<'_>>) -> Vec<VariantOption> {
    candidates.into_iter().filter_map(|el| option_from(page, el)).collect()
}

/// Builds one option from a candidate element, or `None` when it is noise.
pub fn option_from(page: &Document, element: ElementRef<'_>) -> Option<VariantOption> {
    let text = option_text(page, element);
    if is_noise(&text) {
        trace!("Skipping variant candidate {:?}", text);
        return None;
    }
    if in_unrelated_field(page, element) {
        trace!("Skipping variant {:?} from unrelated form field", text);
        return None;
    }

    let value = option_value(page, element, &text);
    Some(VariantOption::new(text, is_selected(element), Some(value)))
}

/// Display text: visible text, else accessible labels.
fn option_text(page: &Document, element: ElementRef<'_>) -> String {
    let text = dom::text(element);
    if !text.is_empty() {
        return text;
    }

    for name in ["aria-label", "title", "data-title", "data-name", "alt"] {
        if let Some(label) = element.value().attr(name).map(clean_text).filter(|l| !l.is_empty()) {
            return label;
        }
    }

    if let Some(id) = element.value().attr("id") {
        let selector = format!("label[for='{id}']");
        if let Some(label) = page.find(&[selector.as_str()]).map(dom::text).filter(|l| !l.is_empty()) {
            return label;
        }
    }

    if let Some(alt) = dom::find_within(element, &["img[alt]"]).and_then(|img| img.value().attr("alt")) {
        return clean_text(alt);
    }

    clean_text(element.value().attr("value").unwrap_or_default())
}

/// True for empty, placeholder, honorific, calling-code and overlong labels.
pub fn is_noise(text: &str) -> bool {
    let lowered = text.trim().to_lowercase();
    lowered.is_empty()
        || lowered.chars().count() > MAX_OPTION_LEN
        || PLACEHOLDERS.iter().any(|p| lowered.starts_with(p))
        || HONORIFICS.contains(&lowered.as_str())
        || CALLING_CODE.is_match(&lowered)
}

/// Checks names, ids and labels around the picker against the deny-list.
fn in_unrelated_field(page: &Document, element: ElementRef<'_>) -> bool {
    let mut context = String::new();
    let mut push = |s: &str| {
        context.push_str(&s.to_lowercase());
        context.push(' ');
    };

    // The option itself and the nearest picker container
    let picker = std::iter::once(element)
        .chain(element.ancestors().filter_map(ElementRef::wrap))
        .find(|el| matches!(el.value().name(), "select" | "fieldset" | "ul" | "ol"))
        .unwrap_or(element);

    for el in [element, picker] {
        for name in ["name", "id", "aria-label", "autocomplete"] {
            if let Some(value) = el.value().attr(name) {
                push(value);
            }
        }
    }

    if let Some(id) = picker.value().attr("id") {
        let selector = format!("label[for='{id}']");
        if let Some(label) = page.find(&[selector.as_str()]) {
            push(&dom::text(label));
        }
    }

    for ancestor in element.ancestors().filter_map(ElementRef::wrap) {
        match ancestor.value().name() {
            "label" if picker.value().name() == "select" => push(&dom::text(ancestor)),
            "fieldset" => {
                if let Some(legend) = dom::find_within(ancestor, &["legend"]) {
                    push(&dom::text(legend));
                }
                break;
            }
            "form" | "body" => break,
            _ => {}
        }
    }

    DENY_CONTEXT.iter().any(|word| context.split(|c: char| !c.is_alphanumeric()).any(|token| token == *word))
        || DENY_CONTEXT.iter().filter(|w| w.len() > 4).any(|word| context.contains(word))
}

/// Selection state from attributes and class names on the option or its parent.
pub fn is_selected(element: ElementRef<'_>) -> bool {
    let marked = |el: ElementRef<'_>| {
        let v = el.value();
        v.attr("selected").is_some()
            || v.attr("checked").is_some()
            || ["aria-selected", "aria-checked", "aria-pressed", "data-selected"]
                .iter()
                .any(|name| v.attr(name).is_some_and(|a| a.eq_ignore_ascii_case("true")))
            || v.classes().any(selected_class)
    };

    marked(element) || element.parent().and_then(ElementRef::wrap).is_some_and(marked)
}

/// `selected`, `is-active`, `-checked`, `swatch--selected` and the like.
/// Negated forms (`unselected`, `inactive`, `not-selected`) never match.
fn selected_class(class: &str) -> bool {
    const STATES: &[&str] = &["selected", "active", "checked"];

    let class = class.to_ascii_lowercase();
    STATES.iter().any(|state| {
        class == *state
            || class.strip_suffix(state).is_some_and(|prefix| {
                (prefix.ends_with('-') || prefix.ends_with('_'))
                    && !prefix.ends_with("not-")
                    && !prefix.ends_with("not_")
                    && !prefix.ends_with("un-")
                    && !prefix.ends_with("in-")
            })
    })
}

/// Explicit data value, else swatch colour, else image URL, else the text.
fn option_value(page: &Document, element: ElementRef<'_>, text: &str) -> String {
    if let Some(value) = VALUE_ATTRS
        .iter()
        .filter_map(|name| element.value().attr(name))
        .map(str::trim)
        .find(|v| !v.is_empty())
    {
        return value.to_string();
    }

    let swatch = page.computed_style(element, "background-color");
    if !swatch.is_empty() && !swatch.eq_ignore_ascii_case("transparent") {
        return swatch;
    }

    let image = if element.value().name() == "img" {
        Some(element)
    } else {
        dom::find_within(element, &["img"])
    };
    if let Some(url) = image.and_then(|img| page.image_src(img)) {
        return url;
    }

    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(markup: &str) -> Document {
        Document::parse("https://shop.test/products/tee", markup).unwrap()
    }

    #[test]
    fn test_collects_select_options() {
        let p = page(
            r#"<select name="size">
                <option value="">Select size</option>
                <option value="s">S</option>
                <option value="m" selected>M</option>
                <option value="l">L</option>
            </select>"#,
        );
        let variants = VariantCollector::default().collect(&p);
        let texts: Vec<_> = variants.sizes.iter().map(|o| o.text.as_str()).collect();
        assert_eq!(texts, vec!["S", "M", "L"]);
        assert!(variants.sizes[1].selected);
        assert_eq!(variants.sizes[0].value.as_deref(), Some("s"));
    }

    #[test]
    fn test_swatch_values() {
        let p = page(
            r#"<ul class="color-selector">
                <li class="swatch is-selected" title="Red" style="background-color: #ff0000"></li>
                <li title="Blue"><img src="/swatches/blue.png" alt="Blue"></li>
                <li>Green</li>
            </ul>"#,
        );
        let variants = VariantCollector::default().collect(&p);
        assert_eq!(variants.colors.len(), 3);
        assert_eq!(variants.colors[0].text, "Red");
        assert!(variants.colors[0].selected);
        assert_eq!(variants.colors[0].value.as_deref(), Some("#ff0000"));
        assert_eq!(variants.colors[1].value.as_deref(), Some("https://shop.test/swatches/blue.png"));
        assert_eq!(variants.colors[2].value.as_deref(), Some("Green"));
    }

    #[test]
    fn test_skips_unrelated_form_fields() {
        let p = page(
            r#"<form>
                <label for="country-size">Country</label>
                <select id="country-size" name="size_country">
                    <option>Turkey</option>
                </select>
                <select name="size-phone"><option>+90</option><option>+1</option></select>
                <select name="size"><option>Mr</option><option>XL</option></select>
            </form>"#,
        );
        let variants = VariantCollector::default().collect(&p);
        let texts: Vec<_> = variants.sizes.iter().map(|o| o.text.as_str()).collect();
        assert_eq!(texts, vec!["XL"]);
    }

    #[test]
    fn test_is_noise() {
        assert!(is_noise(""));
        assert!(is_noise("Select a colour"));
        assert!(is_noise("Seçiniz"));
        assert!(is_noise("Mrs."));
        assert!(is_noise("+44"));
        assert!(!is_noise("42"));
        assert!(!is_noise("Navy Blue"));
    }

    #[test]
    fn test_selected_from_parent_class() {
        let p = page(r#"<ul><li class="active"><a id="x">M</a></li><li><a id="y">L</a></li></ul>"#);
        assert!(is_selected(p.find(&["#x"]).unwrap()));
        assert!(!is_selected(p.find(&["#y"]).unwrap()));
    }

    #[test]
    fn test_negated_state_classes_not_selected() {
        let p = page(
            r#"<ul>
                <li id="a" class="size unselected">S</li>
                <li id="b" class="size inactive">M</li>
                <li id="c" class="size not-selected">L</li>
                <li id="d" class="size is-unchecked">XL</li>
                <li id="e" class="size size--selected">XXL</li>
                <li id="f" class="swatch -active">Red</li>
            </ul>"#,
        );
        for id in ["#a", "#b", "#c", "#d"] {
            assert!(!is_selected(p.find(&[id]).unwrap()), "{} should not be selected", id);
        }
        assert!(is_selected(p.find(&["#e"]).unwrap()));
        assert!(is_selected(p.find(&["#f"]).unwrap()));
    }

    #[test]
    fn test_unselected_duplicate_does_not_win() {
        let p = page(
            r#"<ul class="sizes">
                <li class="size unselected" data-value="m-1">M</li>
                <li class="size selected" data-value="m-2">M</li>
            </ul>"#,
        );
        assert!(!selected_class("unselected"));
        let sizes = dedupe(vec![
            VariantOption::new("M", is_selected(p.find(&[".unselected"]).unwrap()), Some("m-1".into())),
            VariantOption::new("M", is_selected(p.find(&[".selected"]).unwrap()), Some("m-2".into())),
        ]);
        assert_eq!(sizes.len(), 1);
        assert_eq!(sizes[0].value.as_deref(), Some("m-2"));
    }

    #[test]
    fn test_other_options_do_not_repeat_sizes() {
        let p = page(
            r#"<select name="size"><option>S</option><option>M</option></select>
               <div class="variations"><select><option>M</option><option>Cotton</option></select></div>"#,
        );
        let variants = VariantCollector::default().collect(&p);
        let other: Vec<_> = variants.other_options.iter().map(|o| o.text.as_str()).collect();
        assert_eq!(other, vec!["Cotton"]);
    }

    #[test]
    fn test_collect_within_scope() {
        let p = page(
            r#"<div id="a"><select name="size"><option>S</option></select></div>
               <div id="b"><select name="size"><option>XXL</option></select></div>"#,
        );
        let scope = p.find(&["#b"]).unwrap();
        let variants = VariantCollector::default().collect_within(&p, scope);
        assert_eq!(variants.sizes.len(), 1);
        assert_eq!(variants.sizes[0].text, "XXL");
    }
}
