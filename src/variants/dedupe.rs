//! Merging of duplicate variant options.

use crate::model::VariantOption;
use serde_json::Value;

/// Collapses options sharing the same `text`, keeping first-seen order.
///
/// Among duplicates the selected option wins; between two options with the
/// same selection state the one with the richer `value` wins.
pub fn dedupe(options: Vec<VariantOption>) -> Vec<VariantOption> {
    let mut kept: Vec<VariantOption> = Vec::with_capacity(options.len());

    for option in options {
        match kept.iter_mut().find(|existing| existing.text == option.text) {
            Some(existing) => {
                if outranks(&option, existing) {
                    *existing = option;
                }
            }
            None => kept.push(option),
        }
    }

    kept
}

fn outranks(candidate: &VariantOption, existing: &VariantOption) -> bool {
    if candidate.selected != existing.selected {
        return candidate.selected;
    }
    richness(candidate) > richness(existing)
}

/// 2 for a JSON object payload, 1 for a value distinct from the text, else 0.
fn richness(option: &VariantOption) -> u8 {
    match option.value.as_deref() {
        Some(value) if serde_json::from_str::<Value>(value).is_ok_and(|v| v.is_object()) => 2,
        Some(value) if !value.is_empty() && value != option.text => 1,
        _ => 0,
    }
}
