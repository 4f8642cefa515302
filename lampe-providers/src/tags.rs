//! Tagged-region editing of PR bodies.
//!
//! Machine-managed spans are delimited by markdown-invisible markers
//! `[](lampe-sdk-<feature>-start)` / `[](lampe-sdk-<feature>-end)` so the
//! rest of the body stays human-editable.

use regex::{NoExpand, Regex};

/// Replaces the text between the first pair of feature markers, or appends
/// a marker-wrapped block at the bottom when no pair exists.
///
/// Only the first occurrence is updated; later pairs are left intact. The
/// markers themselves are preserved.
pub fn update_or_add_text_between_tags(text: &str, new_text: &str, feature: &str) -> String {
    let start_tag = format!("[](lampe-sdk-{feature}-start)");
    let end_tag = format!("[](lampe-sdk-{feature}-end)");

    let pattern = format!(
        r"(?s)\[\]\(lampe-sdk-{feature}-start\)(?:.*?)\[\]\(lampe-sdk-{feature}-end\)",
        feature = regex::escape(feature)
    );
    let re = Regex::new(&pattern).expect("static marker pattern");

    let replacement = format!("{start_tag}\n{new_text}\n{end_tag}");
    if re.is_match(text) {
        re.replace(text, NoExpand(&replacement)).into_owned()
    } else {
        format!("{text}\n\n{replacement}")
    }
}
