//! Bounded text sanitizer.
//!
//! Every free-text field taken from an upstream goes through [`sanitize`]
//! before it reaches a caller or the cache.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Inputs longer than this that look tabular are replaced wholesale.
pub const TABLE_DUMP_THRESHOLD: usize = 5000;

/// Maximum length of a cleaned field, ellipsis included.
pub const MAX_FIELD_CHARS: usize = 1000;

pub const ELLIPSIS: &str = "...";

pub const TABLE_PLACEHOLDER: &str = "[Table content removed due to size]";

// Literal patterns; compilation cannot fail.
#[allow(clippy::expect_used)]
fn tag_pattern() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(r"<[^>]*>").expect("tag pattern"))
}

#[allow(clippy::expect_used)]
fn table_marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| Regex::new(r"(?i)<t(?:able|d)").expect("table marker pattern"))
}

/// Clean a sequence of optional strings. Absent and empty entries are dropped;
/// order is preserved.
pub fn sanitize<I, S>(texts: I) -> Vec<String>
where
    I: IntoIterator<Item = Option<S>>,
    S: AsRef<str>,
{
    texts
        .into_iter()
        .flatten()
        .filter(|text| !text.as_ref().is_empty())
        .map(|text| sanitize_one(text.as_ref()))
        .collect()
}

/// [`sanitize`] over a decoded JSON value. Anything but an array yields an
/// empty list; non-string array members count as absent.
pub fn sanitize_value(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => sanitize(items.iter().map(Value::as_str)),
        _ => Vec::new(),
    }
}

/// Clean a single non-empty string.
pub fn sanitize_one(text: &str) -> String {
    if text.chars().count() > TABLE_DUMP_THRESHOLD && table_marker().is_match(text) {
        return TABLE_PLACEHOLDER.to_string();
    }
    truncate_with_ellipsis(&strip_markup(text), MAX_FIELD_CHARS)
}

/// Replace every tag with a space, collapse whitespace runs and trim.
pub fn strip_markup(text: &str) -> String {
    let spaced = tag_pattern().replace_all(text, " ");
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cap `text` at `max_chars` characters, ending in [`ELLIPSIS`] when cut.
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(ELLIPSIS.len());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_empty_input_yields_empty_output() {
        let empty: Vec<Option<&str>> = Vec::new();
        assert!(sanitize(empty).is_empty());
    }

    #[test]
    fn test_absent_and_empty_entries_are_skipped() {
        let out = sanitize(vec![Some("a"), None, Some(""), Some("b")]);
        assert_eq!(out, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_large_table_becomes_placeholder() {
        let dump = format!("<TABLE>{}</table>", "x".repeat(6000));
        let out = sanitize(vec![Some(dump.as_str())]);
        assert_eq!(out, vec![TABLE_PLACEHOLDER.to_string()]);
        assert!(out[0].len() < 100);
    }

    #[test]
    fn test_large_td_fragment_becomes_placeholder() {
        let dump = format!("{}<Td>cell", "y".repeat(5001));
        assert_eq!(sanitize_one(&dump), TABLE_PLACEHOLDER);
    }

    #[test]
    fn test_small_table_is_stripped_not_replaced() {
        assert_eq!(sanitize_one("<table><tr><td>1</td></tr></table>"), "1");
    }

    #[test]
    fn test_tags_stripped_and_whitespace_collapsed() {
        assert_eq!(sanitize_one("<p>Hello   world</p>"), "Hello world");
        assert_eq!(sanitize_one("a<br/>b\n\n\tc"), "a b c");
    }

    #[test]
    fn test_long_plain_text_truncated_to_exact_length() {
        let out = sanitize_one(&"z".repeat(1200));
        assert_eq!(out.chars().count(), 1000);
        assert!(out.ends_with(ELLIPSIS));
        assert_eq!(&out[..997], "z".repeat(997));
    }

    #[test]
    fn test_exactly_max_is_untouched() {
        let text = "q".repeat(MAX_FIELD_CHARS);
        assert_eq!(sanitize_one(&text), text);
    }

    #[test]
    fn test_truncation_counts_chars_not_bytes() {
        let out = truncate_with_ellipsis(&"é".repeat(20), 10);
        assert_eq!(out.chars().count(), 10);
        assert_eq!(out, format!("{}...", "é".repeat(7)));
    }

    #[test]
    fn test_sanitize_value_requires_array() {
        assert!(sanitize_value(Some(&json!("text"))).is_empty());
        assert!(sanitize_value(None).is_empty());
        assert_eq!(
            sanitize_value(Some(&json!(["<b>Aspirin</b>", null, 3, "Bayer"]))),
            vec!["Aspirin".to_string(), "Bayer".to_string()]
        );
    }

    proptest! {
        #[test]
        fn prop_output_never_exceeds_max(text in ".{1,3000}") {
            let out = sanitize_one(&text);
            prop_assert!(out.chars().count() <= MAX_FIELD_CHARS);
        }

        #[test]
        fn prop_output_is_collapsed_and_trimmed(text in "[a-z <>/]{1,200}") {
            let out = sanitize_one(&text);
            prop_assert!(!out.contains("  "));
            prop_assert_eq!(out.trim(), out.as_str());
        }

        #[test]
        fn prop_order_and_count_preserved(items in proptest::collection::vec("[a-z]{1,10}", 0..8)) {
            let out = sanitize(items.iter().map(|s| Some(s.as_str())));
            prop_assert_eq!(out, items);
        }
    }
}
