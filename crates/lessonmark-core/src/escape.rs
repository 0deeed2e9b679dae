//! HTML escaping and reference label normalization.

use html_escape::{encode_double_quoted_attribute, encode_text};

/// Escape text content: `&`, `<` and `>`.
///
/// ```rust
/// use lessonmark_core::escape::escape_html;
///
/// assert_eq!(escape_html("a < b && c"), "a &lt; b &amp;&amp; c");
/// ```
#[inline]
pub fn escape_html(s: &str) -> String {
    encode_text(s).into_owned()
}

/// Escape a value placed inside a double-quoted attribute: `&`, `"`, `<`
/// and `>`.
#[inline]
pub fn escape_html_attr(s: &str) -> String {
    encode_double_quoted_attribute(s).into_owned()
}

/// Canonical key for a reference label: trimmed, lowercased, with every
/// whitespace run collapsed to a single space.
///
/// ```rust
/// use lessonmark_core::escape::normalize_ref_label;
///
/// assert_eq!(normalize_ref_label("  Foo \t  BAR "), "foo bar");
/// ```
pub fn normalize_ref_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    for word in label.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.extend(word.chars().flat_map(char::to_lowercase));
    }
    out
}
