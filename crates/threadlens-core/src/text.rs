//! Text normalization helpers.

/// Marker appended to text cut short by [`truncate_chars`].
pub const ELLIPSIS: &str = "...";

/// Collapse every run of whitespace into a single space and trim the ends.
///
/// ```rust
/// use threadlens_core::text::clean_text;
///
/// assert_eq!(clean_text("  hello \n\n\t world  "), "hello world");
/// ```
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate `text` to at most `max_chars` characters.
///
/// When the text is longer than the budget, the first `max_chars`
/// characters are kept and [`ELLIPSIS`] is appended. Counting is by
/// `char`, so multi-byte text is never split inside a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => {
            let mut out = String::with_capacity(byte_idx + ELLIPSIS.len());
            out.push_str(&text[..byte_idx]);
            out.push_str(ELLIPSIS);
            out
        }
        None => text.to_string(),
    }
}
