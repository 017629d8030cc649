//! Text helpers shared by label derivation and the demo tooling

/// Collapse every whitespace run to one space and trim both ends
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cap `text` at `max_chars` characters, ellipsis included
///
/// Cuts at the last space that leaves room for the `…`, or hard-cuts when the
/// text has no such space. Counts chars, never splits a code point.
pub fn truncate_at_word_boundary(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let Some(budget) = max_chars.checked_sub(1) else {
        return String::new();
    };

    let head: Vec<char> = text.chars().take(budget + 1).collect();
    let cut = head
        .iter()
        .rposition(|c| *c == ' ')
        .filter(|&i| i > 0)
        .unwrap_or(budget);

    let mut out: String = head[..cut].iter().collect();
    out.push('…');
    out
}
