//! CSS identifier and string escaping, on top of `cssparser`'s serializers

use cssparser::{serialize_identifier, CssStringWriter};
use std::fmt::Write;

/// Escape `ident` so it can be used verbatim after `#` or `.` in a selector.
///
/// CSSOM `CSS.escape` rules: NUL becomes U+FFFD, control characters and a
/// leading digit become hex escapes, a lone `-` is backslash-escaped, other
/// ASCII outside `[A-Za-z0-9_-]` gets a backslash. Non-ASCII passes through.
pub fn css_escape(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len() + 4);
    let written = serialize_identifier(ident, &mut out);
    written.map(|()| out).unwrap_or_default()
}

/// Escape a value for use inside a double-quoted attribute selector string
pub fn escape_attribute_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    let written = CssStringWriter::new(&mut out).write_str(value);
    written.map(|()| out).unwrap_or_default()
}
