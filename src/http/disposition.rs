//! Content-Disposition formatting module
//!
//! ASCII names go into a quoted `filename` parameter; anything else uses the
//! RFC 5987 `filename*=utf-8''...` form.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Bytes outside RFC 5987 `attr-char`
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

/// `attachment` disposition for `file_name`
///
/// # Examples
/// ```
/// use filedrop::http::disposition::attachment;
/// assert_eq!(attachment("notes.txt"), r#"attachment; filename="notes.txt""#);
/// assert_eq!(attachment("café.txt"), "attachment; filename*=utf-8''caf%C3%A9.txt");
/// ```
pub fn attachment(file_name: &str) -> String {
    if file_name.chars().all(|c| c.is_ascii() && !c.is_ascii_control()) {
        format!("attachment; filename=\"{}\"", escape_quoted(file_name))
    } else {
        format!("attachment; filename*=utf-8''{}", utf8_percent_encode(file_name, ATTR_CHAR))
    }
}

fn escape_quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
