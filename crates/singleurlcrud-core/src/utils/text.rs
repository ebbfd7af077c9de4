//! String utility functions.
//!
//! Helpers for turning schema names into labels (`capfirst`, `title`) and for
//! embedding text safely in HTML attributes and inline JavaScript
//! (`escape`, `escapejs`).

use std::fmt::Write;

/// Capitalizes the first character of a string.
///
/// # Examples
///
/// ```
/// use singleurlcrud_core::utils::text::capfirst;
///
/// assert_eq!(capfirst("date published"), "Date published");
/// assert_eq!(capfirst(""), "");
/// ```
pub fn capfirst(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |c| {
        let mut result = c.to_uppercase().to_string();
        result.extend(chars);
        result
    })
}

/// Title-cases a string: the first letter of every alphabetic run is
/// uppercased, the remaining letters lowercased.
///
/// # Examples
///
/// ```
/// use singleurlcrud_core::utils::text::title;
///
/// assert_eq!(title("question"), "Question");
/// assert_eq!(title("poll CHOICE"), "Poll Choice");
/// ```
pub fn title(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

/// Escapes HTML special characters.
///
/// # Examples
///
/// ```
/// use singleurlcrud_core::utils::text::escape;
///
/// assert_eq!(escape(r#"<a href="x">Tom & Jerry's</a>"#),
///            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&#x27;s&lt;/a&gt;");
/// ```
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escapes a string for use inside a JavaScript string literal.
///
/// Quotes, angle brackets, and other characters that could terminate the
/// literal or the surrounding `<script>` element are replaced by `\uXXXX`
/// escapes, as are control characters.
///
/// # Examples
///
/// ```
/// use singleurlcrud_core::utils::text::escapejs;
///
/// assert_eq!(escapejs("a\"b"), "a\\u0022b");
/// assert_eq!(escapejs("</script>"), "\\u003C/script\\u003E");
/// ```
pub fn escapejs(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' | '\'' | '"' | '>' | '<' | '&' | '=' | '-' | ';' | '`' | '\u{2028}'
            | '\u{2029}' => {
                let _ = write!(out, "\\u{:04X}", u32::from(c));
            }
            c if u32::from(c) < 32 => {
                let _ = write!(out, "\\u{:04X}", u32::from(c));
            }
            _ => out.push(c),
        }
    }
    out
}
