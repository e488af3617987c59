//! Reading named values out of a `Cookie`-style string.
//!
//! The input is the raw `name1=value1; name2=value2` text the host exposes
//! (`document.cookie` in a browser, the `Cookie` request header on a server).
//! Parsing never fails: malformed segments are skipped.

use std::borrow::Cow;

/// Return the percent-decoded value of the first cookie called `name`.
///
/// A segment matches when, after trimming, it starts with exactly
/// `name=` (case-sensitive). Earlier duplicates win. A value that does not
/// decode to UTF-8 is returned undecoded.
pub fn extract(cookie_string: &str, name: &str) -> Option<String> {
    if cookie_string.is_empty() {
        return None;
    }
    cookie_string.split(';').map(str::trim).find_map(|segment| {
        let value = segment.strip_prefix(name)?.strip_prefix('=')?;
        Some(decode(value).into_owned())
    })
}

/// Every well-formed `name=value` pair, in order, values percent-decoded.
///
/// Segments without `=` or with an empty name are skipped.
pub fn parse(cookie_string: &str) -> Vec<(String, String)> {
    cookie_string
        .split(';')
        .filter_map(|segment| {
            let (name, value) = segment.trim().split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), decode(value.trim()).into_owned()))
        })
        .collect()
}

fn decode(value: &str) -> Cow<'_, str> {
    urlencoding::decode(value).unwrap_or(Cow::Borrowed(value))
}
