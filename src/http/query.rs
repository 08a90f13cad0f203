//! Query string and `application/x-www-form-urlencoded` encoding.
//!
//! The two encoders differ only in which characters they leave alone:
//!
//! - [`build_query_string`] keeps every character that is legal inside a URL
//!   (unreserved plus reserved), so `&`, `=` and `+` pass through.
//! - [`build_form_string`] keeps only the unreserved set, so a value such as
//!   `1&2` survives the trip to the server intact.
//!
//! Keys are written literally in both cases.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::fmt::Write;

/// Everything outside `A-Z a-z 0-9 - _ . ~` is encoded.
const DATA_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Like [`DATA_ENCODE_SET`] but RFC 3986 reserved characters stay as-is.
const URI_ENCODE_SET: &AsciiSet = &DATA_ENCODE_SET
    .remove(b':')
    .remove(b'/')
    .remove(b'?')
    .remove(b'#')
    .remove(b'[')
    .remove(b']')
    .remove(b'@')
    .remove(b'!')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=');

/// Build a query string (without the leading `?`).
///
/// ```
/// let qs = formpost::build_query_string([("q", "a b"), ("next", "/home?x=1")]);
/// assert_eq!(qs, "q=a%20b&next=/home?x=1");
/// ```
pub fn build_query_string<I, K, V>(pairs: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    join_pairs(pairs, URI_ENCODE_SET)
}

/// Build an `application/x-www-form-urlencoded` body.
///
/// ```
/// let body = formpost::build_form_string([("name", "a b"), ("x", "1&2")]);
/// assert_eq!(body, "name=a%20b&x=1%262");
/// ```
pub fn build_form_string<I, K, V>(pairs: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    join_pairs(pairs, DATA_ENCODE_SET)
}

/// Append `pairs` to `url` as a query string.
///
/// Uses `&` when the URL already carries a query. An empty mapping leaves
/// the URL untouched.
pub fn append_query<I, K, V>(url: &str, pairs: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let query = build_query_string(pairs);
    if query.is_empty() {
        return url.to_string();
    }
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{url}{sep}{query}")
}

fn join_pairs<I, K, V>(pairs: I, set: &'static AsciiSet) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut out = String::new();
    for (i, (key, value)) in pairs.into_iter().enumerate() {
        if i > 0 {
            out.push('&');
        }
        out.push_str(key.as_ref());
        out.push('=');
        // Writing to a String cannot fail.
        let _ = write!(out, "{}", utf8_percent_encode(value.as_ref(), set));
    }
    out
}

/// Flatten a serializable value into form pairs.
///
/// The value must serialize to a flat object. Strings are used verbatim,
/// numbers and booleans through their display form. `null`, arrays and
/// nested objects are rejected.
#[cfg(feature = "json")]
pub fn pairs_from_object<T: serde::Serialize>(
    value: &T,
) -> Result<Vec<(String, String)>, crate::base::neterror::NetError> {
    use crate::base::neterror::NetError;
    use serde_json::Value;

    let Value::Object(map) = serde_json::to_value(value).map_err(|_| NetError::UnsupportedFormValue)?
    else {
        return Err(NetError::UnsupportedFormValue);
    };

    map.into_iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Null | Value::Array(_) | Value::Object(_) => {
                    return Err(NetError::UnsupportedFormValue)
                }
            };
            Ok((key, value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_empty_mapping() {
        let empty: Vec<(&str, &str)> = Vec::new();
        assert_eq!(build_query_string(empty.clone()), "");
        assert_eq!(build_form_string(empty), "");
    }

    #[test]
    fn test_form_string_escapes_reserved() {
        let body = build_form_string([("name", "a b"), ("x", "1&2")]);
        assert_eq!(body, "name=a%20b&x=1%262");

        let body = build_form_string([("k", "a=b+c/d?e")]);
        assert_eq!(body, "k=a%3Db%2Bc%2Fd%3Fe");
    }

    #[test]
    fn test_query_string_keeps_reserved() {
        let qs = build_query_string([("x", "1&2"), ("y", "a=b+c")]);
        assert_eq!(qs, "x=1&2&y=a=b+c");
    }

    #[test]
    fn test_escapers_differ_on_ampersand() {
        let pairs = [("x", "1&2")];
        assert_ne!(build_query_string(pairs), build_form_string(pairs));
    }

    #[test]
    fn test_percent_and_non_ascii() {
        assert_eq!(build_query_string([("p", "100%")]), "p=100%25");
        assert_eq!(build_form_string([("p", "100%")]), "p=100%25");
        assert_eq!(build_form_string([("city", "北京")]), "city=%E5%8C%97%E4%BA%AC");
        assert_eq!(build_query_string([("city", "北京")]), "city=%E5%8C%97%E4%BA%AC");
    }

    #[test]
    fn test_unreserved_untouched() {
        let value = "AZaz09-_.~";
        assert_eq!(build_form_string([("v", value)]), format!("v={value}"));
        assert_eq!(build_query_string([("v", value)]), format!("v={value}"));
    }

    #[test]
    fn test_order_follows_input() {
        let mut map = BTreeMap::new();
        map.insert("b", "2");
        map.insert("a", "1");
        assert_eq!(build_form_string(&map), "a=1&b=2");
        assert_eq!(build_form_string([("b", "2"), ("a", "1")]), "b=2&a=1");
    }

    #[test]
    fn test_append_query() {
        assert_eq!(
            append_query("http://h/p", [("a", "1")]),
            "http://h/p?a=1"
        );
        assert_eq!(
            append_query("http://h/p?z=0", [("a", "1")]),
            "http://h/p?z=0&a=1"
        );
        let empty: [(&str, &str); 0] = [];
        assert_eq!(append_query("http://h/p", empty), "http://h/p");
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_pairs_from_object() {
        #[derive(serde::Serialize)]
        struct Token<'a> {
            appid: &'a str,
            grant_type: &'a str,
            expires: u32,
            refresh: bool,
        }

        let pairs = pairs_from_object(&Token {
            appid: "wx123",
            grant_type: "client_credential",
            expires: 7200,
            refresh: false,
        })
        .unwrap();

        assert!(pairs.contains(&("appid".into(), "wx123".into())));
        assert!(pairs.contains(&("expires".into(), "7200".into())));
        assert!(pairs.contains(&("refresh".into(), "false".into())));
        assert_eq!(pairs.len(), 4);
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_pairs_from_object_rejects_nested() {
        use crate::base::neterror::NetError;

        let nested = serde_json::json!({ "a": { "b": 1 } });
        assert_eq!(pairs_from_object(&nested), Err(NetError::UnsupportedFormValue));

        let null = serde_json::json!({ "a": null });
        assert_eq!(pairs_from_object(&null), Err(NetError::UnsupportedFormValue));

        assert_eq!(pairs_from_object(&"text"), Err(NetError::UnsupportedFormValue));
    }
}
