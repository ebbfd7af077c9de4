//! Query string dictionary for request parameters.
//!
//! [`QueryDict`] wraps an insertion-ordered
//! [`MultiValueDict`](singleurlcrud_core::utils::MultiValueDict) and holds
//! both the query string (`GET`) and the form-encoded body (`POST`).

use singleurlcrud_core::utils::MultiValueDict;
use singleurlcrud_core::{CrudError, CrudResult};

/// An immutable-by-default dictionary for query string and form data.
///
/// [`copy`](QueryDict::copy) returns a mutable clone.
///
/// # Examples
///
/// ```
/// use singleurlcrud_http::QueryDict;
///
/// let qd = QueryDict::parse("o=edit&item=5&ids=1%2C2&ids=3");
/// assert_eq!(qd.get("o"), Some("edit"));
/// assert_eq!(qd.get_first("ids"), Some("1,2"));
///
/// let mut mutable = qd.copy();
/// mutable.set("o", "delete").unwrap();
/// assert_eq!(mutable.get("o"), Some("delete"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryDict {
    data: MultiValueDict<String, String>,
    mutable: bool,
}

impl QueryDict {
    /// Creates a new, empty, immutable `QueryDict`.
    pub const fn new() -> Self {
        Self {
            data: MultiValueDict::new(),
            mutable: false,
        }
    }

    /// Creates a new, empty, mutable `QueryDict`.
    pub const fn new_mutable() -> Self {
        Self {
            data: MultiValueDict::new(),
            mutable: true,
        }
    }

    /// Parses a URL query string or form body into an immutable `QueryDict`.
    ///
    /// Handles percent-encoding (with `+` as space) and repeated keys.
    pub fn parse(query_string: &str) -> Self {
        let data = parse_pairs(query_string).collect();
        Self {
            data,
            mutable: false,
        }
    }

    /// Returns the last value for the given key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(&key.to_string()).map(String::as_str)
    }

    /// Returns the first value for the given key.
    pub fn get_first(&self, key: &str) -> Option<&str> {
        self.data.get_first(&key.to_string()).map(String::as_str)
    }

    /// Returns all values for the given key.
    pub fn get_list(&self, key: &str) -> Option<&Vec<String>> {
        self.data.get_list(&key.to_string())
    }

    /// Sets a single value for the given key, replacing any existing values.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::SuspiciousOperation`] if this `QueryDict` is immutable.
    pub fn set(&mut self, key: &str, value: &str) -> CrudResult<()> {
        self.ensure_mutable()?;
        self.data.set(key.to_string(), value.to_string());
        Ok(())
    }

    /// Appends a value to the list for the given key.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::SuspiciousOperation`] if this `QueryDict` is immutable.
    pub fn append(&mut self, key: &str, value: &str) -> CrudResult<()> {
        self.ensure_mutable()?;
        self.data.append(key.to_string(), value.to_string());
        Ok(())
    }

    fn ensure_mutable(&self) -> CrudResult<()> {
        if self.mutable {
            Ok(())
        } else {
            Err(CrudError::SuspiciousOperation(
                "This QueryDict instance is immutable".to_string(),
            ))
        }
    }

    /// Returns a mutable copy of this `QueryDict`.
    #[must_use]
    pub fn copy(&self) -> Self {
        Self {
            data: self.data.clone(),
            mutable: true,
        }
    }

    /// Encodes this `QueryDict` as a URL query string, keys in insertion
    /// order.
    pub fn urlencode(&self) -> String {
        self.data
            .iter()
            .flat_map(|(key, values)| {
                values
                    .iter()
                    .map(move |value| format!("{}={}", encode(key), encode(value)))
            })
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Returns `true` if this `QueryDict` is mutable.
    pub const fn is_mutable(&self) -> bool {
        self.mutable
    }

    /// Returns the number of distinct keys.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the `QueryDict` contains no keys.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` if the specified key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(&key.to_string())
    }

    /// Returns an iterator over the keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.data.keys()
    }

    /// Returns a reference to the underlying `MultiValueDict`.
    pub const fn data(&self) -> &MultiValueDict<String, String> {
        &self.data
    }
}

/// Splits a query string into decoded `(key, value)` pairs, preserving order.
pub fn parse_pairs(query_string: &str) -> impl Iterator<Item = (String, String)> + '_ {
    query_string
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode(key), decode(value))
        })
}

/// Decodes a form-encoded component.
pub fn decode(input: &str) -> String {
    let plus_decoded = input.replace('+', " ");
    percent_encoding::percent_decode_str(&plus_decoded)
        .decode_utf8_lossy()
        .into_owned()
}

/// Characters left unescaped in query components, besides alphanumerics.
const QUERY_COMPONENT: &percent_encoding::AsciiSet = &percent_encoding::NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encodes a string for use as a query component.
pub fn encode(input: &str) -> String {
    percent_encoding::utf8_percent_encode(input, QUERY_COMPONENT).to_string()
}
