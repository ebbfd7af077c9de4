//! URL helpers.
//!
//! The controller lives at a single URL and encodes its operation in the
//! query string, so it needs to rebuild URLs with parameters removed or
//! added while leaving everything else exactly as the client sent it.

use crate::request::HttpRequest;

/// Query parameters that select an operation and never survive a redirect
/// back to the list.
pub const TRANSIENT_PARAMS: [&str; 2] = ["o", "item"];

/// Returns the request path with its original query pairs, minus `o` and
/// `item`.
///
/// The remaining pairs keep their original order and encoding.
///
/// # Examples
///
/// ```
/// use singleurlcrud_http::url::canonical_url;
///
/// assert_eq!(canonical_url("/things/", "o=edit&item=5&page=2"), "/things/?page=2");
/// assert_eq!(canonical_url("/things/", "o=add"), "/things/");
/// ```
pub fn canonical_url(path: &str, query_string: &str) -> String {
    strip_params(path, query_string, &TRANSIENT_PARAMS)
}

/// [`canonical_url`] for a request.
pub fn canonical_url_for(request: &HttpRequest) -> String {
    canonical_url(request.path(), request.query_string())
}

/// Returns `path` with every query pair whose decoded key is in `remove`
/// dropped.
pub fn strip_params(path: &str, query_string: &str, remove: &[&str]) -> String {
    let kept: Vec<&str> = query_string
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| {
            let key = pair.split_once('=').map_or(*pair, |(k, _)| k);
            !remove.contains(&crate::querydict::decode(key).as_str())
        })
        .collect();
    if kept.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{}", kept.join("&"))
    }
}

/// Appends query parameters to a URL that may already carry a query.
///
/// # Examples
///
/// ```
/// use singleurlcrud_http::url::with_params;
///
/// assert_eq!(with_params("/authors/", &[("o", "add")]), "/authors/?o=add");
/// assert_eq!(with_params("/q/?page=2", &[("o", "delete"), ("item", "4")]),
///            "/q/?page=2&o=delete&item=4");
/// ```
pub fn with_params(url: &str, params: &[(&str, &str)]) -> String {
    if params.is_empty() {
        return url.to_string();
    }
    let encoded = params
        .iter()
        .map(|(k, v)| format!("{}={}", crate::querydict::encode(k), crate::querydict::encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    let sep = if url.contains('?') {
        if url.ends_with('?') || url.ends_with('&') {
            ""
        } else {
            "&"
        }
    } else {
        "?"
    };
    format!("{url}{sep}{encoded}")
}

/// Splits a comma-separated id list, trimming blanks.
///
/// # Examples
///
/// ```
/// use singleurlcrud_http::url::split_ids;
///
/// assert_eq!(split_ids("1, 2,,3"), vec!["1", "2", "3"]);
/// ```
pub fn split_ids(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_preserves_order() {
        assert_eq!(
            canonical_url("/things/", "page=2&o=edit&sort=name&item=5&q=a%20b"),
            "/things/?page=2&sort=name&q=a%20b"
        );
    }

    #[test]
    fn test_canonical_no_dangling_separators() {
        assert_eq!(canonical_url("/things/", "o=edit&item=5"), "/things/");
        assert_eq!(canonical_url("/things/", ""), "/things/");
        assert_eq!(canonical_url("/things/", "&&o=list&"), "/things/");
    }

    #[test]
    fn test_canonical_keeps_repeated_params() {
        assert_eq!(canonical_url("/t/", "tag=a&o=add&tag=b"), "/t/?tag=a&tag=b");
    }

    #[test]
    fn test_canonical_encoded_key_is_stripped() {
        assert_eq!(canonical_url("/t/", "%6F=edit&page=1"), "/t/?page=1");
    }

    #[test]
    fn test_canonical_for_request() {
        let request = HttpRequest::builder()
            .path("/polls/questions/")
            .query_string("o=delete&item=9&_popup=1")
            .build();
        assert_eq!(canonical_url_for(&request), "/polls/questions/?_popup=1");
    }

    #[test]
    fn test_with_params_trailing_separator() {
        assert_eq!(with_params("/a/?", &[("o", "add")]), "/a/?o=add");
        assert_eq!(with_params("/a/", &[]), "/a/");
    }

    #[test]
    fn test_split_ids_empty() {
        assert!(split_ids("").is_empty());
    }
}
