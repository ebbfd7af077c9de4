//! Request factory for building [`HttpRequest`] objects in tests.
//!
//! [`RequestFactory`] builds requests directly, bypassing the router, for
//! calling a view's `dispatch` in isolation.
//!
//! ## Example
//!
//! ```rust
//! use singleurlcrud_test::request_factory::RequestFactory;
//!
//! let factory = RequestFactory::new();
//! let request = factory.get("/polls/questions/?o=edit&item=3");
//! assert_eq!(request.path(), "/polls/questions/");
//! assert_eq!(request.get().get("item"), Some("3"));
//! ```

use std::collections::HashMap;

use http::Method;

use singleurlcrud_http::HttpRequest;

/// Builds [`HttpRequest`]s without routing.
#[derive(Debug, Default)]
pub struct RequestFactory {
    default_headers: Vec<(String, String)>,
    cookies: HashMap<String, String>,
}

impl RequestFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header sent with every request.
    #[must_use]
    pub fn with_default_header(mut self, name: &str, value: &str) -> Self {
        self.default_headers
            .push((name.to_string(), value.to_string()));
        self
    }

    /// Adds a cookie sent with every request.
    #[must_use]
    pub fn with_cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies.insert(name.to_string(), value.to_string());
        self
    }

    /// Builds a GET request; `path` may carry a query string.
    pub fn get(&self, path: &str) -> HttpRequest {
        self.builder(Method::GET, path).build()
    }

    /// Builds a POST request with a form body from `data`, in order.
    pub fn post(&self, path: &str, data: &[(&str, &str)]) -> HttpRequest {
        self.builder(Method::POST, path).form(data).build()
    }

    /// Builds a HEAD request.
    pub fn head(&self, path: &str) -> HttpRequest {
        self.builder(Method::HEAD, path).build()
    }

    fn builder(&self, method: Method, path: &str) -> singleurlcrud_http::HttpRequestBuilder {
        let (path, query) = path.split_once('?').unwrap_or((path, ""));
        let mut builder = HttpRequest::builder()
            .method(method)
            .path(path)
            .query_string(query);
        for (name, value) in &self.default_headers {
            builder = builder.header(name, value);
        }
        if !self.cookies.is_empty() {
            let mut pairs: Vec<String> = self
                .cookies
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            pairs.sort();
            builder = builder.header("cookie", &pairs.join("; "));
        }
        builder
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_splits_query() {
        let request = RequestFactory::new().get("/polls/authors/?page=2&_popup=1");
        assert_eq!(request.method(), &Method::GET);
        assert_eq!(request.path(), "/polls/authors/");
        assert_eq!(request.query_string(), "page=2&_popup=1");
        assert_eq!(request.get().get("_popup"), Some("1"));
    }

    #[test]
    fn test_post_form_body() {
        let request = RequestFactory::new().post(
            "/polls/questions/?o=action",
            &[("handler", "delete_selected"), ("ids", "4,5")],
        );
        assert_eq!(request.method(), &Method::POST);
        assert_eq!(request.post().get("handler"), Some("delete_selected"));
        assert_eq!(request.post().get("ids"), Some("4,5"));
        assert_eq!(request.get().get("o"), Some("action"));
    }

    #[test]
    fn test_defaults_applied() {
        let factory = RequestFactory::new()
            .with_default_header("x-requested-with", "XMLHttpRequest")
            .with_cookie("messages", "abc");
        let request = factory.get("/");
        assert_eq!(request.cookie("messages"), Some("abc"));
        assert_eq!(
            request
                .headers()
                .get("x-requested-with")
                .and_then(|v| v.to_str().ok()),
            Some("XMLHttpRequest")
        );
    }
}
