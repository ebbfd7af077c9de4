//! HTTP request type.
//!
//! [`HttpRequest`] is the framework-neutral request the controller sees:
//! method, path, raw query string, parsed `GET`/`POST` parameters, headers,
//! and cookies.

use std::collections::HashMap;

use http::{HeaderMap, Method};

use crate::querydict::QueryDict;

/// An incoming HTTP request.
///
/// Instances are created from an axum request via
/// [`HttpRequest::from_axum`], or with [`HttpRequest::builder`] in tests.
///
/// # Examples
///
/// ```
/// use singleurlcrud_http::HttpRequest;
///
/// let request = HttpRequest::builder()
///     .method(http::Method::GET)
///     .path("/polls/questions/")
///     .query_string("o=edit&item=3")
///     .build();
///
/// assert_eq!(request.get().get("item"), Some("3"));
/// assert_eq!(request.get_full_path(), "/polls/questions/?o=edit&item=3");
/// ```
#[derive(Debug, Clone)]
pub struct HttpRequest {
    method: Method,
    path: String,
    query_string: String,
    content_type: Option<String>,
    get: QueryDict,
    post: QueryDict,
    headers: HeaderMap,
    body: Vec<u8>,
    cookies: HashMap<String, String>,
}

impl HttpRequest {
    /// Creates a new [`HttpRequestBuilder`].
    pub fn builder() -> HttpRequestBuilder {
        HttpRequestBuilder::default()
    }

    /// Creates an `HttpRequest` from axum request parts and body bytes.
    ///
    /// A form-encoded body is parsed into [`post`](HttpRequest::post); any
    /// other content type leaves it empty.
    pub fn from_axum(parts: http::request::Parts, body: Vec<u8>) -> Self {
        let query_string = parts.uri.query().unwrap_or("").to_string();
        let content_type = parts
            .headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        Self::assemble(
            parts.method,
            parts.uri.path().to_string(),
            query_string,
            content_type,
            parts.headers,
            body,
        )
    }

    fn assemble(
        method: Method,
        path: String,
        query_string: String,
        content_type: Option<String>,
        headers: HeaderMap,
        body: Vec<u8>,
    ) -> Self {
        let get = QueryDict::parse(&query_string);
        let post = if content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"))
        {
            QueryDict::parse(&String::from_utf8_lossy(&body))
        } else {
            QueryDict::new()
        };
        let cookies = parse_cookies(&headers);

        Self {
            method,
            path,
            query_string,
            content_type,
            get,
            post,
            headers,
            body,
            cookies,
        }
    }

    /// Returns the HTTP method.
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request path without the query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the raw, undecoded query string.
    pub fn query_string(&self) -> &str {
        &self.query_string
    }

    /// Returns the `Content-Type` header, if present.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Returns the parsed query parameters.
    pub const fn get(&self) -> &QueryDict {
        &self.get
    }

    /// Returns the parsed form body.
    pub const fn post(&self) -> &QueryDict {
        &self.post
    }

    /// Returns the request headers.
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the raw body bytes.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Returns the path followed by the query string, if any.
    pub fn get_full_path(&self) -> String {
        if self.query_string.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query_string)
        }
    }

    /// Returns all request cookies.
    pub const fn cookies(&self) -> &HashMap<String, String> {
        &self.cookies
    }

    /// Returns the value of a single cookie.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }
}

fn parse_cookies(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .get_all(http::header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            Some((name.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

/// A builder for constructing [`HttpRequest`] instances.
#[derive(Debug)]
pub struct HttpRequestBuilder {
    method: Method,
    path: String,
    query_string: String,
    content_type: Option<String>,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Default for HttpRequestBuilder {
    fn default() -> Self {
        Self {
            method: Method::GET,
            path: "/".to_string(),
            query_string: String::new(),
            content_type: None,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }
}

impl HttpRequestBuilder {
    /// Sets the HTTP method.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Sets the request path.
    #[must_use]
    pub fn path(mut self, path: &str) -> Self {
        self.path = path.to_string();
        self
    }

    /// Sets the raw query string.
    #[must_use]
    pub fn query_string(mut self, qs: &str) -> Self {
        self.query_string = qs.to_string();
        self
    }

    /// Sets the content type.
    #[must_use]
    pub fn content_type(mut self, ct: &str) -> Self {
        self.content_type = Some(ct.to_string());
        self
    }

    /// Adds a header. Invalid names or values are skipped.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            http::header::HeaderName::from_bytes(name.as_bytes()),
            http::header::HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// Sets the raw body.
    #[must_use]
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Sets a form-encoded body built from `pairs`, in order.
    #[must_use]
    pub fn form(mut self, pairs: &[(&str, &str)]) -> Self {
        let encoded = pairs
            .iter()
            .map(|(k, v)| format!("{}={}", crate::querydict::encode(k), crate::querydict::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        self.body = encoded.into_bytes();
        self.content_type = Some("application/x-www-form-urlencoded".to_string());
        self
    }

    /// Builds the request.
    pub fn build(self) -> HttpRequest {
        HttpRequest::assemble(
            self.method,
            self.path,
            self.query_string,
            self.content_type,
            self.headers,
            self.body,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let request = HttpRequest::builder().build();
        assert_eq!(request.method(), &Method::GET);
        assert_eq!(request.path(), "/");
        assert!(request.get().is_empty());
        assert!(request.post().is_empty());
    }

    #[test]
    fn test_form_body_is_parsed() {
        let request = HttpRequest::builder()
            .method(Method::POST)
            .form(&[("handler", "delete_selected"), ("ids", "1,2")])
            .build();
        assert_eq!(request.post().get("handler"), Some("delete_selected"));
        assert_eq!(request.post().get("ids"), Some("1,2"));
    }

    #[test]
    fn test_non_form_body_not_parsed() {
        let request = HttpRequest::builder()
            .method(Method::POST)
            .content_type("application/json")
            .body(b"{\"a\":1}".to_vec())
            .build();
        assert!(request.post().is_empty());
        assert_eq!(request.body(), b"{\"a\":1}");
    }

    #[test]
    fn test_cookies() {
        let request = HttpRequest::builder()
            .header("cookie", "messages=abc; theme=dark")
            .build();
        assert_eq!(request.cookie("messages"), Some("abc"));
        assert_eq!(request.cookie("theme"), Some("dark"));
        assert_eq!(request.cookie("missing"), None);
    }

    #[test]
    fn test_full_path_without_query() {
        let request = HttpRequest::builder().path("/things/").build();
        assert_eq!(request.get_full_path(), "/things/");
    }

    #[test]
    fn test_from_axum() {
        let req = http::Request::builder()
            .method("POST")
            .uri("/polls/authors/?o=add&_popup=1")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(())
            .unwrap();
        let (parts, ()) = req.into_parts();
        let request = HttpRequest::from_axum(parts, b"name=Ada+Lovelace".to_vec());
        assert_eq!(request.path(), "/polls/authors/");
        assert_eq!(request.query_string(), "o=add&_popup=1");
        assert_eq!(request.post().get("name"), Some("Ada Lovelace"));
    }
}
