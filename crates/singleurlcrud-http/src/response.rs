//! HTTP response types.
//!
//! [`HttpResponse`] plus the convenience constructors the controller needs:
//! [`JsonResponse`] and [`HttpResponseRedirect`].

use axum::response::IntoResponse;
use http::{HeaderMap, HeaderValue, StatusCode};

use singleurlcrud_core::CrudError;

/// An HTTP response.
///
/// Converts to an axum response via [`IntoResponse`].
///
/// # Examples
///
/// ```
/// use singleurlcrud_http::HttpResponse;
///
/// let response = HttpResponse::ok("<p>hi</p>");
/// assert_eq!(response.status(), http::StatusCode::OK);
/// assert_eq!(response.text(), "<p>hi</p>");
/// ```
#[derive(Debug, Clone)]
pub struct HttpResponse {
    status: StatusCode,
    headers: HeaderMap,
    content: String,
    content_type: String,
}

impl HttpResponse {
    /// Creates a new `text/html` response with the given status and body.
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            content: body.into(),
            content_type: "text/html".to_string(),
        }
    }

    /// Creates a 200 OK response with the given body.
    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, body)
    }

    /// Creates a 404 Not Found response.
    pub fn not_found(body: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, body)
    }

    /// Creates a 500 Internal Server Error response.
    pub fn server_error(body: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, body)
    }

    /// Creates a 405 Method Not Allowed response with the list of permitted methods.
    pub fn not_allowed(permitted_methods: &[&str]) -> Self {
        let allowed = permitted_methods.join(", ");
        let mut response = Self::new(
            StatusCode::METHOD_NOT_ALLOWED,
            format!("Method Not Allowed. Permitted: {allowed}"),
        );
        if let Ok(value) = HeaderValue::from_str(&allowed) {
            response.headers.insert(http::header::ALLOW, value);
        }
        response
    }

    /// Builds the error page for a [`CrudError`].
    ///
    /// The body only carries the status reason so that a `NotFound` never
    /// reveals which check produced it.
    pub fn from_error(err: &CrudError) -> Self {
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let reason = status.canonical_reason().unwrap_or("Error");
        Self::new(status, format!("<h1>{reason}</h1>"))
    }

    /// Returns the status code.
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Sets the status code.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Returns the custom headers.
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a mutable reference to the custom headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Returns the body text.
    pub fn text(&self) -> &str {
        &self.content
    }

    /// Returns the content type without charset.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Sets the content type.
    pub fn set_content_type(&mut self, content_type: impl Into<String>) {
        self.content_type = content_type.into();
    }

    /// Returns the `Location` header, if this is a redirect.
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(http::header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }

    /// Adds a `Set-Cookie` header scoped to `/`.
    ///
    /// A cookie that is not a valid header value is dropped and logged.
    pub fn set_cookie(&mut self, name: &str, value: &str) {
        self.append_cookie(name, format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax"));
    }

    /// Adds a `Set-Cookie` header that expires the named cookie.
    pub fn delete_cookie(&mut self, name: &str) {
        self.append_cookie(
            name,
            format!("{name}=; Path=/; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT"),
        );
    }

    fn append_cookie(&mut self, name: &str, cookie: String) {
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                self.headers.append(http::header::SET_COOKIE, value);
            }
            Err(e) => tracing::warn!(cookie = name, error = %e, "dropping invalid Set-Cookie header"),
        }
    }

    fn full_content_type(&self) -> String {
        if self.content_type.starts_with("text/") || self.content_type.contains("json") {
            format!("{}; charset=utf-8", self.content_type)
        } else {
            self.content_type.clone()
        }
    }
}

impl IntoResponse for HttpResponse {
    fn into_response(self) -> axum::response::Response {
        let content_type = self.full_content_type();
        let mut response = axum::response::Response::new(axum::body::Body::from(self.content));
        *response.status_mut() = self.status;
        if let Ok(ct) = HeaderValue::from_str(&content_type) {
            response.headers_mut().insert(http::header::CONTENT_TYPE, ct);
        }
        for (key, value) in &self.headers {
            response.headers_mut().append(key, value.clone());
        }
        response
    }
}

/// A JSON response.
pub struct JsonResponse;

impl JsonResponse {
    /// Creates a 200 JSON response from a serializable value.
    ///
    /// Serialization failures produce a 500 response.
    pub fn new<T: serde::Serialize>(data: &T) -> HttpResponse {
        match serde_json::to_string(data) {
            Ok(json) => {
                let mut response = HttpResponse::ok(json);
                response.set_content_type("application/json");
                response
            }
            Err(e) => {
                tracing::error!(error = %e, "JSON serialization failed");
                HttpResponse::server_error(format!("JSON serialization error: {e}"))
            }
        }
    }
}

/// An HTTP redirect response (302 Found).
pub struct HttpResponseRedirect;

impl HttpResponseRedirect {
    /// Creates a 302 Found redirect to the given URL.
    pub fn new(url: &str) -> HttpResponse {
        let mut response = HttpResponse::new(StatusCode::FOUND, "");
        match HeaderValue::from_str(url) {
            Ok(value) => {
                response.headers.insert(http::header::LOCATION, value);
            }
            Err(e) => tracing::warn!(%url, error = %e, "redirect target is not a valid header value"),
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;

    use super::*;

    #[test]
    fn test_redirect() {
        let response = HttpResponseRedirect::new("/things/?page=2");
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.location(), Some("/things/?page=2"));
    }

    #[test]
    fn test_from_error_hides_detail() {
        let response = HttpResponse::from_error(&CrudError::NotFound("permission denied".into()));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.text(), "<h1>Not Found</h1>");
        assert!(!response.text().contains("permission"));
    }

    #[test]
    fn test_not_allowed_sets_allow() {
        let response = HttpResponse::not_allowed(&["GET", "POST"]);
        assert_eq!(response.headers().get("allow").unwrap(), "GET, POST");
    }

    #[test]
    fn test_json_response() {
        let response = JsonResponse::new(&serde_json::json!({"ok": true}));
        assert_eq!(response.content_type(), "application/json");
        assert_eq!(response.text(), r#"{"ok":true}"#);
    }

    #[test]
    fn test_cookies_append() {
        let mut response = HttpResponse::ok("");
        response.set_cookie("messages", "abc");
        response.delete_cookie("other");
        assert_eq!(response.headers().get_all("set-cookie").iter().count(), 2);
    }

    #[test]
    fn test_invalid_header_values_are_dropped() {
        let mut response = HttpResponse::ok("");
        response.set_cookie("messages", "line\r\nX-Injected: 1");
        response.set_cookie("kept", "abc");
        let cookies: Vec<_> = response.headers().get_all("set-cookie").iter().collect();
        assert_eq!(cookies.len(), 1);
        assert!(cookies[0].to_str().unwrap().starts_with("kept=abc"));

        let redirect = HttpResponseRedirect::new("/x/\n");
        assert_eq!(redirect.status(), StatusCode::FOUND);
        assert_eq!(redirect.location(), None);
    }

    #[tokio::test]
    async fn test_into_axum_response() {
        let mut response = HttpResponseRedirect::new("/x/");
        response.set_cookie("messages", "abc");
        let axum_response = response.into_response();
        assert_eq!(axum_response.status(), StatusCode::FOUND);
        assert_eq!(axum_response.headers().get("location").unwrap(), "/x/");
        assert_eq!(
            axum_response.headers().get("content-type").unwrap(),
            "text/html; charset=utf-8"
        );
        let body = axum_response.into_body().collect().await.unwrap().to_bytes();
        assert!(body.is_empty());
    }
}
