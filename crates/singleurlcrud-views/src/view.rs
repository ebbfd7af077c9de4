//! The [`View`] trait: method dispatch for request handlers.
//!
//! A view answers one URL. [`View::dispatch`] routes a request to the
//! handler for its HTTP method, and [`View::as_view`] turns a view into a
//! [`ViewFunction`] that the server can mount.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use singleurlcrud_http::{HttpRequest, HttpResponse};

/// A boxed future resolving to a response.
pub type BoxFuture = Pin<Box<dyn Future<Output = HttpResponse> + Send>>;

/// A mountable request handler.
pub type ViewFunction = Arc<dyn Fn(HttpRequest) -> BoxFuture + Send + Sync>;

/// Method dispatch for a view.
///
/// Handlers return 405 Method Not Allowed unless overridden.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use singleurlcrud_http::{HttpRequest, HttpResponse};
/// use singleurlcrud_views::View;
///
/// struct Hello;
///
/// #[async_trait]
/// impl View for Hello {
///     async fn get(&self, _request: HttpRequest) -> HttpResponse {
///         HttpResponse::ok("hello")
///     }
/// }
/// ```
#[async_trait]
pub trait View: Send + Sync {
    /// Returns the HTTP methods this view answers.
    fn allowed_methods(&self) -> Vec<http::Method> {
        vec![http::Method::GET, http::Method::POST, http::Method::HEAD]
    }

    /// Dispatches the request to the handler for its method.
    async fn dispatch(&self, request: HttpRequest) -> HttpResponse {
        match *request.method() {
            http::Method::GET => self.get(request).await,
            http::Method::POST => self.post(request).await,
            http::Method::HEAD => self.head(request).await,
            _ => self.http_method_not_allowed(request).await,
        }
    }

    /// Handles GET requests.
    async fn get(&self, request: HttpRequest) -> HttpResponse {
        self.http_method_not_allowed(request).await
    }

    /// Handles POST requests.
    async fn post(&self, request: HttpRequest) -> HttpResponse {
        self.http_method_not_allowed(request).await
    }

    /// Handles HEAD requests by running `get` and dropping the body.
    async fn head(&self, request: HttpRequest) -> HttpResponse {
        let response = self.get(request).await;
        let mut head = HttpResponse::new(response.status(), "");
        head.set_content_type(response.content_type().to_string());
        *head.headers_mut() = response.headers().clone();
        head
    }

    /// Returns 405 with an `Allow` header.
    async fn http_method_not_allowed(&self, request: HttpRequest) -> HttpResponse {
        tracing::debug!(method = %request.method(), path = request.path(), "method not allowed");
        let methods = self.allowed_methods();
        let names: Vec<&str> = methods.iter().map(http::Method::as_str).collect();
        HttpResponse::not_allowed(&names)
    }

    /// Wraps the view in a [`ViewFunction`].
    #[allow(clippy::wrong_self_convention)]
    fn as_view(self) -> ViewFunction
    where
        Self: Sized + 'static,
    {
        let view = Arc::new(self);
        Arc::new(move |request: HttpRequest| -> BoxFuture {
            let view = Arc::clone(&view);
            Box::pin(async move { view.dispatch(request).await })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct GetOnly;

    #[async_trait]
    impl View for GetOnly {
        async fn get(&self, _request: HttpRequest) -> HttpResponse {
            HttpResponse::ok("listing")
        }
    }

    #[tokio::test]
    async fn test_dispatch_get() {
        let response = GetOnly.dispatch(HttpRequest::builder().build()).await;
        assert_eq!(response.text(), "listing");
    }

    #[tokio::test]
    async fn test_post_not_allowed() {
        let request = HttpRequest::builder().method(http::Method::POST).build();
        let response = GetOnly.dispatch(request).await;
        assert_eq!(response.status(), http::StatusCode::METHOD_NOT_ALLOWED);
        assert!(response.headers().contains_key(http::header::ALLOW));
    }

    #[tokio::test]
    async fn test_head_drops_body() {
        let request = HttpRequest::builder().method(http::Method::HEAD).build();
        let response = GetOnly.dispatch(request).await;
        assert_eq!(response.status(), http::StatusCode::OK);
        assert_eq!(response.text(), "");
    }

    #[tokio::test]
    async fn test_as_view() {
        let view = GetOnly.as_view();
        let response = view(HttpRequest::builder().build()).await;
        assert_eq!(response.text(), "listing");
    }
}
