//! HTTP test client.
//!
//! [`TestClient`] sends simulated requests through an axum router and keeps
//! cookies between them, so a message queued on a redirect shows up on the
//! next page exactly as it would in a browser.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use singleurlcrud_test::client::TestClient;
//! use singleurlcrud_views::CrudApp;
//!
//! async fn example(app: CrudApp) {
//!     let mut client = TestClient::from_app(app);
//!     let response = client.post("/polls/authors/?o=delete&item=1", &[]).await;
//!     assert_eq!(response.status_code(), 302);
//!     let list = client.follow(&response).await;
//!     assert_eq!(list.messages(), Vec::<String>::new());
//! }
//! ```

use std::collections::HashMap;

use axum::Router;
use bytes::Bytes;
use http::{HeaderMap, Method, Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use singleurlcrud_core::{CrudError, CrudResult};
use singleurlcrud_http::querydict::encode;
use singleurlcrud_views::messages::decode;
use singleurlcrud_views::CrudApp;

/// The messages cookie name the client inspects by default.
const MESSAGES_COOKIE: &str = "messages";

/// A test client for an axum application.
pub struct TestClient {
    app: Router,
    cookies: HashMap<String, String>,
}

impl TestClient {
    /// Wraps an axum router.
    pub fn new(app: Router) -> Self {
        Self {
            app,
            cookies: HashMap::new(),
        }
    }

    /// Wraps a [`CrudApp`].
    pub fn from_app(app: CrudApp) -> Self {
        Self::new(app.into_axum_router())
    }

    /// Sends a GET request to `path`, which may carry a query string.
    pub async fn get(&mut self, path: &str) -> TestResponse {
        self.request(Method::GET, path, None).await
    }

    /// Sends a POST request with a form body built from `data`, in order.
    pub async fn post(&mut self, path: &str, data: &[(&str, &str)]) -> TestResponse {
        self.request(Method::POST, path, Some(encode_form_data(data).into_bytes()))
            .await
    }

    /// Follows the redirect in `response` with a GET.
    ///
    /// # Panics
    ///
    /// Panics if `response` has no `Location` header.
    pub async fn follow(&mut self, response: &TestResponse) -> TestResponse {
        let location = response
            .location()
            .expect("response should be a redirect")
            .to_string();
        self.get(&location).await
    }

    /// Sets a cookie sent with subsequent requests.
    pub fn set_cookie(&mut self, name: &str, value: &str) {
        self.cookies.insert(name.to_string(), value.to_string());
    }

    /// Returns a cookie from the jar.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn clear_cookies(&mut self) {
        self.cookies.clear();
    }

    fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        let mut pairs: Vec<String> = self
            .cookies
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        pairs.sort();
        Some(pairs.join("; "))
    }

    async fn request(&mut self, method: Method, path: &str, body: Option<Vec<u8>>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(path);
        if body.is_some() {
            builder = builder.header("content-type", "application/x-www-form-urlencoded");
        }
        if let Some(cookie) = self.cookie_header() {
            builder = builder.header("cookie", cookie);
        }
        let req = builder
            .body(axum::body::Body::from(body.unwrap_or_default()))
            .expect("request builder should not fail");
        self.send(req).await
    }

    async fn send(&mut self, req: Request<axum::body::Body>) -> TestResponse {
        let response = self
            .app
            .clone()
            .oneshot(req)
            .await
            .expect("router should not error");

        let status = response.status();
        let headers = response.headers().clone();

        let mut set_cookies = HashMap::new();
        for value in headers.get_all(http::header::SET_COOKIE) {
            let Ok(raw) = value.to_str() else { continue };
            let Some((name, val)) = raw.split(';').next().and_then(|p| p.split_once('=')) else {
                continue;
            };
            let (name, val) = (name.trim().to_string(), val.trim().to_string());
            if val.is_empty() || raw.contains("Max-Age=0") {
                self.cookies.remove(&name);
            } else {
                self.cookies.insert(name.clone(), val.clone());
            }
            set_cookies.insert(name, val);
        }

        let body = response
            .into_body()
            .collect()
            .await
            .map_or_else(|_| Bytes::new(), http_body_util::Collected::to_bytes);

        TestResponse {
            status,
            headers,
            body: body.to_vec(),
            cookies: set_cookies,
        }
    }
}

fn encode_form_data(data: &[(&str, &str)]) -> String {
    data.iter()
        .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// The response to a test request.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    /// Cookies the response set; an empty value means the cookie was
    /// expired.
    pub cookies: HashMap<String, String>,
}

impl TestResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    /// Deserializes the body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> CrudResult<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The redirect target, if any.
    pub fn location(&self) -> Option<&str> {
        self.header("location")
    }

    pub fn contains(&self, text: &str) -> bool {
        self.text().contains(text)
    }

    /// The template name of a page rendered by the JSON renderer.
    pub fn template(&self) -> CrudResult<String> {
        let page: serde_json::Value = self.json()?;
        page["template"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| CrudError::SerializationError("no template in response".to_string()))
    }

    /// The context of a page rendered by the JSON renderer.
    pub fn context(&self) -> CrudResult<serde_json::Value> {
        let mut page: serde_json::Value = self.json()?;
        match page.get_mut("context") {
            Some(ctx) => Ok(ctx.take()),
            None => Err(CrudError::SerializationError(
                "no context in response".to_string(),
            )),
        }
    }

    /// Texts of the messages this response queued.
    pub fn messages(&self) -> Vec<String> {
        self.cookies
            .get(MESSAGES_COOKIE)
            .and_then(|raw| decode(raw))
            .unwrap_or_default()
            .into_iter()
            .map(|m| m.text)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use singleurlcrud_core::Settings;
    use singleurlcrud_http::{HttpRequest, HttpResponse, HttpResponseRedirect};
    use singleurlcrud_views::messages::{Message, MessageCookie};
    use singleurlcrud_views::{BoxFuture, ViewFunction};

    use super::*;

    fn queue_then_redirect() -> ViewFunction {
        Arc::new(|req: HttpRequest| -> BoxFuture {
            Box::pin(async move {
                let mut response = HttpResponseRedirect::new("/read/");
                MessageCookie::new("messages").add(&req, &mut response, Message::info("Saved"));
                response
            })
        })
    }

    fn read_and_clear() -> ViewFunction {
        Arc::new(|req: HttpRequest| -> BoxFuture {
            Box::pin(async move {
                let cookie = MessageCookie::new("messages");
                let mut response = HttpResponse::ok("");
                let texts: Vec<String> = cookie
                    .drain(&req, &mut response)
                    .into_iter()
                    .map(|m| m.text)
                    .collect();
                response
                    .headers_mut()
                    .insert("x-messages", texts.join("|").parse().unwrap());
                response
            })
        })
    }

    fn echo_body() -> ViewFunction {
        Arc::new(|req: HttpRequest| -> BoxFuture {
            Box::pin(async move { HttpResponse::ok(String::from_utf8_lossy(req.body()).into_owned()) })
        })
    }

    fn client() -> TestClient {
        TestClient::from_app(
            CrudApp::new(Settings::default())
                .route("/write/", queue_then_redirect())
                .route("/read/", read_and_clear())
                .route("/echo/", echo_body()),
        )
    }

    #[tokio::test]
    async fn test_cookie_survives_redirect_and_is_expired() {
        let mut client = client();
        let response = client.post("/write/", &[]).await;
        assert_eq!(response.status_code(), 302);
        assert_eq!(response.messages(), vec!["Saved"]);
        assert!(client.cookie("messages").is_some());

        let page = client.follow(&response).await;
        assert_eq!(page.header("x-messages"), Some("Saved"));
        assert!(client.cookie("messages").is_none());

        let again = client.get("/read/").await;
        assert_eq!(again.header("x-messages"), Some(""));
    }

    #[tokio::test]
    async fn test_post_encodes_in_order() {
        let mut client = client();
        let response = client
            .post("/echo/", &[("ids", "1,2"), ("handler", "delete selected")])
            .await;
        assert_eq!(response.text(), "ids=1%2C2&handler=delete%20selected");
    }

    #[tokio::test]
    async fn test_unknown_path() {
        let mut client = client();
        assert_eq!(client.get("/missing/").await.status_code(), 404);
    }

    #[tokio::test]
    async fn test_clear_cookies() {
        let mut client = client();
        client.set_cookie("messages", "x");
        client.clear_cookies();
        assert!(client.cookie("messages").is_none());
    }
}
