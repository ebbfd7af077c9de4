//! One-shot user notices carried across a redirect.
//!
//! A mutating request queues a [`Message`] on its redirect response; the
//! next list page reads it and clears it. Messages travel in a cookie
//! holding base64 (URL-safe, unpadded) JSON. The cookie is not signed:
//! it only carries display text the user could have typed anyway.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use singleurlcrud_http::{HttpRequest, HttpResponse};

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

/// A user-visible notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub level: Level,
    pub text: String,
}

impl Message {
    /// Creates an info-level message.
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: Level::Info,
            text: text.into(),
        }
    }
}

/// Reads and writes the messages cookie.
#[derive(Debug, Clone)]
pub struct MessageCookie {
    name: String,
}

impl MessageCookie {
    /// Uses the cookie called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Returns the cookie name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the messages the request carries. A missing or corrupt
    /// cookie yields none.
    pub fn read(&self, request: &HttpRequest) -> Vec<Message> {
        request
            .cookie(&self.name)
            .map(|raw| decode(raw).unwrap_or_else(|| {
                tracing::warn!(cookie = %self.name, "discarding unreadable messages cookie");
                Vec::new()
            }))
            .unwrap_or_default()
    }

    /// Queues `message` on `response`, after any still unread from the
    /// request.
    pub fn add(&self, request: &HttpRequest, response: &mut HttpResponse, message: Message) {
        let mut messages = self.read(request);
        messages.push(message);
        response.set_cookie(&self.name, &encode(&messages));
    }

    /// Returns the request's messages and expires the cookie on `response`.
    pub fn drain(&self, request: &HttpRequest, response: &mut HttpResponse) -> Vec<Message> {
        let messages = self.read(request);
        self.clear(request, response);
        messages
    }

    /// Expires the cookie on `response` if the request carried one.
    pub fn clear(&self, request: &HttpRequest, response: &mut HttpResponse) {
        if request.cookie(&self.name).is_some() {
            response.delete_cookie(&self.name);
        }
    }
}

/// Encodes messages as a cookie value.
pub fn encode(messages: &[Message]) -> String {
    let json = serde_json::to_vec(messages).unwrap_or_default();
    URL_SAFE_NO_PAD.encode(json)
}

/// Decodes a cookie value, `None` if it is not valid.
pub fn decode(raw: &str) -> Option<Vec<Message>> {
    let bytes = URL_SAFE_NO_PAD.decode(raw.trim_matches('"')).ok()?;
    serde_json::from_slice(&bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with_cookie(value: &str) -> HttpRequest {
        HttpRequest::builder()
            .header("cookie", &format!("messages={value}"))
            .build()
    }

    #[test]
    fn test_encode_decode() {
        let messages = vec![Message::info("Question details updated")];
        let raw = encode(&messages);
        assert!(raw.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_eq!(decode(&raw), Some(messages));
    }

    #[test]
    fn test_corrupt_cookie_reads_empty() {
        let cookie = MessageCookie::new("messages");
        assert!(cookie.read(&request_with_cookie("%%%")).is_empty());
    }

    #[test]
    fn test_add_appends_unread() {
        let cookie = MessageCookie::new("messages");
        let earlier = encode(&[Message::info("first")]);
        let request = request_with_cookie(&earlier);
        let mut response = HttpResponse::ok("");
        cookie.add(&request, &mut response, Message::info("second"));

        let header = response
            .headers()
            .get(http::header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap();
        let value = header
            .split(';')
            .next()
            .and_then(|pair| pair.strip_prefix("messages="))
            .unwrap();
        let texts: Vec<String> = decode(value).unwrap().into_iter().map(|m| m.text).collect();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[test]
    fn test_drain_expires_cookie() {
        let cookie = MessageCookie::new("messages");
        let request = request_with_cookie(&encode(&[Message::info("Author Ann deleted")]));
        let mut response = HttpResponse::ok("");
        let drained = cookie.drain(&request, &mut response);
        assert_eq!(drained.len(), 1);
        let header = response.headers().get(http::header::SET_COOKIE).unwrap();
        assert!(header.to_str().unwrap().contains("Max-Age=0"));
    }

    #[test]
    fn test_drain_without_cookie_leaves_response() {
        let cookie = MessageCookie::new("messages");
        let mut response = HttpResponse::ok("");
        assert!(cookie
            .drain(&HttpRequest::builder().build(), &mut response)
            .is_empty());
        assert!(response.headers().get(http::header::SET_COOKIE).is_none());
    }
}
