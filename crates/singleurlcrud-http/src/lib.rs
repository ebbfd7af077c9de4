//! # singleurlcrud-http
//!
//! HTTP layer for singleurlcrud. Provides the request and response types the
//! CRUD controller works with, independent of axum, plus conversions to and
//! from axum at the server boundary.
//!
//! ## Modules
//!
//! - [`querydict`] - Ordered, immutable-by-default query and form parameters
//! - [`request`] - [`HttpRequest`] and its builder
//! - [`response`] - [`HttpResponse`] and redirect helpers
//! - [`url`] - Canonical URL derivation and query-string helpers

pub mod querydict;
pub mod request;
pub mod response;
pub mod url;

pub use querydict::QueryDict;
pub use request::{HttpRequest, HttpRequestBuilder};
pub use response::{HttpResponse, HttpResponseRedirect, JsonResponse};
