//! # singleurlcrud-test
//!
//! Testing utilities for singleurlcrud applications.
//!
//! ## Modules
//!
//! - [`client`] - [`TestClient`], which sends requests through an axum
//!   router and keeps cookies between them
//! - [`request_factory`] - [`RequestFactory`], for calling views directly

pub mod client;
pub mod request_factory;

pub use client::{TestClient, TestResponse};
pub use request_factory::RequestFactory;
