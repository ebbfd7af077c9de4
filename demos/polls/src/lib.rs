//! # polls
//!
//! A small polls site built on singleurlcrud. Authors write questions;
//! each question carries its answer choices, edited inline on the
//! question form. Each of the two entity types is managed by one
//! controller at a single URL.

pub mod models;
pub mod settings;
pub mod testdata;
pub mod urls;
pub mod views;

pub use models::{register_models, Author, Choice, Question};
pub use urls::polls_app;
