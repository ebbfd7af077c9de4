//! # singleurlcrud-core
//!
//! Core types, settings, and error types shared by every singleurlcrud crate.
//! This crate has no web or database dependencies.
//!
//! ## Modules
//!
//! - [`error`] - The [`CrudError`] taxonomy and result alias
//! - [`settings`] - Application settings and the global [`SETTINGS`] handle
//! - [`settings_loader`] - Loading settings from TOML, JSON, and the environment
//! - [`logging`] - Tracing-based logging integration
//! - [`utils`] - `MultiValueDict` and text helpers

pub mod error;
pub mod logging;
pub mod settings;
pub mod settings_loader;
pub mod utils;

// Re-export the most commonly used types at the crate root.
pub use error::{CrudError, CrudResult};
pub use settings::{Settings, SETTINGS};
