//! # singleurlcrud-views
//!
//! The view layer: the single-URL [`CrudView`] controller and what it
//! needs to answer requests.
//!
//! ## Modules
//!
//! - [`view`] - The [`View`] trait and mountable [`ViewFunction`]s
//! - [`crud`] - [`CrudView`], its configuration, actions, and permissions
//! - [`pagination`] - List pagination with `page=all` and `page=last`
//! - [`messages`] - One-shot notices carried in a cookie
//! - [`template`] - Tera rendering and the built-in templates
//! - [`server`] - [`CrudApp`], mounting views on an axum router

pub mod crud;
pub mod messages;
pub mod pagination;
pub mod server;
pub mod template;
pub mod view;

pub use crud::{CrudConfig, CrudConfigBuilder, CrudView, Operation};
pub use messages::{Message, MessageCookie};
pub use server::{CrudApp, STATIC_DIR};
pub use template::{JsonRenderer, TemplateRenderer, TeraRenderer};
pub use view::{BoxFuture, View, ViewFunction};
