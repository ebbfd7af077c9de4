//! # singleurlcrud
//!
//! Single-URL CRUD controllers: one URL per resource, with the `o` query
//! parameter selecting list, add, edit, delete, bulk delete or a custom
//! action.
//!
//! This is the meta-crate that re-exports the sub-crates. Depend on it for
//! everything, or on individual crates for finer-grained control.

/// Errors, settings, logging, and text utilities.
pub use singleurlcrud_core as core;

/// Request, response, query dictionaries, and canonical URLs.
pub use singleurlcrud_http as http;

/// Entities, schemas, records, and the `EntityStore` seam.
pub use singleurlcrud_db as db;

/// Database-backed stores.
pub use singleurlcrud_db_backends as db_backends;

/// Model forms, inline formsets, and validators.
pub use singleurlcrud_forms as forms;

/// The CRUD controller, templates, messages, and the server.
pub use singleurlcrud_views as views;

/// Test client and request factory.
#[cfg(feature = "testing")]
pub use singleurlcrud_test as test;

// Third-party re-exports
pub use async_trait::async_trait;
pub use axum;
pub use chrono;
pub use serde;
pub use serde_json;
pub use tokio;
pub use tracing;

/// The names most applications need.
pub mod prelude {
    pub use singleurlcrud_core::{CrudError, CrudResult, Settings};
    pub use singleurlcrud_db::{
        Accessor, Entity, EntityMeta, EntityStore, FieldDef, FieldType, MemoryStore, OnDelete,
        Record, Value,
    };
    pub use singleurlcrud_forms::{FormValidator, InlineFormSetConfig, ModelFormFields};
    pub use singleurlcrud_http::{HttpRequest, HttpResponse};
    pub use singleurlcrud_views::crud::{
        Action, ActionDescriptor, ActionTarget, Breadcrumb, FnAction, ItemActionDescriptor,
        PermissionChecker, PermissionFn,
    };
    pub use singleurlcrud_views::{
        CrudApp, CrudConfig, CrudView, JsonRenderer, Operation, TeraRenderer, View,
    };
}
