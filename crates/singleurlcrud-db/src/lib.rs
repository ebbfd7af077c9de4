//! # singleurlcrud-db
//!
//! The persistence seam of singleurlcrud. Entities describe themselves with
//! an [`EntityMeta`] schema and convert to and from backend-neutral
//! [`Record`]s; an [`EntityStore`] persists records.
//!
//! ## Modules
//!
//! - [`value`] - The [`Value`] enum shared by schemas, records, and forms
//! - [`fields`] - Field definitions ([`FieldDef`], [`FieldType`])
//! - [`model`] - [`Entity`], [`EntityMeta`], [`Record`], and accessors
//! - [`store`] - The [`EntityStore`] trait and typed helpers
//! - [`memory`] - [`MemoryStore`], a transactional in-process store
//! - [`transactions`] - [`Transaction`](transactions::Transaction),
//!   [`atomic`](transactions::atomic), and the gate that serializes writers

pub mod fields;
pub mod memory;
pub mod model;
pub mod store;
pub mod transactions;
pub mod value;

pub use fields::{FieldDef, FieldType, OnDelete};
pub use memory::MemoryStore;
pub use model::{Accessor, Entity, EntityMeta, Record};
pub use store::EntityStore;
pub use transactions::{Transaction, Tx};
pub use value::{Value, ValueKind};
