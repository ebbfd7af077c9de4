//! # singleurlcrud-db-backends
//!
//! Database-backed [`EntityStore`](singleurlcrud_db::EntityStore)
//! implementations. The in-memory store lives in `singleurlcrud-db`; this
//! crate adds stores that persist to a real database engine.
//!
//! Supported backends:
//! - `SQLite` (feature `sqlite`, on by default)

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

use std::sync::Arc;

use singleurlcrud_core::settings::DatabaseSettings;
use singleurlcrud_core::{CrudError, CrudResult};
use singleurlcrud_db::{EntityStore, MemoryStore};

/// Builds the store described by the database settings.
///
/// `memory` always works; `sqlite`/`sqlite3` needs the `sqlite` feature.
///
/// # Errors
///
/// Returns `ConfigurationError` for an unknown or disabled engine, or the
/// backend's error if the database cannot be opened.
pub fn connect(settings: &DatabaseSettings) -> CrudResult<Arc<dyn EntityStore>> {
    if settings.engine == "memory" {
        tracing::info!("using in-memory store");
        return Ok(Arc::new(MemoryStore::new()));
    }
    #[cfg(feature = "sqlite")]
    if settings.is_sqlite() {
        tracing::info!(name = %settings.name, "using SQLite store");
        return Ok(Arc::new(SqliteStore::open(&settings.name)?));
    }
    Err(CrudError::ConfigurationError(format!(
        "unsupported database engine '{}'",
        settings.engine
    )))
}
