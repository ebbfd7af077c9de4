//! Application settings.
//!
//! This module provides the [`Settings`] struct, which holds all
//! configuration, and [`LazySettings`], a globally-accessible,
//! lazily-initialized settings instance.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::{CrudError, CrudResult};

/// Storage backend configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// The storage engine: `"memory"` or `"sqlite"`.
    pub engine: String,
    /// The database file path for `SQLite`; ignored by the memory engine.
    pub name: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            engine: "memory".to_string(),
            name: "db.sqlite3".to_string(),
        }
    }
}

impl DatabaseSettings {
    /// Returns `true` when the configured engine is `SQLite`.
    pub fn is_sqlite(&self) -> bool {
        matches!(self.engine.as_str(), "sqlite" | "sqlite3")
    }
}

/// All application settings.
///
/// Settings have sensible defaults; a TOML file or environment variables
/// only need to name what differs.
///
/// # Examples
///
/// ```
/// use singleurlcrud_core::settings::Settings;
///
/// let settings = Settings::default();
/// assert!(settings.debug);
/// assert_eq!(settings.paginate_by, 20);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    // ── Core ─────────────────────────────────────────────────────────

    /// Whether debug mode is enabled.
    pub debug: bool,
    /// Address the development server binds to.
    pub bind_address: String,

    // ── Database ─────────────────────────────────────────────────────

    /// The storage backend.
    pub database: DatabaseSettings,

    // ── Views ────────────────────────────────────────────────────────

    /// Default number of rows per list page.
    pub paginate_by: usize,
    /// `chrono` format string for date values in list cells.
    pub date_format: String,
    /// `chrono` format string for datetime values in list cells.
    pub datetime_format: String,
    /// URL prefix for static assets referenced by view media.
    pub static_url: String,
    /// Name of the cookie carrying one-shot user messages.
    pub messages_cookie_name: String,

    // ── Templates ────────────────────────────────────────────────────

    /// Directories searched for template overrides before the built-in
    /// templates.
    pub template_dirs: Vec<PathBuf>,

    // ── Logging ──────────────────────────────────────────────────────

    /// The log filter (e.g. "info", "debug", "singleurlcrud_views=trace").
    pub log_level: String,

    // ── Escape hatch ─────────────────────────────────────────────────

    /// Custom settings that don't fit into the above categories.
    pub extra: HashMap<String, serde_json::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            // Core
            debug: true,
            bind_address: "127.0.0.1:8000".to_string(),

            // Database
            database: DatabaseSettings::default(),

            // Views
            paginate_by: 20,
            date_format: "%b %-d, %Y".to_string(),
            datetime_format: "%b %-d, %Y, %-I:%M %p".to_string(),
            static_url: "/static/".to_string(),
            messages_cookie_name: "messages".to_string(),

            // Templates
            template_dirs: Vec::new(),

            // Logging
            log_level: "info".to_string(),

            // Extra
            extra: HashMap::new(),
        }
    }
}

/// A lazily-initialized, globally-accessible settings container.
///
/// Call [`configure`](LazySettings::configure) once at startup. Reading
/// before configuring yields the defaults, which then stick.
pub struct LazySettings {
    inner: OnceLock<Settings>,
}

impl Default for LazySettings {
    fn default() -> Self {
        Self::new()
    }
}

impl LazySettings {
    /// Creates a new, unconfigured `LazySettings`.
    pub const fn new() -> Self {
        Self {
            inner: OnceLock::new(),
        }
    }

    /// Configures the global settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if settings were already configured or
    /// already read.
    pub fn configure(&self, settings: Settings) -> CrudResult<()> {
        self.inner.set(settings).map_err(|_| {
            CrudError::ConfigurationError("Settings have already been configured".to_string())
        })
    }

    /// Returns the configured settings, or the defaults if nothing was
    /// configured.
    pub fn get(&self) -> &Settings {
        self.inner.get_or_init(Settings::default)
    }

    /// Returns `true` if settings have been configured or read.
    pub fn is_configured(&self) -> bool {
        self.inner.get().is_some()
    }
}

/// The global settings instance.
pub static SETTINGS: LazySettings = LazySettings::new();
