//! Polls settings.
//!
//! Read from `polls.toml` when it exists, otherwise from the defaults; the
//! `SINGLEURLCRUD_*` environment variables override either.

use std::path::Path;

use singleurlcrud_core::settings_loader::{from_env, from_toml_file_with_env};
use singleurlcrud_core::{CrudResult, Settings};

/// The settings file looked up in the working directory.
pub const DEFAULT_SETTINGS_FILE: &str = "polls.toml";

/// Loads the settings from `path`, or from the environment alone when the
/// file is missing.
pub fn load_settings(path: &Path) -> CrudResult<Settings> {
    if path.exists() {
        tracing::debug!(path = %path.display(), "loading settings file");
        from_toml_file_with_env(path)
    } else {
        Ok(from_env())
    }
}
