//! Settings loading from configuration files.
//!
//! ## Loading Order
//!
//! 1. Start with default settings.
//! 2. Load from a TOML or JSON file (overriding defaults).
//! 3. Apply environment variable overrides (highest priority).
//!
//! ## Environment Variable Mapping
//!
//! | Env Var | Setting |
//! |---|---|
//! | `SINGLEURLCRUD_DEBUG` | `debug` |
//! | `SINGLEURLCRUD_BIND_ADDRESS` | `bind_address` |
//! | `SINGLEURLCRUD_LOG_LEVEL` | `log_level` |
//! | `SINGLEURLCRUD_DATABASE_ENGINE` | `database.engine` |
//! | `SINGLEURLCRUD_DATABASE_NAME` | `database.name` |
//! | `SINGLEURLCRUD_PAGINATE_BY` | `paginate_by` |
//! | `SINGLEURLCRUD_STATIC_URL` | `static_url` |
//!
//! ## Examples
//!
//! ```rust,no_run
//! use singleurlcrud_core::settings_loader;
//!
//! let settings = settings_loader::from_toml_file_with_env("polls.toml").unwrap();
//! ```

use std::path::Path;

use crate::error::CrudError;
use crate::settings::Settings;

/// Prefix shared by every recognized environment variable.
pub const ENV_PREFIX: &str = "SINGLEURLCRUD_";

/// Loads settings from a TOML string.
///
/// Keys absent from the TOML keep their default values, including keys of
/// nested tables such as `[database]`.
///
/// # Errors
///
/// Returns an error if the TOML is malformed or cannot be deserialized.
pub fn from_toml_str(toml_str: &str) -> Result<Settings, CrudError> {
    // Merge at the JSON level so partially specified tables keep defaults.
    let toml_value: toml::Value = toml::from_str(toml_str)
        .map_err(|e| CrudError::ConfigurationError(format!("Failed to parse TOML: {e}")))?;
    merge_over_defaults(toml_to_json(toml_value), "TOML")
}

/// Loads settings from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the TOML is malformed.
pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Settings, CrudError> {
    from_toml_str(&read_config(path.as_ref(), "TOML")?)
}

/// Loads settings from a TOML file and then applies environment overrides.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the TOML is malformed.
pub fn from_toml_file_with_env(path: impl AsRef<Path>) -> Result<Settings, CrudError> {
    let mut settings = from_toml_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Loads settings from a JSON string.
///
/// # Errors
///
/// Returns an error if the JSON is malformed or cannot be deserialized.
pub fn from_json_str(json_str: &str) -> Result<Settings, CrudError> {
    let json_value: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| CrudError::ConfigurationError(format!("Failed to parse JSON: {e}")))?;
    merge_over_defaults(json_value, "JSON")
}

/// Loads settings from a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the JSON is malformed.
pub fn from_json_file(path: impl AsRef<Path>) -> Result<Settings, CrudError> {
    from_json_str(&read_config(path.as_ref(), "JSON")?)
}

/// Loads settings from just environment variables (starting from defaults).
pub fn from_env() -> Settings {
    let mut settings = Settings::default();
    apply_env_overrides(&mut settings);
    settings
}

/// Applies environment variable overrides to a settings struct.
///
/// Unparseable numeric values are ignored with a warning.
pub fn apply_env_overrides(settings: &mut Settings) {
    apply_overrides_from(settings, |key| std::env::var(format!("{ENV_PREFIX}{key}")).ok());
}

/// Applies overrides using an arbitrary lookup, keyed without the prefix.
fn apply_overrides_from(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(val) = lookup("DEBUG") {
        settings.debug = matches!(val.to_lowercase().as_str(), "true" | "1" | "yes");
    }
    if let Some(val) = lookup("BIND_ADDRESS") {
        settings.bind_address = val;
    }
    if let Some(val) = lookup("LOG_LEVEL") {
        settings.log_level = val;
    }
    if let Some(val) = lookup("DATABASE_ENGINE") {
        settings.database.engine = val;
    }
    if let Some(val) = lookup("DATABASE_NAME") {
        settings.database.name = val;
    }
    if let Some(val) = lookup("PAGINATE_BY") {
        match val.parse::<usize>() {
            Ok(n) if n > 0 => settings.paginate_by = n,
            _ => tracing::warn!(value = %val, "ignoring invalid {ENV_PREFIX}PAGINATE_BY"),
        }
    }
    if let Some(val) = lookup("STATIC_URL") {
        settings.static_url = val;
    }
}

// ============================================================
// Helpers
// ============================================================

fn read_config(path: &Path, kind: &str) -> Result<String, CrudError> {
    std::fs::read_to_string(path).map_err(|e| {
        CrudError::ConfigurationError(format!(
            "Failed to read {kind} file '{}': {e}",
            path.display()
        ))
    })
}

fn merge_over_defaults(value: serde_json::Value, kind: &str) -> Result<Settings, CrudError> {
    let default_json = serde_json::to_value(Settings::default()).map_err(|e| {
        CrudError::ConfigurationError(format!("Failed to serialize default settings: {e}"))
    })?;
    let merged = merge_json(default_json, value);
    serde_json::from_value(merged).map_err(|e| {
        CrudError::ConfigurationError(format!("Failed to deserialize settings from {kind}: {e}"))
    })
}

/// Converts a TOML value to a `serde_json::Value`.
fn toml_to_json(value: toml::Value) -> serde_json::Value {
    match value {
        toml::Value::String(s) => serde_json::Value::String(s),
        toml::Value::Integer(i) => serde_json::json!(i),
        toml::Value::Float(f) => serde_json::json!(f),
        toml::Value::Boolean(b) => serde_json::Value::Bool(b),
        toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
        toml::Value::Array(arr) => {
            serde_json::Value::Array(arr.into_iter().map(toml_to_json).collect())
        }
        toml::Value::Table(table) => serde_json::Value::Object(
            table.into_iter().map(|(k, v)| (k, toml_to_json(v))).collect(),
        ),
    }
}

/// Deep-merges two JSON values. The `override_val` takes precedence.
fn merge_json(base: serde_json::Value, override_val: serde_json::Value) -> serde_json::Value {
    match (base, override_val) {
        (serde_json::Value::Object(mut base_map), serde_json::Value::Object(override_map)) => {
            for (key, override_v) in override_map {
                let merged = match base_map.remove(&key) {
                    Some(base_v) => merge_json(base_v, override_v),
                    None => override_v,
                };
                base_map.insert(key, merged);
            }
            serde_json::Value::Object(base_map)
        }
        (_, override_val) => override_val,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    // ── TOML loading ────────────────────────────────────────────────

    #[test]
    fn test_from_toml_str_empty_is_default() {
        let settings = from_toml_str("").unwrap();
        assert_eq!(settings.paginate_by, 20);
        assert_eq!(settings.static_url, "/static/");
    }

    #[test]
    fn test_from_toml_str_partial_table_keeps_defaults() {
        let toml = r#"
            debug = false
            paginate_by = 10

            [database]
            engine = "sqlite"
        "#;
        let settings = from_toml_str(toml).unwrap();
        assert!(!settings.debug);
        assert_eq!(settings.paginate_by, 10);
        assert!(settings.database.is_sqlite());
        assert_eq!(settings.database.name, "db.sqlite3");
    }

    #[test]
    fn test_from_toml_str_extra() {
        let toml = r#"
            [extra]
            site_name = "Polls"
        "#;
        let settings = from_toml_str(toml).unwrap();
        assert_eq!(settings.extra["site_name"], serde_json::json!("Polls"));
    }

    #[test]
    fn test_from_toml_str_invalid() {
        let err = from_toml_str("paginate_by = [").unwrap_err();
        assert!(matches!(err, CrudError::ConfigurationError(_)));
    }

    #[test]
    fn test_from_toml_str_wrong_type() {
        let err = from_toml_str("paginate_by = \"many\"").unwrap_err();
        assert!(err.to_string().contains("deserialize"));
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "log_level = \"debug\"").unwrap();
        let settings = from_toml_file(file.path()).unwrap();
        assert_eq!(settings.log_level, "debug");
    }

    #[test]
    fn test_from_toml_file_missing() {
        let err = from_toml_file("/definitely/not/here.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read TOML file"));
    }

    // ── JSON loading ────────────────────────────────────────────────

    #[test]
    fn test_from_json_str() {
        let settings =
            from_json_str(r#"{"date_format": "%Y-%m-%d", "database": {"name": "x.db"}}"#).unwrap();
        assert_eq!(settings.date_format, "%Y-%m-%d");
        assert_eq!(settings.database.name, "x.db");
        assert_eq!(settings.database.engine, "memory");
    }

    // ── Environment overrides ───────────────────────────────────────

    #[test]
    fn test_overrides_from_lookup() {
        let env: HashMap<&str, &str> = [
            ("DEBUG", "0"),
            ("BIND_ADDRESS", "0.0.0.0:9000"),
            ("DATABASE_ENGINE", "sqlite"),
            ("PAGINATE_BY", "5"),
        ]
        .into_iter()
        .collect();
        let mut settings = Settings::default();
        apply_overrides_from(&mut settings, |k| env.get(k).map(ToString::to_string));
        assert!(!settings.debug);
        assert_eq!(settings.bind_address, "0.0.0.0:9000");
        assert!(settings.database.is_sqlite());
        assert_eq!(settings.paginate_by, 5);
    }

    #[test]
    fn test_invalid_paginate_by_is_ignored() {
        let mut settings = Settings::default();
        apply_overrides_from(&mut settings, |k| (k == "PAGINATE_BY").then(|| "0".to_string()));
        assert_eq!(settings.paginate_by, 20);
    }

    // ── Helpers ─────────────────────────────────────────────────────

    #[test]
    fn test_merge_json_nested() {
        let base = serde_json::json!({"a": {"b": 1, "c": 2}});
        let over = serde_json::json!({"a": {"c": 3}});
        assert_eq!(merge_json(base, over), serde_json::json!({"a": {"b": 1, "c": 3}}));
    }
}
