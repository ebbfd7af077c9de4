//! Entities and their schemas.
//!
//! An [`Entity`] is a Rust type the CRUD controller can manage. Each entity
//! type owns a static [`EntityMeta`] describing its table, human names,
//! ordering, and fields, and converts itself to and from a [`Record`], the
//! backend-neutral row stores work with.

use std::collections::HashMap;

use singleurlcrud_core::{CrudError, CrudResult};

use crate::fields::FieldDef;
use crate::value::Value;

/// Schema and naming metadata for an entity type.
///
/// The primary key is always an implicit integer `id` and is not listed in
/// `fields`.
#[derive(Debug, Clone)]
pub struct EntityMeta {
    /// The application label (e.g. "polls").
    pub app_label: &'static str,
    /// The model name in lowercase (e.g. "question").
    pub model_name: &'static str,
    /// The storage table name.
    pub db_table: String,
    /// Human-readable singular name.
    pub verbose_name: String,
    /// Human-readable plural name.
    pub verbose_name_plural: String,
    /// Default ordering: field names, `-` prefix for descending.
    pub ordering: Vec<String>,
    /// Field definitions, in declaration order.
    pub fields: Vec<FieldDef>,
    /// Field whose value is the record's display title, used where only a
    /// record (not a typed entity) is at hand, e.g. foreign-key cells.
    pub title_field: Option<&'static str>,
}

impl EntityMeta {
    /// Creates metadata with the table `{app_label}_{model_name}`, verbose
    /// name equal to the model name, and an `s`-suffixed plural.
    pub fn new(app_label: &'static str, model_name: &'static str, fields: Vec<FieldDef>) -> Self {
        Self {
            app_label,
            model_name,
            db_table: format!("{app_label}_{model_name}"),
            verbose_name: model_name.to_string(),
            verbose_name_plural: format!("{model_name}s"),
            ordering: Vec::new(),
            fields,
            title_field: None,
        }
    }

    /// Sets both verbose names.
    #[must_use]
    pub fn verbose_names(mut self, singular: impl Into<String>, plural: impl Into<String>) -> Self {
        self.verbose_name = singular.into();
        self.verbose_name_plural = plural.into();
        self
    }

    /// Sets the default ordering.
    #[must_use]
    pub fn ordering(mut self, ordering: &[&str]) -> Self {
        self.ordering = ordering.iter().map(ToString::to_string).collect();
        self
    }

    /// Sets the title field.
    #[must_use]
    pub const fn title_field(mut self, field: &'static str) -> Self {
        self.title_field = Some(field);
        self
    }

    /// Looks up a field by name.
    pub fn get_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Returns the display title of a record of this type: the title field
    /// if set, else `"{verbose_name} object ({pk})"`.
    pub fn record_title(&self, record: &Record) -> String {
        match self.title_field {
            Some(field) => record.get(field).to_string(),
            None => format!(
                "{} object ({})",
                self.verbose_name,
                record.pk.map_or_else(|| "None".to_string(), |pk| pk.to_string())
            ),
        }
    }
}

/// A backend-neutral row: optional primary key plus field values keyed by
/// field name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    /// The primary key, `None` before the first insert.
    pub pk: Option<i64>,
    /// Field values keyed by field name (not column name).
    pub values: HashMap<String, Value>,
}

impl Record {
    /// Creates a record from field pairs.
    pub fn new(pk: Option<i64>, values: impl IntoIterator<Item = (&'static str, Value)>) -> Self {
        Self {
            pk,
            values: values
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }

    /// Returns the value of a field, `Null` when absent.
    pub fn get(&self, field: &str) -> &Value {
        static NULL: Value = Value::Null;
        self.values.get(field).unwrap_or(&NULL)
    }

    /// Sets the value of a field.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) {
        self.values.insert(field.to_string(), value.into());
    }

    /// Returns the primary key or a `DatabaseError` for unsaved records.
    pub fn require_pk(&self) -> CrudResult<i64> {
        self.pk
            .ok_or_else(|| CrudError::DatabaseError("record has no primary key".to_string()))
    }

    /// Reads a required string field.
    pub fn text(&self, field: &str) -> CrudResult<String> {
        match self.get(field) {
            Value::String(s) => Ok(s.clone()),
            other => Err(type_mismatch(field, "string", other)),
        }
    }

    /// Reads a nullable string field.
    pub fn opt_text(&self, field: &str) -> CrudResult<Option<String>> {
        match self.get(field) {
            Value::Null => Ok(None),
            _ => self.text(field).map(Some),
        }
    }

    /// Reads a required integer field.
    pub fn int(&self, field: &str) -> CrudResult<i64> {
        self.get(field)
            .as_int()
            .ok_or_else(|| type_mismatch(field, "integer", self.get(field)))
    }

    /// Reads a nullable integer field (including nullable foreign keys).
    pub fn opt_int(&self, field: &str) -> CrudResult<Option<i64>> {
        match self.get(field) {
            Value::Null => Ok(None),
            _ => self.int(field).map(Some),
        }
    }

    /// Reads a required boolean field.
    pub fn boolean(&self, field: &str) -> CrudResult<bool> {
        self.get(field)
            .as_bool()
            .ok_or_else(|| type_mismatch(field, "boolean", self.get(field)))
    }

    /// Reads a required datetime field.
    pub fn datetime(&self, field: &str) -> CrudResult<chrono::NaiveDateTime> {
        self.get(field)
            .as_datetime()
            .ok_or_else(|| type_mismatch(field, "datetime", self.get(field)))
    }
}

fn type_mismatch(field: &str, expected: &str, got: &Value) -> CrudError {
    CrudError::DatabaseError(format!(
        "field '{field}': expected {expected}, got {:?}",
        got.kind()
    ))
}

/// A named computed value on an entity, usable as a list column.
pub struct Accessor<E> {
    /// The name used in `list_display`.
    pub name: &'static str,
    /// Column heading override.
    pub short_description: Option<&'static str>,
    /// Computes the value.
    pub func: fn(&E) -> Value,
}

impl<E> Clone for Accessor<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for Accessor<E> {}

impl<E> std::fmt::Debug for Accessor<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Accessor")
            .field("name", &self.name)
            .field("short_description", &self.short_description)
            .finish_non_exhaustive()
    }
}

impl<E> Accessor<E> {
    /// Creates an accessor without a short description.
    pub const fn new(name: &'static str, func: fn(&E) -> Value) -> Self {
        Self {
            name,
            short_description: None,
            func,
        }
    }

    /// Sets the column heading.
    #[must_use]
    pub const fn short_description(mut self, text: &'static str) -> Self {
        self.short_description = Some(text);
        self
    }
}

/// A type managed by the CRUD controller.
///
/// Implementations are plain structs; the trait only asks for their schema,
/// primary key, and a lossless mapping to and from [`Record`].
pub trait Entity: Clone + Send + Sync + 'static {
    /// Returns the static schema for this type.
    fn meta() -> &'static EntityMeta;

    /// Returns the primary key, or `None` if unsaved.
    fn pk(&self) -> Option<i64>;

    /// Sets the primary key (after insert).
    fn set_pk(&mut self, pk: i64);

    /// Returns all schema field values, keyed by field name.
    fn field_values(&self) -> Vec<(&'static str, Value)>;

    /// Builds an instance from a stored record.
    fn from_record(record: &Record) -> CrudResult<Self>;

    /// The human-readable title, used in messages, delete confirmations,
    /// and popup responses.
    fn display_title(&self) -> String;

    /// Read-only entities can never be edited or deleted through the
    /// controller, whatever its flags say.
    fn is_readonly(&self) -> bool {
        false
    }

    /// Computed values that may be used as list columns.
    fn accessors() -> Vec<Accessor<Self>> {
        Vec::new()
    }

    /// Converts this entity to a record.
    fn to_record(&self) -> Record {
        Record::new(self.pk(), self.field_values())
    }

    /// Returns one schema field value, `Null` when the field is unknown.
    fn value_of(&self, field: &str) -> Value {
        self.field_values()
            .into_iter()
            .find(|(name, _)| *name == field)
            .map_or(Value::Null, |(_, v)| v)
    }
}
