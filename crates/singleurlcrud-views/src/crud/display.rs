//! List columns: resolving display fields and formatting their values.
//!
//! Every name in `list_display` is resolved once, when the configuration is
//! built, to a [`FieldResolver`]: a schema field, an accessor declared by
//! the entity, or an accessor registered on the controller. A name that
//! resolves to none of these is a configuration error.
//!
//! At render time the resolved value goes through [`Formatters`]: a
//! formatter registered for the value's kind wins, otherwise booleans
//! become icon markup, dates and datetimes use the configured formats,
//! `Null` shows as `-`, and anything else is escaped text. Accessor output
//! is trusted markup and is not escaped.

use std::collections::HashMap;
use std::fmt::{self, Write as _};
use std::sync::Arc;

use singleurlcrud_core::utils::text::{capfirst, escape};
use singleurlcrud_core::{CrudError, CrudResult};
use singleurlcrud_db::{Accessor, Entity, EntityStore, FieldDef, Value, ValueKind};

/// Markup for a true boolean cell.
pub const BOOLEAN_TRUE_HTML: &str = r#"<span class="glyphicon glyphicon-ok text-success"></span>"#;
/// Markup for a false boolean cell.
pub const BOOLEAN_FALSE_HTML: &str =
    r#"<span class="glyphicon glyphicon-remove text-danger"></span>"#;
/// What a `Null` cell shows.
pub const EMPTY_VALUE_DISPLAY: &str = "-";

/// Formats one value for a list cell.
pub type ValueFormatter = Arc<dyn Fn(&Value) -> String + Send + Sync>;

/// How a display field obtains its value.
pub enum FieldResolver<E> {
    /// A field of the entity's schema.
    SchemaField(&'static FieldDef),
    /// An accessor the entity type declares.
    EntityMethod(Accessor<E>),
    /// An accessor registered on the controller.
    ControllerMethod(Accessor<E>),
}

impl<E> fmt::Debug for FieldResolver<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SchemaField(field) => f.debug_tuple("SchemaField").field(&field.name).finish(),
            Self::EntityMethod(a) => f.debug_tuple("EntityMethod").field(&a.name).finish(),
            Self::ControllerMethod(a) => f.debug_tuple("ControllerMethod").field(&a.name).finish(),
        }
    }
}

/// A resolved list column.
pub struct DisplayField<E> {
    pub name: String,
    pub label: String,
    pub resolver: FieldResolver<E>,
}

impl<E> fmt::Debug for DisplayField<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisplayField")
            .field("name", &self.name)
            .field("label", &self.label)
            .field("resolver", &self.resolver)
            .finish()
    }
}

impl<E: Entity> DisplayField<E> {
    /// Resolves `name` against the schema, then the entity's accessors,
    /// then `controller_accessors`.
    pub fn resolve(
        name: &str,
        label_override: Option<&str>,
        controller_accessors: &[Accessor<E>],
    ) -> CrudResult<Self> {
        let meta = E::meta();
        let resolver = if let Some(field) = meta.get_field(name) {
            FieldResolver::SchemaField(field)
        } else if let Some(accessor) = E::accessors().into_iter().find(|a| a.name == name) {
            FieldResolver::EntityMethod(accessor)
        } else if let Some(accessor) = controller_accessors.iter().find(|a| a.name == name) {
            FieldResolver::ControllerMethod(*accessor)
        } else {
            return Err(CrudError::ConfigurationError(format!(
                "Unable to locate '{name}' on {} or its controller",
                meta.model_name
            )));
        };
        let label = label_override.map_or_else(|| resolve_label(name, &resolver), String::from);
        Ok(Self {
            name: name.to_string(),
            label,
            resolver,
        })
    }

    /// Returns the raw value for `entity` and whether it is trusted markup.
    ///
    /// Choice fields yield their label and foreign keys the related
    /// record's title from `related`.
    pub fn resolve_value(&self, entity: &E, related: &RelatedTitles) -> (Value, bool) {
        match &self.resolver {
            FieldResolver::SchemaField(field) => {
                let value = entity.value_of(field.name);
                if let Some(label) = field.choice_label(&value) {
                    return (Value::String(label.to_string()), false);
                }
                if field.field_type.is_relation() {
                    if let Some(title) = value.as_int().and_then(|pk| related.get(field.name, pk)) {
                        return (Value::String(title.to_string()), false);
                    }
                }
                (value, false)
            }
            FieldResolver::EntityMethod(accessor) | FieldResolver::ControllerMethod(accessor) => {
                ((accessor.func)(entity), true)
            }
        }
    }

    /// Resolves and formats the cell for `entity`.
    pub fn render(&self, entity: &E, related: &RelatedTitles, formatters: &Formatters) -> String {
        let (value, trusted) = self.resolve_value(entity, related);
        formatters.format(&value, trusted)
    }

    /// The schema field behind this column, if any.
    pub const fn schema_field(&self) -> Option<&'static FieldDef> {
        match self.resolver {
            FieldResolver::SchemaField(field) => Some(field),
            _ => None,
        }
    }
}

/// The column heading for a resolved field: the schema's verbose name,
/// else the accessor's short description, else the name, capitalized.
pub fn resolve_label<E>(name: &str, resolver: &FieldResolver<E>) -> String {
    match resolver {
        FieldResolver::SchemaField(field) => capfirst(&field.verbose_name),
        FieldResolver::EntityMethod(a) | FieldResolver::ControllerMethod(a) => a
            .short_description
            .map_or_else(|| capfirst(&name.replace('_', " ")), String::from),
    }
}

/// Titles of records referenced by foreign-key columns, keyed by field
/// and primary key.
#[derive(Debug, Default)]
pub struct RelatedTitles {
    titles: HashMap<(String, i64), String>,
}

impl RelatedTitles {
    /// Loads, with one query per foreign-key column, the titles of every
    /// record the given entities reference.
    pub async fn prefetch<E: Entity>(
        store: &dyn EntityStore,
        fields: &[DisplayField<E>],
        entities: &[E],
    ) -> CrudResult<Self> {
        let mut titles = HashMap::new();
        for field in fields.iter().filter_map(DisplayField::schema_field) {
            let Some(target) = field.field_type.related_meta() else {
                continue;
            };
            let mut pks: Vec<i64> = entities
                .iter()
                .filter_map(|e| e.value_of(field.name).as_int())
                .collect();
            pks.sort_unstable();
            pks.dedup();
            if pks.is_empty() {
                continue;
            }
            for record in store.filter_pks(target, &pks).await? {
                if let Some(pk) = record.pk {
                    titles.insert((field.name.to_string(), pk), target.record_title(&record));
                }
            }
        }
        Ok(Self { titles })
    }

    /// Returns the title of the record `pk` referenced through `field`.
    pub fn get(&self, field: &str, pk: i64) -> Option<&str> {
        self.titles
            .get(&(field.to_string(), pk))
            .map(String::as_str)
    }
}

/// The formatter chain for list cells.
#[derive(Clone)]
pub struct Formatters {
    custom: HashMap<ValueKind, ValueFormatter>,
    date_format: String,
    datetime_format: String,
}

impl fmt::Debug for Formatters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Formatters")
            .field("custom", &self.custom.keys().collect::<Vec<_>>())
            .field("date_format", &self.date_format)
            .field("datetime_format", &self.datetime_format)
            .finish()
    }
}

impl Formatters {
    /// Creates the built-in chain with the given chrono format strings.
    pub fn new(date_format: impl Into<String>, datetime_format: impl Into<String>) -> Self {
        Self {
            custom: HashMap::new(),
            date_format: date_format.into(),
            datetime_format: datetime_format.into(),
        }
    }

    /// Registers a formatter for a value kind, replacing the built-in one.
    pub fn register(&mut self, kind: ValueKind, formatter: ValueFormatter) {
        self.custom.insert(kind, formatter);
    }

    /// Formats a value. `trusted` values are strings emitted as-is.
    pub fn format(&self, value: &Value, trusted: bool) -> String {
        if let Some(formatter) = self.custom.get(&value.kind()) {
            return formatter(value);
        }
        match value {
            Value::Null => EMPTY_VALUE_DISPLAY.to_string(),
            Value::Bool(true) => BOOLEAN_TRUE_HTML.to_string(),
            Value::Bool(false) => BOOLEAN_FALSE_HTML.to_string(),
            Value::Date(d) => format_or_default(d.format(&self.date_format), value),
            Value::DateTime(dt) => format_or_default(dt.format(&self.datetime_format), value),
            Value::String(s) if trusted => s.clone(),
            other => escape(&other.to_string()),
        }
    }
}

/// Renders a chrono format, falling back to the value's wire form when the
/// format string is invalid.
fn format_or_default(formatted: impl fmt::Display, value: &Value) -> String {
    let mut out = String::new();
    if write!(out, "{formatted}").is_err() {
        tracing::warn!("invalid date format in settings");
        return value.to_string();
    }
    out
}
