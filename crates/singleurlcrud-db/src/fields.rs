//! Field definitions.
//!
//! A [`FieldDef`] describes one column of an entity schema: its semantic
//! [`FieldType`], nullability, uniqueness, default, human label, and
//! optional choice set. Forms, stores, and the list formatter all read it.

use crate::model::EntityMeta;
use crate::value::Value;

/// Returns the schema of a related entity type.
pub type MetaFn = fn() -> &'static EntityMeta;

/// What happens to referencing rows when a referenced row is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    /// Delete the referencing rows too.
    Cascade,
    /// Null out the reference. The field must be nullable.
    SetNull,
}

/// The semantic type of a field.
#[derive(Debug, Clone, Copy)]
pub enum FieldType {
    /// Short single-line text; usually paired with `max_length`.
    Char,
    /// Multi-line text.
    Text,
    /// An email address.
    Email,
    /// A signed integer.
    Integer,
    /// A floating-point number.
    Float,
    /// A boolean.
    Boolean,
    /// A calendar date.
    Date,
    /// A date and time.
    DateTime,
    /// A reference to another entity's primary key.
    ForeignKey {
        /// The referenced entity's schema.
        to: MetaFn,
        /// Delete behavior.
        on_delete: OnDelete,
    },
}

impl FieldType {
    /// Returns `true` for foreign-key fields.
    pub const fn is_relation(&self) -> bool {
        matches!(self, Self::ForeignKey { .. })
    }

    /// Returns the referenced schema for foreign-key fields.
    pub fn related_meta(&self) -> Option<&'static EntityMeta> {
        match self {
            Self::ForeignKey { to, .. } => Some(to()),
            _ => None,
        }
    }
}

/// A field definition.
///
/// # Examples
///
/// ```
/// use singleurlcrud_db::fields::{FieldDef, FieldType};
///
/// let field = FieldDef::new("pub_date", FieldType::DateTime).verbose_name("date published");
/// assert_eq!(field.verbose_name, "date published");
/// assert_eq!(field.column(), "pub_date");
/// assert!(!field.null);
/// ```
#[derive(Debug, Clone)]
pub struct FieldDef {
    /// The attribute name of this field.
    pub name: &'static str,
    /// The type of this field.
    pub field_type: FieldType,
    /// Whether the field may store `Null`.
    pub null: bool,
    /// Whether the field may be left blank in forms.
    pub blank: bool,
    /// Default value for new instances.
    pub default: Option<Value>,
    /// Whether values must be unique across the table.
    pub unique: bool,
    /// Maximum character length for text fields.
    pub max_length: Option<usize>,
    /// Human-readable help text.
    pub help_text: String,
    /// Human-readable name for the field.
    pub verbose_name: String,
    /// Allowed values as (value, display label) pairs.
    pub choices: Option<Vec<(Value, String)>>,
    /// Whether the field appears in generated forms.
    pub editable: bool,
}

impl FieldDef {
    /// Creates a new `FieldDef`: required, not unique, editable, and with a
    /// verbose name derived from `name` (underscores become spaces).
    pub fn new(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            null: false,
            blank: false,
            default: None,
            unique: false,
            max_length: None,
            help_text: String::new(),
            verbose_name: name.replace('_', " "),
            choices: None,
            editable: true,
        }
    }

    /// Shorthand for a foreign key to `to` that cascades on delete.
    pub fn foreign_key(name: &'static str, to: MetaFn) -> Self {
        Self::new(
            name,
            FieldType::ForeignKey {
                to,
                on_delete: OnDelete::Cascade,
            },
        )
    }

    /// Allows `Null` and blank form input.
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.null = true;
        self.blank = true;
        self
    }

    /// Allows blank form input without allowing `Null`.
    #[must_use]
    pub const fn blank(mut self) -> Self {
        self.blank = true;
        self
    }

    /// Sets the maximum length.
    #[must_use]
    pub const fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    /// Marks the field as unique.
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Sets the verbose name.
    #[must_use]
    pub fn verbose_name(mut self, name: impl Into<String>) -> Self {
        self.verbose_name = name.into();
        self
    }

    /// Sets the help text.
    #[must_use]
    pub fn help_text(mut self, text: impl Into<String>) -> Self {
        self.help_text = text.into();
        self
    }

    /// Sets the choice set.
    #[must_use]
    pub fn choices(mut self, choices: Vec<(Value, String)>) -> Self {
        self.choices = Some(choices);
        self
    }

    /// Excludes the field from generated forms.
    #[must_use]
    pub const fn not_editable(mut self) -> Self {
        self.editable = false;
        self
    }

    /// Changes the delete behavior of a foreign key. No effect on other
    /// field types.
    #[must_use]
    pub const fn on_delete(mut self, behavior: OnDelete) -> Self {
        if let FieldType::ForeignKey { to, .. } = self.field_type {
            self.field_type = FieldType::ForeignKey {
                to,
                on_delete: behavior,
            };
        }
        self
    }

    /// Returns `true` for foreign-key fields.
    pub const fn is_relation(&self) -> bool {
        self.field_type.is_relation()
    }

    /// Returns the storage column: `{name}_id` for foreign keys, else the
    /// name.
    pub fn column(&self) -> String {
        if self.is_relation() {
            format!("{}_id", self.name)
        } else {
            self.name.to_string()
        }
    }

    /// Returns the display label for `value` from the choice set.
    pub fn choice_label(&self, value: &Value) -> Option<&str> {
        self.choices
            .as_ref()?
            .iter()
            .find(|(v, _)| v == value)
            .map(|(_, label)| label.as_str())
    }
}
