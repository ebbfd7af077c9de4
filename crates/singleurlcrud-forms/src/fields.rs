//! Form field definitions and type-level validation.
//!
//! Each [`FormFieldDef`] describes a single form field: its type, label,
//! widget, and whether it is required. [`clean_field_value`] turns the raw
//! submitted string into a typed [`Value`] or a list of error messages.

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;

use singleurlcrud_db::Value;

use crate::widgets::WidgetType;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}$").expect("valid regex")
});

/// Datetime input formats, tried in order.
const DATETIME_INPUT_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// The type of a form field, with type-specific parameters.
#[derive(Debug, Clone)]
pub enum FormFieldType {
    /// Single-line text.
    Char {
        /// Maximum length in characters.
        max_length: Option<usize>,
        /// Whether to strip leading/trailing whitespace.
        strip: bool,
    },
    /// Multi-line text.
    Text,
    /// A whole number.
    Integer,
    /// A floating-point number.
    Float,
    /// A checkbox.
    Boolean,
    /// A date (`YYYY-MM-DD`).
    Date,
    /// A date and time (`YYYY-MM-DD HH:MM[:SS]`).
    DateTime,
    /// An email address.
    Email {
        /// Maximum length in characters.
        max_length: Option<usize>,
    },
    /// One value out of a fixed set. Foreign keys use this with the
    /// related records' primary keys.
    Choice {
        /// Available choices as `(value, display_label)` pairs.
        choices: Vec<(Value, String)>,
    },
}

/// Complete definition of a form field.
#[derive(Debug, Clone)]
pub struct FormFieldDef {
    /// The field name (HTML name attribute, before any prefix).
    pub name: String,
    /// The field type, controlling parsing and coercion.
    pub field_type: FormFieldType,
    /// Whether this field is required.
    pub required: bool,
    /// Default/initial value.
    pub initial: Option<Value>,
    /// The cleaned value of an empty, optional field.
    pub empty_value: Value,
    /// Help text displayed alongside the field.
    pub help_text: String,
    /// Human-readable label.
    pub label: String,
    /// The widget used for rendering.
    pub widget: WidgetType,
    /// Whether the field is disabled (rendered but not editable).
    pub disabled: bool,
}

impl FormFieldDef {
    /// Creates a required field with the default widget for its type.
    pub fn new(name: impl Into<String>, field_type: FormFieldType) -> Self {
        let name = name.into();
        let widget = default_widget_for_field_type(&field_type);
        let empty_value = match field_type {
            FormFieldType::Char { .. } | FormFieldType::Text | FormFieldType::Email { .. } => {
                Value::String(String::new())
            }
            FormFieldType::Boolean => Value::Bool(false),
            _ => Value::Null,
        };
        let label = name.replace('_', " ");
        Self {
            name,
            field_type,
            required: true,
            initial: None,
            empty_value,
            help_text: String::new(),
            label,
            widget,
            disabled: false,
        }
    }

    /// Sets whether this field is required.
    #[must_use]
    pub const fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Sets the initial value.
    #[must_use]
    pub fn initial(mut self, value: Value) -> Self {
        self.initial = Some(value);
        self
    }

    /// Sets the help text.
    #[must_use]
    pub fn help_text(mut self, text: impl Into<String>) -> Self {
        self.help_text = text.into();
        self
    }

    /// Sets the label.
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Sets the widget type.
    #[must_use]
    pub fn widget(mut self, widget: WidgetType) -> Self {
        self.widget = widget;
        self
    }

    /// Sets whether this field is disabled.
    #[must_use]
    pub const fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// Returns the choices of a choice field.
    pub fn choices(&self) -> &[(Value, String)] {
        match &self.field_type {
            FormFieldType::Choice { choices } => choices,
            _ => &[],
        }
    }
}

/// Returns the default widget type for a form field type.
pub fn default_widget_for_field_type(field_type: &FormFieldType) -> WidgetType {
    match field_type {
        FormFieldType::Char { .. } => WidgetType::TextInput,
        FormFieldType::Text => WidgetType::Textarea,
        FormFieldType::Integer | FormFieldType::Float => WidgetType::NumberInput,
        FormFieldType::Boolean => WidgetType::CheckboxInput,
        FormFieldType::Date => WidgetType::DateInput,
        FormFieldType::DateTime => WidgetType::DateTimeInput,
        FormFieldType::Email { .. } => WidgetType::EmailInput,
        FormFieldType::Choice { .. } => WidgetType::Select,
    }
}

fn check_max_length(s: &str, max_length: Option<usize>, errors: &mut Vec<String>) {
    if let Some(max) = max_length {
        let len = s.chars().count();
        if len > max {
            errors.push(format!(
                "Ensure this value has at most {max} characters (it has {len})."
            ));
        }
    }
}

/// Cleans (validates and coerces) a raw form input string into a `Value`.
///
/// 1. Required check (missing or empty input)
/// 2. Type coercion (string to integer, date, and so on)
/// 3. Type-specific constraints (length, choices, email syntax)
///
/// An empty optional field cleans to the field's `empty_value`.
pub fn clean_field_value(field: &FormFieldDef, raw: Option<&str>) -> Result<Value, Vec<String>> {
    let raw_str = match field.field_type {
        FormFieldType::Char { strip: true, .. } | FormFieldType::Email { .. } => {
            raw.unwrap_or("").trim()
        }
        _ => raw.unwrap_or(""),
    };

    if matches!(field.field_type, FormFieldType::Boolean) {
        let checked = matches!(
            raw_str.to_lowercase().as_str(),
            "true" | "1" | "yes" | "on"
        );
        if field.required && !checked {
            return Err(vec!["This field is required.".to_string()]);
        }
        return Ok(Value::Bool(checked));
    }

    if raw_str.is_empty() {
        if field.required {
            return Err(vec!["This field is required.".to_string()]);
        }
        return Ok(field.empty_value.clone());
    }

    let mut errors = Vec::new();
    let value = match &field.field_type {
        FormFieldType::Char { max_length, .. } => {
            check_max_length(raw_str, *max_length, &mut errors);
            Value::String(raw_str.to_string())
        }
        FormFieldType::Text => Value::String(raw_str.to_string()),
        FormFieldType::Integer => match raw_str.trim().parse::<i64>() {
            Ok(n) => Value::Int(n),
            Err(_) => {
                errors.push("Enter a whole number.".to_string());
                Value::Null
            }
        },
        FormFieldType::Float => match raw_str.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => Value::Float(n),
            _ => {
                errors.push("Enter a number.".to_string());
                Value::Null
            }
        },
        FormFieldType::Boolean => Value::Bool(true),
        FormFieldType::Date => match NaiveDate::parse_from_str(raw_str.trim(), "%Y-%m-%d") {
            Ok(d) => Value::Date(d),
            Err(_) => {
                errors.push("Enter a valid date.".to_string());
                Value::Null
            }
        },
        FormFieldType::DateTime => match parse_datetime(raw_str.trim()) {
            Some(dt) => Value::DateTime(dt),
            None => {
                errors.push("Enter a valid date/time.".to_string());
                Value::Null
            }
        },
        FormFieldType::Email { max_length } => {
            if !EMAIL_RE.is_match(raw_str) {
                errors.push("Enter a valid email address.".to_string());
            }
            check_max_length(raw_str, *max_length, &mut errors);
            Value::String(raw_str.to_string())
        }
        FormFieldType::Choice { choices } => {
            match choices
                .iter()
                .find(|(v, _)| !v.is_null() && v.to_form_string().as_deref() == Some(raw_str))
            {
                Some((v, _)) => v.clone(),
                None => {
                    errors.push(
                        "Select a valid choice. That choice is not one of the available choices."
                            .to_string(),
                    );
                    Value::Null
                }
            }
        }
    };

    if errors.is_empty() {
        Ok(value)
    } else {
        Err(errors)
    }
}

/// Parses a datetime in any accepted input format; a bare date means
/// midnight.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    DATETIME_INPUT_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
