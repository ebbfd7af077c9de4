//! Bound fields: form fields populated with data and errors.
//!
//! A [`BoundField`] pairs a field definition with its current value, its
//! validation errors, and the widget that renders it. Templates iterate
//! over bound fields through [`BoundField::to_context`].

use std::collections::HashMap;

use serde_json::json;

use singleurlcrud_core::utils::text::{capfirst, escape};

use crate::fields::FormFieldDef;
use crate::widgets::{self, Widget};

/// A form field bound to data and validation state.
#[derive(Debug)]
pub struct BoundField {
    /// The field's HTML name attribute (prefixed).
    pub name: String,
    /// The unprefixed field name.
    pub field_name: String,
    /// Human-readable label.
    pub label: String,
    /// Help text.
    pub help_text: String,
    /// Whether the field is required.
    pub required: bool,
    /// Whether the field is disabled.
    pub disabled: bool,
    /// The value to display: submitted data when bound, else the initial.
    pub data: Option<String>,
    /// Validation error messages for this field.
    pub errors: Vec<String>,
    /// The widget used for rendering.
    pub widget: Box<dyn Widget>,
}

impl BoundField {
    /// Creates a new `BoundField` from a field definition and current state.
    pub fn new(
        field_def: &FormFieldDef,
        data: Option<String>,
        errors: Vec<String>,
        prefix: Option<&str>,
    ) -> Self {
        let name = match prefix {
            Some(p) => format!("{p}-{}", field_def.name),
            None => field_def.name.clone(),
        };
        Self {
            name,
            field_name: field_def.name.clone(),
            label: field_def.label.clone(),
            help_text: field_def.help_text.clone(),
            required: field_def.required,
            disabled: field_def.disabled,
            data,
            errors,
            widget: widgets::create_widget(&field_def.widget, field_def.choices()),
        }
    }

    /// Renders the widget HTML for this bound field.
    pub fn render(&self) -> String {
        let mut attrs = HashMap::new();
        attrs.insert("id".to_string(), self.auto_id());
        if self.disabled {
            attrs.insert("disabled".to_string(), "disabled".to_string());
        }
        if !self.widget.is_hidden() {
            attrs.insert("class".to_string(), "form-control".to_string());
        }
        self.widget.render(&self.name, self.data.as_deref(), &attrs)
    }

    /// Renders a `<label>` element for this field.
    pub fn label_tag(&self) -> String {
        format!(
            r#"<label for="{}">{}</label>"#,
            self.auto_id(),
            escape(&capfirst(&self.label))
        )
    }

    /// Returns the auto-generated HTML `id` for this field.
    pub fn auto_id(&self) -> String {
        format!("id_{}", self.name)
    }

    /// Returns `true` if this field has any errors.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Renders the error list as an HTML `<ul>` element.
    pub fn errors_as_ul(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        let items: String = self
            .errors
            .iter()
            .map(|e| format!("<li>{}</li>", escape(e)))
            .collect();
        format!(r#"<ul class="errorlist">{items}</ul>"#)
    }

    /// The template context for one field.
    pub fn to_context(&self) -> serde_json::Value {
        json!({
            "name": self.name,
            "field_name": self.field_name,
            "label": capfirst(&self.label),
            "help_text": self.help_text,
            "required": self.required,
            "is_hidden": self.widget.is_hidden(),
            "html": self.render(),
            "label_tag": self.label_tag(),
            "errors": self.errors,
            "errors_html": self.errors_as_ul(),
        })
    }
}
