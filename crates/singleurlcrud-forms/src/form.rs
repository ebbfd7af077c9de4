//! [`BaseForm`]: binding, validation state, and template context.
//!
//! A form is built from a list of [`FormFieldDef`]s, optionally with
//! initial values and a prefix (for namespacing several forms on one page).
//! Binding to submitted data and validating through a
//! [`FormValidator`](crate::validation::FormValidator) fills
//! [`errors`](BaseForm::errors) and [`cleaned_data`](BaseForm::cleaned_data).

use std::collections::HashMap;

use serde_json::json;

use singleurlcrud_db::Value;
use singleurlcrud_http::QueryDict;

use crate::bound_field::BoundField;
use crate::fields::{FormFieldDef, FormFieldType};
use crate::validation::{self, FormValidator};
use crate::NON_FIELD_ERRORS;

/// A general-purpose form.
#[derive(Debug, Clone)]
pub struct BaseForm {
    field_defs: Vec<FormFieldDef>,
    initial: HashMap<String, Value>,
    prefix: Option<String>,
    bound: bool,
    raw_data: HashMap<String, Option<String>>,
    errors: HashMap<String, Vec<String>>,
    cleaned_data: HashMap<String, Value>,
}

impl BaseForm {
    /// Creates an unbound form with the given field definitions.
    pub fn new(fields: Vec<FormFieldDef>) -> Self {
        Self {
            field_defs: fields,
            initial: HashMap::new(),
            prefix: None,
            bound: false,
            raw_data: HashMap::new(),
            errors: HashMap::new(),
            cleaned_data: HashMap::new(),
        }
    }

    /// Sets initial values, overriding field-level initials.
    #[must_use]
    pub fn with_initial(mut self, initial: HashMap<String, Value>) -> Self {
        self.initial = initial;
        self
    }

    /// Sets the form prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Returns the field definitions.
    pub fn fields(&self) -> &[FormFieldDef] {
        &self.field_defs
    }

    /// Returns a field definition for modification.
    pub fn field_mut(&mut self, name: &str) -> Option<&mut FormFieldDef> {
        self.field_defs.iter_mut().find(|f| f.name == name)
    }

    /// Appends a field definition.
    pub fn push_field(&mut self, field: FormFieldDef) {
        self.field_defs.push(field);
    }

    /// Returns the form prefix.
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Returns the HTML name of a field, including the prefix.
    pub fn html_name(&self, field: &str) -> String {
        match &self.prefix {
            Some(p) => format!("{p}-{field}"),
            None => field.to_string(),
        }
    }

    /// Returns the initial value of a field: the form's initial map first,
    /// then the field definition's initial.
    pub fn initial_value<'a>(&'a self, field: &'a FormFieldDef) -> Option<&'a Value> {
        self.initial.get(&field.name).or(field.initial.as_ref())
    }

    /// Binds submitted data, clearing any previous validation state.
    pub fn bind(&mut self, data: &QueryDict) {
        self.bound = true;
        self.raw_data.clear();
        self.errors.clear();
        self.cleaned_data.clear();
        for field in &self.field_defs {
            let value = data.get(&self.html_name(&field.name)).map(String::from);
            self.raw_data.insert(field.name.clone(), value);
        }
    }

    /// Returns `true` if the form has been bound to data.
    pub const fn is_bound(&self) -> bool {
        self.bound
    }

    /// Returns the raw submitted value of a field.
    pub fn raw_value(&self, field: &str) -> Option<&str> {
        self.raw_data.get(field).and_then(|v| v.as_deref())
    }

    /// Runs field cleaning and then the validator's cross-field checks.
    /// Returns `true` when the form is bound and has no errors.
    pub async fn is_valid(&mut self, validator: &dyn FormValidator) -> bool {
        if !self.bound {
            return false;
        }
        self.errors.clear();
        self.cleaned_data.clear();

        validation::clean_fields(
            &self.field_defs,
            &self.raw_data,
            &mut self.cleaned_data,
            &mut self.errors,
        );

        if self.errors.is_empty() {
            if let Err(form_errors) = validator.clean(&self.cleaned_data).await {
                for (key, msgs) in form_errors {
                    self.errors.entry(key).or_default().extend(msgs);
                }
            }
        }

        self.errors.is_empty()
    }

    /// Returns per-field validation errors; form-level errors are under
    /// [`NON_FIELD_ERRORS`].
    pub const fn errors(&self) -> &HashMap<String, Vec<String>> {
        &self.errors
    }

    /// Records an error against a field, or against the whole form when
    /// `field` is `None`.
    pub fn add_error(&mut self, field: Option<&str>, message: impl Into<String>) {
        let key = field.unwrap_or(NON_FIELD_ERRORS).to_string();
        self.errors.entry(key).or_default().push(message.into());
        if let Some(f) = field {
            self.cleaned_data.remove(f);
        }
    }

    /// Returns the non-field (form-level) errors.
    pub fn non_field_errors(&self) -> &[String] {
        self.errors.get(NON_FIELD_ERRORS).map_or(&[], Vec::as_slice)
    }

    /// Returns `true` if any error is recorded.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns the cleaned data. Complete only after a successful
    /// [`is_valid`](Self::is_valid).
    pub const fn cleaned_data(&self) -> &HashMap<String, Value> {
        &self.cleaned_data
    }

    /// Returns `true` if the submitted data differs from the initial values.
    pub fn has_changed(&self) -> bool {
        if !self.bound {
            return false;
        }
        self.field_defs.iter().any(|field| {
            let initial = self
                .initial_value(field)
                .and_then(Value::to_form_string)
                .unwrap_or_default();
            let submitted = self.raw_value(&field.name).unwrap_or("").trim();
            if matches!(field.field_type, FormFieldType::Boolean) {
                is_checked(submitted) != is_checked(&initial)
            } else {
                submitted != initial.trim()
            }
        })
    }

    /// Returns the fields bound to their display data and errors.
    pub fn bound_fields(&self) -> Vec<BoundField> {
        self.field_defs
            .iter()
            .map(|field| {
                let data = if self.bound {
                    self.raw_data.get(&field.name).cloned().flatten()
                } else {
                    self.initial_value(field).and_then(Value::to_form_string)
                };
                let errors = self.errors.get(&field.name).cloned().unwrap_or_default();
                BoundField::new(field, data, errors, self.prefix.as_deref())
            })
            .collect()
    }

    /// Generates the template context: visible and hidden fields, errors,
    /// and binding state.
    pub fn as_context(&self) -> serde_json::Value {
        let (hidden, visible): (Vec<_>, Vec<_>) = self
            .bound_fields()
            .into_iter()
            .partition(|bf| bf.widget.is_hidden());
        json!({
            "prefix": self.prefix,
            "fields": visible.iter().map(BoundField::to_context).collect::<Vec<_>>(),
            "hidden_fields": hidden.iter().map(BoundField::to_context).collect::<Vec<_>>(),
            "errors": self.errors,
            "non_field_errors": self.non_field_errors(),
            "has_errors": self.has_errors(),
            "is_bound": self.bound,
        })
    }
}

fn is_checked(raw: &str) -> bool {
    matches!(raw.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}
