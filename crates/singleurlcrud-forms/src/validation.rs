//! Validation pipeline for form processing.
//!
//! 1. Field-level cleaning ([`clean_fields`]): type coercion plus per-field
//!    constraints, accumulating errors across all fields.
//! 2. Cross-field checks ([`FormValidator::clean`]), which only run once
//!    every field cleaned successfully and may be async.

use std::collections::HashMap;

use async_trait::async_trait;

use singleurlcrud_db::Value;

use crate::fields::{clean_field_value, FormFieldDef};

/// Errors keyed by field name ([`NON_FIELD_ERRORS`](crate::NON_FIELD_ERRORS)
/// for form-level errors).
pub type FormErrors = HashMap<String, Vec<String>>;

/// Decides whether cleaned form data is acceptable.
///
/// Field-level cleaning always runs first and is driven by the schema; a
/// validator adds checks that span several fields or need I/O.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
///
/// use async_trait::async_trait;
/// use singleurlcrud_db::Value;
/// use singleurlcrud_forms::validation::{FormErrors, FormValidator};
///
/// struct NoTestQuestions;
///
/// #[async_trait]
/// impl FormValidator for NoTestQuestions {
///     async fn clean(&self, data: &HashMap<String, Value>) -> Result<(), FormErrors> {
///         if data.get("question_text").and_then(Value::as_str) == Some("test") {
///             let mut errors = FormErrors::new();
///             errors.insert("question_text".into(), vec!["Pick a real question.".into()]);
///             return Err(errors);
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait FormValidator: Send + Sync {
    /// Cross-field validation hook. The default accepts everything.
    async fn clean(&self, cleaned_data: &HashMap<String, Value>) -> Result<(), FormErrors> {
        let _ = cleaned_data;
        Ok(())
    }
}

/// The default validator: schema-driven field cleaning only.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidator;

#[async_trait]
impl FormValidator for SchemaValidator {}

/// Performs field-level validation for all fields.
///
/// Disabled fields take their initial value and skip validation. Errors
/// accumulate across all fields.
pub fn clean_fields(
    field_defs: &[FormFieldDef],
    raw_data: &HashMap<String, Option<String>>,
    cleaned_data: &mut HashMap<String, Value>,
    errors: &mut FormErrors,
) {
    for field in field_defs {
        if field.disabled {
            if let Some(initial) = &field.initial {
                cleaned_data.insert(field.name.clone(), initial.clone());
            }
            continue;
        }

        let raw = raw_data.get(&field.name).and_then(|v| v.as_deref());
        match clean_field_value(field, raw) {
            Ok(value) => {
                cleaned_data.insert(field.name.clone(), value);
            }
            Err(field_errors) => {
                errors.insert(field.name.clone(), field_errors);
            }
        }
    }
}
