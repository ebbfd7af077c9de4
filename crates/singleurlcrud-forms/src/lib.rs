//! # singleurlcrud-forms
//!
//! Forms for the CRUD controller. A [`ModelForm`] is generated from an
//! entity schema, an [`InlineFormSet`] edits the child rows of a parent
//! entity, and a [`FormValidator`] decides whether submitted data is
//! acceptable.
//!
//! ## Modules
//!
//! - [`fields`] - Form field definitions and per-field cleaning
//! - [`widgets`] - HTML widgets, including the related-object wrapper
//! - [`bound_field`] - Fields paired with data and errors for rendering
//! - [`form`] - [`BaseForm`]: binding, validation state, template context
//! - [`validation`] - The [`FormValidator`] seam and field cleaning pass
//! - [`model_form`] - Schema-driven forms and record construction
//! - [`formset`] - Inline formsets with a management form

pub mod bound_field;
pub mod fields;
pub mod form;
pub mod formset;
pub mod model_form;
pub mod validation;
pub mod widgets;

pub use bound_field::BoundField;
pub use fields::{FormFieldDef, FormFieldType};
pub use form::BaseForm;
pub use formset::{InlineFormSet, InlineFormSetConfig};
pub use model_form::{ModelForm, ModelFormConfig, ModelFormFields, RelatedChoices};
pub use validation::{FormValidator, SchemaValidator};
pub use widgets::{Widget, WidgetType};

/// The error key for errors that belong to the whole form.
pub const NON_FIELD_ERRORS: &str = "__all__";
