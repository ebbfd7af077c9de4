//! Schema-backed forms.
//!
//! [`ModelFormConfig`] says which schema fields a form edits and how to
//! present them; [`generate_form_fields`] turns the schema's
//! [`FieldDef`]s into [`FormFieldDef`]s. A [`ModelForm`] wraps the generated
//! [`BaseForm`] together with the record it edits and can construct the
//! record to save from the cleaned data.

use std::collections::HashMap;

use singleurlcrud_core::CrudResult;
use singleurlcrud_db::{EntityMeta, EntityStore, FieldDef, FieldType, Record, Value};
use singleurlcrud_http::QueryDict;

use crate::fields::{FormFieldDef, FormFieldType};
use crate::form::BaseForm;
use crate::validation::FormValidator;
use crate::widgets::WidgetType;

/// The label of the empty option in choice selects.
pub const EMPTY_CHOICE_LABEL: &str = "---------";

/// Choices for foreign-key fields, keyed by field name.
pub type RelatedChoices = HashMap<String, Vec<(Value, String)>>;

/// Specifies which schema fields a form includes.
#[derive(Debug, Clone, Default)]
pub enum ModelFormFields {
    /// All editable fields.
    #[default]
    All,
    /// Only the listed fields, in schema order.
    Include(Vec<String>),
    /// All editable fields except the listed ones.
    Exclude(Vec<String>),
}

impl ModelFormFields {
    fn includes(&self, name: &str) -> bool {
        match self {
            Self::All => true,
            Self::Include(names) => names.iter().any(|n| n == name),
            Self::Exclude(names) => !names.iter().any(|n| n == name),
        }
    }
}

/// Configuration for generating a schema-backed form.
#[derive(Debug, Clone)]
pub struct ModelFormConfig {
    /// The schema to generate fields from.
    pub meta: &'static EntityMeta,
    /// Which schema fields to include.
    pub fields: ModelFormFields,
    /// Widget overrides keyed by field name.
    pub widgets: HashMap<String, WidgetType>,
    /// Label overrides keyed by field name.
    pub labels: HashMap<String, String>,
    /// Help text overrides keyed by field name.
    pub help_texts: HashMap<String, String>,
}

impl ModelFormConfig {
    /// Creates a config including every editable field.
    pub fn new(meta: &'static EntityMeta) -> Self {
        Self {
            meta,
            fields: ModelFormFields::All,
            widgets: HashMap::new(),
            labels: HashMap::new(),
            help_texts: HashMap::new(),
        }
    }

    /// Sets which fields to include.
    #[must_use]
    pub fn with_fields(mut self, fields: ModelFormFields) -> Self {
        self.fields = fields;
        self
    }

    /// Adds a widget override for a field.
    #[must_use]
    pub fn with_widget(mut self, field_name: impl Into<String>, widget: WidgetType) -> Self {
        self.widgets.insert(field_name.into(), widget);
        self
    }

    /// Adds a label override for a field.
    #[must_use]
    pub fn with_label(mut self, field_name: impl Into<String>, label: impl Into<String>) -> Self {
        self.labels.insert(field_name.into(), label.into());
        self
    }

    /// Adds a help text override for a field.
    #[must_use]
    pub fn with_help_text(mut self, field_name: impl Into<String>, text: impl Into<String>) -> Self {
        self.help_texts.insert(field_name.into(), text.into());
        self
    }

    /// Returns the schema fields the form edits, in schema order.
    pub fn schema_fields(&self) -> impl Iterator<Item = &'static FieldDef> + '_ {
        self.meta
            .fields
            .iter()
            .filter(|f| f.editable && self.fields.includes(f.name))
    }
}

/// Loads the choices for every foreign key the form edits: an empty option
/// followed by each related record's title.
pub async fn load_related_choices(
    store: &dyn EntityStore,
    config: &ModelFormConfig,
) -> CrudResult<RelatedChoices> {
    let mut choices = RelatedChoices::new();
    for field in config.schema_fields() {
        let Some(target) = field.field_type.related_meta() else {
            continue;
        };
        let mut options = vec![(Value::Null, EMPTY_CHOICE_LABEL.to_string())];
        options.extend(
            store
                .list(target)
                .await?
                .iter()
                .filter_map(|r| r.pk.map(|pk| (Value::Int(pk), target.record_title(r)))),
        );
        choices.insert(field.name.to_string(), options);
    }
    Ok(choices)
}

/// Generates form field definitions from a config.
pub fn generate_form_fields(config: &ModelFormConfig, choices: &RelatedChoices) -> Vec<FormFieldDef> {
    config
        .schema_fields()
        .map(|schema_field| {
            let name = schema_field.name;
            let mut form_field =
                FormFieldDef::new(name, form_field_type(schema_field, choices.get(name)));

            form_field.required =
                !schema_field.blank && !matches!(schema_field.field_type, FieldType::Boolean);
            if schema_field.null {
                form_field.empty_value = Value::Null;
            }
            form_field.initial = schema_field.default.clone();
            form_field.label = config
                .labels
                .get(name)
                .cloned()
                .unwrap_or_else(|| schema_field.verbose_name.clone());
            form_field.help_text = config
                .help_texts
                .get(name)
                .cloned()
                .unwrap_or_else(|| schema_field.help_text.clone());
            if let Some(widget) = config.widgets.get(name) {
                form_field.widget = widget.clone();
            }
            form_field
        })
        .collect()
}

/// Converts a schema field type to a form field type.
fn form_field_type(field: &FieldDef, related: Option<&Vec<(Value, String)>>) -> FormFieldType {
    if let Some(choices) = &field.choices {
        let mut options = vec![(Value::Null, EMPTY_CHOICE_LABEL.to_string())];
        options.extend(choices.iter().cloned());
        return FormFieldType::Choice { choices: options };
    }
    match field.field_type {
        FieldType::Char => FormFieldType::Char {
            max_length: field.max_length,
            strip: true,
        },
        FieldType::Text => FormFieldType::Text,
        FieldType::Email => FormFieldType::Email {
            max_length: field.max_length,
        },
        FieldType::Integer => FormFieldType::Integer,
        FieldType::Float => FormFieldType::Float,
        FieldType::Boolean => FormFieldType::Boolean,
        FieldType::Date => FormFieldType::Date,
        FieldType::DateTime => FormFieldType::DateTime,
        FieldType::ForeignKey { .. } => FormFieldType::Choice {
            choices: related.cloned().unwrap_or_default(),
        },
    }
}

/// A form editing one record of a schema.
#[derive(Debug, Clone)]
pub struct ModelForm {
    meta: &'static EntityMeta,
    form: BaseForm,
    instance: Option<Record>,
}

impl ModelForm {
    /// Creates a form for a new record.
    pub fn new(config: &ModelFormConfig, choices: &RelatedChoices) -> Self {
        Self {
            meta: config.meta,
            form: BaseForm::new(generate_form_fields(config, choices)),
            instance: None,
        }
    }

    /// Creates a form editing `instance`, showing its current values.
    pub fn for_instance(config: &ModelFormConfig, choices: &RelatedChoices, instance: Record) -> Self {
        let fields = generate_form_fields(config, choices);
        let initial = fields
            .iter()
            .map(|f| (f.name.clone(), instance.get(&f.name).clone()))
            .collect();
        Self {
            meta: config.meta,
            form: BaseForm::new(fields).with_initial(initial),
            instance: Some(instance),
        }
    }

    /// Loads foreign-key choices from the store and creates the form.
    pub async fn build(
        store: &dyn EntityStore,
        config: &ModelFormConfig,
        instance: Option<Record>,
    ) -> CrudResult<Self> {
        let choices = load_related_choices(store, config).await?;
        Ok(match instance {
            Some(record) => Self::for_instance(config, &choices, record),
            None => Self::new(config, &choices),
        })
    }

    /// Sets the form prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.form = self.form.with_prefix(prefix);
        self
    }

    /// Returns the schema.
    pub const fn meta(&self) -> &'static EntityMeta {
        self.meta
    }

    /// Returns the underlying form.
    pub const fn form(&self) -> &BaseForm {
        &self.form
    }

    /// Returns the underlying form for modification.
    pub fn form_mut(&mut self) -> &mut BaseForm {
        &mut self.form
    }

    /// Returns the record being edited, `None` for a new record.
    pub const fn instance(&self) -> Option<&Record> {
        self.instance.as_ref()
    }

    /// Replaces the widget of a foreign-key field with a select plus an
    /// "add another" popup link to the controller at `crud_url`.
    pub fn wrap_related(&mut self, field: &str, crud_url: &str) {
        if let Some(def) = self.form.field_mut(field) {
            def.widget = WidgetType::RelatedSelect {
                crud_url: crud_url.to_string(),
            };
        }
    }

    /// Binds submitted data.
    pub fn bind(&mut self, data: &QueryDict) {
        self.form.bind(data);
    }

    /// Validates the bound data.
    pub async fn is_valid(&mut self, validator: &dyn FormValidator) -> bool {
        self.form.is_valid(validator).await
    }

    /// Builds the record to save: the edited instance (or the schema
    /// defaults for a new record) overlaid with the cleaned data.
    pub fn construct_record(&self) -> Record {
        let mut record = self.instance.clone().unwrap_or_else(|| Record {
            pk: None,
            values: self
                .meta
                .fields
                .iter()
                .map(|f| (f.name.to_string(), f.default.clone().unwrap_or(Value::Null)))
                .collect(),
        });
        for (name, value) in self.form.cleaned_data() {
            if self.meta.get_field(name).is_some() {
                record.set(name, value.clone());
            }
        }
        record
    }

    /// The template context of the underlying form.
    pub fn as_context(&self) -> serde_json::Value {
        self.form.as_context()
    }
}
