//! Inline formsets: the child rows of a parent record on one page.
//!
//! An [`InlineFormSet`] edits the records of a child schema whose foreign
//! key points at the parent being edited. It renders one form per existing
//! child plus `extra` empty forms, tracks them with a management form
//! (`{prefix}-TOTAL_FORMS`, `{prefix}-INITIAL_FORMS`, ...), and on save
//! inserts new rows, updates changed ones, and deletes rows marked
//! `DELETE`. Unchanged extra forms are ignored.

use serde_json::json;

use singleurlcrud_core::{CrudError, CrudResult};
use singleurlcrud_db::{EntityMeta, EntityStore, FieldType, Record, Value};
use singleurlcrud_http::QueryDict;

use crate::fields::{FormFieldDef, FormFieldType};
use crate::model_form::{load_related_choices, ModelForm, ModelFormConfig, ModelFormFields, RelatedChoices};
use crate::validation::FormValidator;
use crate::widgets::WidgetType;

/// Management form field names.
pub const TOTAL_FORMS: &str = "TOTAL_FORMS";
/// Number of forms bound to existing records.
pub const INITIAL_FORMS: &str = "INITIAL_FORMS";
const MIN_NUM_FORMS: &str = "MIN_NUM_FORMS";
const MAX_NUM_FORMS: &str = "MAX_NUM_FORMS";

/// The per-form deletion checkbox.
pub const DELETION_FIELD: &str = "DELETE";
/// The per-form hidden primary key.
pub const ID_FIELD: &str = "id";

/// How an inline formset is laid out.
#[derive(Debug, Clone)]
pub struct InlineFormSetConfig {
    /// Form configuration for each child row. The foreign key to the
    /// parent is always excluded.
    pub child: ModelFormConfig,
    /// The child's foreign-key field pointing at the parent.
    pub fk_name: &'static str,
    /// Number of empty forms rendered after the existing rows.
    pub extra: usize,
    /// Whether rows can be marked for deletion.
    pub can_delete: bool,
    /// Maximum number of forms accepted in a submission.
    pub max_num: usize,
    /// The formset prefix for HTML name attributes.
    pub prefix: String,
}

impl InlineFormSetConfig {
    /// Creates a config with 3 extra forms, deletion enabled, and the prefix
    /// `{model_name}_set`.
    pub fn new(child: &'static EntityMeta, fk_name: &'static str) -> Self {
        Self {
            child: ModelFormConfig::new(child)
                .with_fields(ModelFormFields::Exclude(vec![fk_name.to_string()])),
            fk_name,
            extra: 3,
            can_delete: true,
            max_num: 1000,
            prefix: format!("{}_set", child.model_name),
        }
    }

    /// Sets the number of extra forms.
    #[must_use]
    pub const fn extra(mut self, extra: usize) -> Self {
        self.extra = extra;
        self
    }

    /// Enables or disables row deletion.
    #[must_use]
    pub const fn can_delete(mut self, can_delete: bool) -> Self {
        self.can_delete = can_delete;
        self
    }

    /// Sets the maximum number of forms.
    #[must_use]
    pub const fn max_num(mut self, max_num: usize) -> Self {
        self.max_num = max_num;
        self
    }

    /// Sets the formset prefix.
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Restricts the child fields; the foreign key stays excluded.
    #[must_use]
    pub fn fields(mut self, fields: ModelFormFields) -> Self {
        let fk = self.fk_name.to_string();
        self.child.fields = match fields {
            ModelFormFields::All => ModelFormFields::Exclude(vec![fk]),
            ModelFormFields::Include(names) => {
                ModelFormFields::Include(names.into_iter().filter(|n| *n != fk).collect())
            }
            ModelFormFields::Exclude(mut names) => {
                names.push(fk);
                ModelFormFields::Exclude(names)
            }
        };
        self
    }

    /// Checks that `fk_name` is a foreign key from the child to `parent`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` otherwise.
    pub fn check(&self, parent: &EntityMeta) -> CrudResult<()> {
        let child = self.child.meta;
        match child.get_field(self.fk_name).map(|f| f.field_type) {
            Some(FieldType::ForeignKey { to, .. }) if to().db_table == parent.db_table => Ok(()),
            _ => Err(CrudError::ConfigurationError(format!(
                "'{}' has no foreign key '{}' to '{}'",
                child.db_table, self.fk_name, parent.db_table
            ))),
        }
    }
}

/// A set of child-row forms for one parent record.
#[derive(Debug, Clone)]
pub struct InlineFormSet {
    config: InlineFormSetConfig,
    choices: RelatedChoices,
    existing: Vec<Record>,
    forms: Vec<ModelForm>,
    initial_count: usize,
    non_form_errors: Vec<String>,
    bound: bool,
}

impl InlineFormSet {
    /// Creates an unbound formset over the existing child records.
    pub fn new(config: InlineFormSetConfig, choices: RelatedChoices, existing: Vec<Record>) -> Self {
        let mut formset = Self {
            config,
            choices,
            initial_count: existing.len(),
            existing,
            forms: Vec::new(),
            non_form_errors: Vec::new(),
            bound: false,
        };
        let total = formset.initial_count + formset.config.extra;
        formset.forms = (0..total)
            .map(|i| formset.make_form(i, formset.existing.get(i).cloned()))
            .collect();
        formset
    }

    /// Loads choices and, when `parent_pk` is set, the parent's existing
    /// children from the store, then creates the formset.
    pub async fn build(
        store: &dyn EntityStore,
        config: InlineFormSetConfig,
        parent_pk: Option<i64>,
    ) -> CrudResult<Self> {
        let choices = load_related_choices(store, &config.child).await?;
        let existing = match parent_pk {
            Some(pk) => {
                store
                    .filter_eq(config.child.meta, config.fk_name, &Value::Int(pk))
                    .await?
            }
            None => Vec::new(),
        };
        Ok(Self::new(config, choices, existing))
    }

    fn make_form(&self, index: usize, instance: Option<Record>) -> ModelForm {
        let prefix = format!("{}-{index}", self.config.prefix);
        let mut form = match instance {
            Some(record) => ModelForm::for_instance(&self.config.child, &self.choices, record),
            None => ModelForm::new(&self.config.child, &self.choices),
        }
        .with_prefix(prefix);

        let id_choices = self
            .existing
            .iter()
            .filter_map(|r| r.pk.map(|pk| (Value::Int(pk), pk.to_string())))
            .collect();
        let mut id_field = FormFieldDef::new(ID_FIELD, FormFieldType::Choice { choices: id_choices })
            .required(false)
            .widget(WidgetType::HiddenInput);
        if let Some(pk) = form.instance().and_then(|r| r.pk) {
            id_field.initial = Some(Value::Int(pk));
        }
        form.form_mut().push_field(id_field);

        if self.config.can_delete {
            form.form_mut().push_field(
                FormFieldDef::new(DELETION_FIELD, FormFieldType::Boolean)
                    .required(false)
                    .label("Delete"),
            );
        }
        form
    }

    /// Returns the formset prefix.
    pub fn prefix(&self) -> &str {
        &self.config.prefix
    }

    /// Returns the formset configuration.
    pub const fn config(&self) -> &InlineFormSetConfig {
        &self.config
    }

    /// Returns the forms.
    pub fn forms(&self) -> &[ModelForm] {
        &self.forms
    }

    /// Returns the number of forms bound to existing records.
    pub const fn initial_form_count(&self) -> usize {
        self.initial_count
    }

    /// Returns the total number of forms.
    pub fn total_form_count(&self) -> usize {
        self.forms.len()
    }

    /// Returns errors that belong to the formset rather than one form.
    pub fn non_form_errors(&self) -> &[String] {
        &self.non_form_errors
    }

    /// Returns `true` if the formset or any of its forms has errors.
    pub fn has_errors(&self) -> bool {
        !self.non_form_errors.is_empty() || self.forms.iter().any(|f| f.form().has_errors())
    }

    /// Renders the management form as hidden inputs.
    pub fn management_form_html(&self) -> String {
        [
            (TOTAL_FORMS, self.total_form_count()),
            (INITIAL_FORMS, self.initial_count),
            (MIN_NUM_FORMS, 0),
            (MAX_NUM_FORMS, self.config.max_num),
        ]
        .iter()
        .map(|(name, value)| {
            format!(
                r#"<input type="hidden" name="{prefix}-{name}" value="{value}" id="id_{prefix}-{name}" />"#,
                prefix = self.config.prefix
            )
        })
        .collect()
    }

    fn management_value(&self, data: &QueryDict, name: &str) -> Option<usize> {
        data.get(&format!("{}-{name}", self.config.prefix))
            .and_then(|v| v.trim().parse().ok())
    }

    /// Binds submitted data, rebuilding the forms from the management form.
    pub fn bind(&mut self, data: &QueryDict) {
        self.bound = true;
        self.non_form_errors.clear();

        let (Some(total), Some(initial)) = (
            self.management_value(data, TOTAL_FORMS),
            self.management_value(data, INITIAL_FORMS),
        ) else {
            self.forms.clear();
            self.initial_count = 0;
            self.non_form_errors
                .push("ManagementForm data is missing or has been tampered with.".to_string());
            return;
        };

        if total > self.config.max_num {
            self.non_form_errors.push(format!(
                "Please submit at most {} forms.",
                self.config.max_num
            ));
        }
        let total = total.min(self.config.max_num);
        self.initial_count = initial.min(total);

        let forms: Vec<ModelForm> = (0..total)
            .map(|i| {
                let instance = if i < self.initial_count {
                    data.get(&format!("{}-{i}-{ID_FIELD}", self.config.prefix))
                        .and_then(|raw| raw.trim().parse::<i64>().ok())
                        .and_then(|pk| self.existing.iter().find(|r| r.pk == Some(pk)).cloned())
                } else {
                    None
                };
                let mut form = self.make_form(i, instance);
                form.bind(data);
                form
            })
            .collect();
        self.forms = forms;
    }

    fn marked_for_deletion(&self, form: &ModelForm) -> bool {
        self.config.can_delete
            && form
                .form()
                .raw_value(DELETION_FIELD)
                .is_some_and(|v| matches!(v, "on" | "true" | "1"))
    }

    fn is_skipped(&self, index: usize, form: &ModelForm) -> bool {
        self.marked_for_deletion(form) || (index >= self.initial_count && !form.form().has_changed())
    }

    /// Validates every form that will be saved. Rows marked for deletion
    /// and unchanged extra rows are not validated.
    pub async fn is_valid(&mut self, validator: &dyn FormValidator) -> bool {
        if !self.bound {
            return false;
        }
        let skipped: Vec<bool> = self
            .forms
            .iter()
            .enumerate()
            .map(|(i, f)| self.is_skipped(i, f))
            .collect();
        let mut all_valid = true;
        for (form, skip) in self.forms.iter_mut().zip(skipped) {
            if !skip && !form.is_valid(validator).await {
                all_valid = false;
            }
        }
        all_valid && self.non_form_errors.is_empty()
    }

    /// Saves the rows against the parent `parent_pk`. Call only after a
    /// successful [`is_valid`](Self::is_valid).
    pub async fn save(&self, store: &dyn EntityStore, parent_pk: i64) -> CrudResult<()> {
        let meta = self.config.child.meta;
        for (i, form) in self.forms.iter().enumerate() {
            let existing_pk = form.instance().and_then(|r| r.pk);
            if self.marked_for_deletion(form) {
                if let Some(pk) = existing_pk {
                    store.delete(meta, pk).await?;
                    tracing::debug!(table = %meta.db_table, pk, "inline row deleted");
                }
                continue;
            }
            if self.is_skipped(i, form) {
                continue;
            }
            let mut record = form.construct_record();
            record.set(self.config.fk_name, Value::Int(parent_pk));
            if record.pk.is_some() {
                store.update(meta, &record).await?;
            } else {
                store.insert(meta, &record).await?;
            }
        }
        Ok(())
    }

    /// The template context: management form, per-row forms, column
    /// headers, an empty template row, and errors.
    pub fn as_context(&self) -> serde_json::Value {
        let empty_ctx = self
            .make_form(0, None)
            .with_prefix(format!("{}-__prefix__", self.config.prefix))
            .as_context();
        let headers: Vec<serde_json::Value> = empty_ctx["fields"]
            .as_array()
            .map(|fields| fields.iter().map(|f| f["label"].clone()).collect())
            .unwrap_or_default();
        json!({
            "prefix": self.config.prefix,
            "management_form": self.management_form_html(),
            "can_delete": self.config.can_delete,
            "headers": headers,
            "forms": self.forms.iter().map(ModelForm::as_context).collect::<Vec<_>>(),
            "empty_form": empty_ctx,
            "non_form_errors": self.non_form_errors,
            "has_errors": self.has_errors(),
        })
    }
}
