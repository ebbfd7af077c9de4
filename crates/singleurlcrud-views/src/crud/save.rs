//! Binding, validating, and transactionally saving the add/edit form.
//!
//! The parent form is validated first. When it is valid, one transaction
//! saves the parent, then validates and saves the inline formset against
//! the parent's key; an invalid formset rolls the parent back. Validation
//! and integrity failures come back as form errors, anything else as an
//! error.

use singleurlcrud_core::{CrudError, CrudResult};
use singleurlcrud_db::transactions::atomic;
use singleurlcrud_db::Entity;
use singleurlcrud_forms::{InlineFormSet, ModelForm, SchemaValidator};
use singleurlcrud_http::HttpRequest;

use super::CrudView;

/// Non-field error shown when inline rows fail validation.
pub const FORMSET_ERROR: &str = "Some rows have errors. Please correct them.";

/// The result of processing a submitted add/edit form.
pub(crate) enum SaveOutcome<E> {
    Saved(E),
    Invalid {
        form: ModelForm,
        formset: Option<InlineFormSet>,
    },
}

impl<E: Entity> CrudView<E> {
    /// Builds the add/edit form, unbound, wrapping linked foreign keys.
    pub(crate) async fn build_form(&self, instance: Option<&E>) -> CrudResult<ModelForm> {
        let mut form = ModelForm::build(
            self.store.as_ref(),
            &self.config.form_config,
            instance.map(Entity::to_record),
        )
        .await?;
        for (field, url) in &self.config.related_crud_urls {
            form.wrap_related(field, url);
        }
        Ok(form)
    }

    /// Builds the inline formset, if one is configured.
    pub(crate) async fn build_formset(
        &self,
        parent_pk: Option<i64>,
    ) -> CrudResult<Option<InlineFormSet>> {
        match &self.config.formset {
            Some(config) => Ok(Some(
                InlineFormSet::build(self.store.as_ref(), config.clone(), parent_pk).await?,
            )),
            None => Ok(None),
        }
    }

    /// Binds the request body and saves `instance` (or a new entity).
    pub(crate) async fn save_forms(
        &self,
        request: &HttpRequest,
        instance: Option<&E>,
    ) -> CrudResult<SaveOutcome<E>> {
        let data = request.post();
        let mut form = self.build_form(instance).await?;
        form.bind(data);
        let mut formset = self.build_formset(instance.and_then(Entity::pk)).await?;
        if let Some(fs) = formset.as_mut() {
            fs.bind(data);
        }

        if !form.is_valid(self.config.validator.as_ref()).await {
            if let Some(fs) = formset.as_mut() {
                fs.is_valid(&SchemaValidator).await;
            }
            tracing::debug!(entity = E::meta().model_name, "form did not validate");
            return Ok(SaveOutcome::Invalid { form, formset });
        }

        let record = form.construct_record();
        let rows = formset.as_mut();
        let result = atomic(self.store.as_ref(), |tx| {
            let record = record.clone();
            async move {
                let pk = match record.pk {
                    Some(pk) => {
                        tx.update(E::meta(), &record).await?;
                        pk
                    }
                    None => tx.insert(E::meta(), &record).await?,
                };
                if let Some(fs) = rows {
                    if !fs.is_valid(&SchemaValidator).await {
                        return Err(CrudError::ValidationFailed(FORMSET_ERROR.to_string()));
                    }
                    fs.save(&*tx, pk).await?;
                }
                Ok(pk)
            }
        })
        .await;

        match result {
            Ok(pk) => {
                let mut saved = record;
                saved.pk = Some(pk);
                Ok(SaveOutcome::Saved(E::from_record(&saved)?))
            }
            Err(CrudError::ValidationFailed(msg) | CrudError::IntegrityError(msg)) => {
                tracing::warn!(entity = E::meta().model_name, error = %msg, "save rolled back");
                form.form_mut().add_error(None, msg);
                Ok(SaveOutcome::Invalid { form, formset })
            }
            Err(err) => Err(err),
        }
    }
}
