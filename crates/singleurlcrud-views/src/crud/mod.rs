//! The single-URL CRUD controller.
//!
//! A [`CrudView`] serves one resource at one URL. The `o` query parameter
//! selects the operation:
//!
//! | `o`               | GET                         | POST                         |
//! |-------------------|-----------------------------|------------------------------|
//! | absent / unknown  | list                        | redirect to the list         |
//! | `add`             | empty form                  | create                       |
//! | `edit`            | form for `item`             | update `item`                |
//! | `delete`          | confirmation for `item`     | delete `item`                |
//! | `delete_multiple` | confirmation for `items`    | delete `items`               |
//! | `action`          | list                        | run the action in `handler`  |
//!
//! Every disallowed operation, failed permission check, and missing entity
//! answers 404. Successful writes redirect to the canonical URL, the
//! request URL without `o` and `item`, with a one-shot message where one
//! applies.
//!
//! # Examples
//!
//! ```ignore
//! let config = CrudConfig::<Question>::builder()
//!     .list_display(&["question_text", "pub_date", "author"])
//!     .related_crud_url("author", "/polls/authors/")
//!     .formset(InlineFormSetConfig::new(Choice::meta(), "question"))
//!     .build()?;
//! let view = CrudView::new(config, store, renderer);
//! app.route("/polls/questions/", view.as_view());
//! ```

pub mod actions;
pub mod config;
mod context;
pub mod display;
pub mod operation;
pub mod permissions;
mod save;

use std::sync::Arc;

use async_trait::async_trait;

use singleurlcrud_core::utils::text::{escape, escapejs};
use singleurlcrud_core::{CrudError, CrudResult};
use singleurlcrud_db::store::{filter_pks, get_or_404};
use singleurlcrud_db::transactions::atomic;
use singleurlcrud_db::{Entity, EntityStore};
use singleurlcrud_http::url::{canonical_url_for, split_ids};
use singleurlcrud_http::{HttpRequest, HttpResponse, HttpResponseRedirect};

pub use actions::{
    Action, ActionDescriptor, ActionTarget, DeleteSelected, FnAction, ItemActionDescriptor,
    DELETE_SELECTED,
};
pub use config::{Breadcrumb, CrudConfig, CrudConfigBuilder, Media};
pub use display::{DisplayField, FieldResolver, Formatters, ValueFormatter};
pub use operation::Operation;
pub use permissions::{AllowAll, PermissionChecker, PermissionFn};
pub use save::FORMSET_ERROR;

use crate::messages::Message;
use crate::template::TemplateRenderer;
use crate::view::View;
use context::popup_param;
use save::SaveOutcome;

/// The CRUD controller for entity type `E`.
pub struct CrudView<E: Entity> {
    config: Arc<CrudConfig<E>>,
    store: Arc<dyn EntityStore>,
    renderer: Arc<dyn TemplateRenderer>,
}

impl<E: Entity> Clone for CrudView<E> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            store: Arc::clone(&self.store),
            renderer: Arc::clone(&self.renderer),
        }
    }
}

impl<E: Entity> CrudView<E> {
    pub fn new(
        config: CrudConfig<E>,
        store: Arc<dyn EntityStore>,
        renderer: Arc<dyn TemplateRenderer>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            renderer,
        }
    }

    pub fn config(&self) -> &CrudConfig<E> {
        &self.config
    }

    fn not_found(&self, detail: impl Into<String>) -> CrudError {
        CrudError::NotFound(format!("{}: {}", E::meta().model_name, detail.into()))
    }

    /// Fails with `NotFound` unless `allowed`.
    fn ensure(&self, allowed: bool, op: Operation) -> CrudResult<()> {
        if allowed {
            Ok(())
        } else {
            tracing::warn!(entity = E::meta().model_name, op = %op, "operation denied");
            Err(self.not_found(format!("{op} is not available")))
        }
    }

    /// Fetches the entity named by `item`.
    async fn target(&self, request: &HttpRequest) -> CrudResult<E> {
        let pk = request
            .get()
            .get("item")
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .ok_or_else(|| self.not_found("missing or invalid item"))?;
        get_or_404(self.store.as_ref(), pk).await
    }

    /// Fetches the entities named by a comma-separated id list, skipping
    /// malformed and missing ids.
    async fn selection(&self, raw: &str) -> CrudResult<Vec<E>> {
        let pks: Vec<i64> = split_ids(raw)
            .iter()
            .filter_map(|id| id.parse().ok())
            .collect();
        filter_pks(self.store.as_ref(), &pks).await
    }

    async fn items_param(&self, request: &HttpRequest) -> CrudResult<Vec<E>> {
        let raw = request
            .get()
            .get("items")
            .ok_or_else(|| self.not_found("missing items"))?;
        self.selection(raw).await
    }

    fn redirect_to_list(request: &HttpRequest) -> HttpResponse {
        HttpResponseRedirect::new(&canonical_url_for(request))
    }

    /// Redirects to the list with a message queued.
    fn redirect_with_message(&self, request: &HttpRequest, text: String) -> HttpResponse {
        let mut response = Self::redirect_to_list(request);
        self.config
            .messages
            .add(request, &mut response, Message::info(text));
        response
    }

    /// The script that closes a popup and hands the saved entity to the
    /// opener's select.
    fn popup_response(entity: &E) -> HttpResponse {
        let pk = entity.pk().map(|pk| pk.to_string()).unwrap_or_default();
        HttpResponse::ok(format!(
            r#"<script type="text/javascript">opener.dismissAddRelatedObjectPopup(window, "{}", "{}");</script>"#,
            escape(&pk),
            escapejs(&entity.display_title())
        ))
    }

    async fn handle_get(&self, request: &HttpRequest) -> CrudResult<HttpResponse> {
        let op = Operation::from_param(request.get().get("o"));
        tracing::debug!(entity = E::meta().model_name, op = %op, "GET");
        match op {
            Operation::List | Operation::CustomAction => self.render_list(request).await,
            Operation::Add => {
                self.ensure(self.config.can_add(request), op)?;
                let form = self.build_form(None).await?;
                let formset = self.build_formset(None).await?;
                self.render_edit(request, op, None, &form, formset.as_ref(), false)
            }
            Operation::Edit => {
                let entity = self.target(request).await?;
                self.ensure(self.config.can_edit(&entity, request), op)?;
                let form = self.build_form(Some(&entity)).await?;
                let formset = self.build_formset(entity.pk()).await?;
                self.render_edit(request, op, Some(&entity), &form, formset.as_ref(), false)
            }
            Operation::Delete => {
                let entity = self.target(request).await?;
                self.ensure(self.config.can_delete(&entity, request), op)?;
                self.render_delete(request, std::slice::from_ref(&entity))
            }
            Operation::DeleteMultiple => {
                self.ensure(self.config.can_delete_multiple(request), op)?;
                let mut entities = self.items_param(request).await?;
                entities.retain(|e| self.config.deletable_in_bulk(e));
                self.render_delete(request, &entities)
            }
        }
    }

    async fn handle_post(&self, request: &HttpRequest) -> CrudResult<HttpResponse> {
        let op = Operation::from_param(request.get().get("o"));
        tracing::debug!(entity = E::meta().model_name, op = %op, "POST");
        match op {
            Operation::Add => {
                self.ensure(self.config.can_add(request), op)?;
                self.post_form(request, op, None).await
            }
            Operation::Edit => {
                let entity = self.target(request).await?;
                self.ensure(self.config.can_edit(&entity, request), op)?;
                self.post_form(request, op, Some(entity)).await
            }
            Operation::Delete => self.post_delete(request).await,
            Operation::DeleteMultiple => self.post_delete_multiple(request).await,
            Operation::CustomAction => self.post_action(request).await,
            Operation::List => Ok(Self::redirect_to_list(request)),
        }
    }

    async fn post_form(
        &self,
        request: &HttpRequest,
        op: Operation,
        instance: Option<E>,
    ) -> CrudResult<HttpResponse> {
        match self.save_forms(request, instance.as_ref()).await? {
            SaveOutcome::Saved(entity) => {
                tracing::info!(
                    entity = E::meta().model_name,
                    pk = entity.pk(),
                    op = %op,
                    "saved"
                );
                if popup_param(request).is_some() {
                    return Ok(Self::popup_response(&entity));
                }
                if op == Operation::Edit {
                    let text = format!("{} details updated", self.item_title());
                    return Ok(self.redirect_with_message(request, text));
                }
                Ok(Self::redirect_to_list(request))
            }
            SaveOutcome::Invalid { form, formset } => self.render_edit(
                request,
                op,
                instance.as_ref(),
                &form,
                formset.as_ref(),
                true,
            ),
        }
    }

    async fn post_delete(&self, request: &HttpRequest) -> CrudResult<HttpResponse> {
        let entity = self.target(request).await?;
        self.ensure(self.config.can_delete(&entity, request), Operation::Delete)?;
        let pk = entity.pk().ok_or_else(|| self.not_found("unsaved entity"))?;
        atomic(self.store.as_ref(), |tx| async move { tx.delete(E::meta(), pk).await })
        .await?;
        tracing::info!(entity = E::meta().model_name, pk, "deleted");
        let text = format!("{} {} deleted", self.item_title(), entity.display_title());
        Ok(self.redirect_with_message(request, text))
    }

    async fn post_delete_multiple(&self, request: &HttpRequest) -> CrudResult<HttpResponse> {
        self.ensure(
            self.config.can_delete_multiple(request),
            Operation::DeleteMultiple,
        )?;
        let pks: Vec<i64> = self
            .items_param(request)
            .await?
            .iter()
            .filter(|e| self.config.deletable_in_bulk(e))
            .filter_map(Entity::pk)
            .collect();
        let deleted = atomic(self.store.as_ref(), |tx| async move {
            let mut deleted = 0usize;
            for pk in pks {
                if tx.delete(E::meta(), pk).await? {
                    deleted += 1;
                }
            }
            Ok(deleted)
        })
        .await?;
        tracing::info!(entity = E::meta().model_name, deleted, "bulk deleted");
        let text = format!("{deleted} {} deleted", self.items_title());
        Ok(self.redirect_with_message(request, text))
    }

    async fn post_action(&self, request: &HttpRequest) -> CrudResult<HttpResponse> {
        let handler = request.post().get("handler").unwrap_or_default();
        let store = self.store.as_ref();

        if request.get().get("item").is_some() {
            let entity = self.target(request).await?;
            let Some(descriptor) = self.config.item_actions.iter().find(|a| a.key == handler)
            else {
                tracing::debug!(handler, "unknown item action");
                return Ok(Self::redirect_to_list(request));
            };
            tracing::info!(entity = E::meta().model_name, pk = entity.pk(), key = handler, "item action");
            let response = descriptor
                .action
                .invoke(ActionTarget::Item(entity), request, store)
                .await?;
            return Ok(response.unwrap_or_else(|| Self::redirect_to_list(request)));
        }

        let ids = request.post().get_first("ids").unwrap_or_default();
        if split_ids(ids).is_empty() {
            tracing::debug!(handler, "bulk action without a selection");
            return Ok(Self::redirect_to_list(request));
        }
        let Some(descriptor) = self.config.actions.iter().find(|a| a.handler == handler) else {
            tracing::debug!(handler, "unknown bulk action");
            return Ok(Self::redirect_to_list(request));
        };
        let entities = self.selection(ids).await?;
        tracing::info!(
            entity = E::meta().model_name,
            handler,
            selected = entities.len(),
            "bulk action"
        );
        let response = descriptor
            .action
            .invoke(ActionTarget::Selection(entities), request, store)
            .await?;
        Ok(response.unwrap_or_else(|| Self::redirect_to_list(request)))
    }

    /// Turns a handler result into a response, logging failures.
    fn respond(request: &HttpRequest, result: CrudResult<HttpResponse>) -> HttpResponse {
        match result {
            Ok(response) => response,
            Err(err) => {
                if err.status_code() >= 500 {
                    tracing::error!(path = request.path(), error = %err, "request failed");
                } else {
                    tracing::warn!(path = request.path(), error = %err, "request rejected");
                }
                HttpResponse::from_error(&err)
            }
        }
    }
}

#[async_trait]
impl<E: Entity> View for CrudView<E> {
    async fn get(&self, request: HttpRequest) -> HttpResponse {
        Self::respond(&request, self.handle_get(&request).await)
    }

    async fn post(&self, request: HttpRequest) -> HttpResponse {
        Self::respond(&request, self.handle_post(&request).await)
    }
}
