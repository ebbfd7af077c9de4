//! Bulk actions and per-item actions.
//!
//! Both kinds are declared once on the controller configuration. A bulk
//! action is picked by its `handler` id from the list page's action menu
//! and receives the selected entities; an item action is picked by its
//! `key` from a row's buttons and receives that row's entity. Either may
//! return a response, which is sent as-is; otherwise the controller
//! redirects back to the list.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use singleurlcrud_core::CrudResult;
use singleurlcrud_db::{Entity, EntityStore};
use singleurlcrud_http::url::{canonical_url_for, with_params};
use singleurlcrud_http::{HttpRequest, HttpResponse, HttpResponseRedirect};

/// Handler id of the built-in bulk delete action.
pub const DELETE_SELECTED: &str = "delete_selected";

/// What an action operates on.
#[derive(Debug, Clone)]
pub enum ActionTarget<E> {
    /// One entity, from an item action.
    Item(E),
    /// The entities selected on the list page, from a bulk action.
    Selection(Vec<E>),
}

impl<E: Entity> ActionTarget<E> {
    /// The targeted entities.
    pub fn entities(&self) -> &[E] {
        match self {
            Self::Item(entity) => std::slice::from_ref(entity),
            Self::Selection(entities) => entities,
        }
    }
}

/// A custom operation invoked from the list page.
#[async_trait]
pub trait Action<E: Entity>: Send + Sync {
    /// Runs the action. `Some(response)` is returned to the client
    /// verbatim; `None` redirects to the list.
    async fn invoke(
        &self,
        target: ActionTarget<E>,
        request: &HttpRequest,
        store: &dyn EntityStore,
    ) -> CrudResult<Option<HttpResponse>>;
}

/// Adapts a synchronous closure into an [`Action`].
pub struct FnAction<F>(pub F);

#[async_trait]
impl<E, F> Action<E> for FnAction<F>
where
    E: Entity,
    F: Fn(ActionTarget<E>, &HttpRequest) -> CrudResult<Option<HttpResponse>> + Send + Sync,
{
    async fn invoke(
        &self,
        target: ActionTarget<E>,
        request: &HttpRequest,
        _store: &dyn EntityStore,
    ) -> CrudResult<Option<HttpResponse>> {
        (self.0)(target, request)
    }
}

/// The built-in bulk delete: redirects to the confirmation page for the
/// selected items.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeleteSelected;

#[async_trait]
impl<E: Entity> Action<E> for DeleteSelected {
    async fn invoke(
        &self,
        target: ActionTarget<E>,
        request: &HttpRequest,
        _store: &dyn EntityStore,
    ) -> CrudResult<Option<HttpResponse>> {
        let ids = target
            .entities()
            .iter()
            .filter_map(Entity::pk)
            .map(|pk| pk.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let url = with_params(
            &canonical_url_for(request),
            &[("o", "delete_multiple"), ("items", &ids)],
        );
        Ok(Some(HttpResponseRedirect::new(&url)))
    }
}

/// A bulk action shown in the list page's action menu.
pub struct ActionDescriptor<E> {
    pub label: String,
    pub handler: String,
    pub action: Arc<dyn Action<E>>,
}

impl<E> Clone for ActionDescriptor<E> {
    fn clone(&self) -> Self {
        Self {
            label: self.label.clone(),
            handler: self.handler.clone(),
            action: Arc::clone(&self.action),
        }
    }
}

impl<E> fmt::Debug for ActionDescriptor<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionDescriptor")
            .field("label", &self.label)
            .field("handler", &self.handler)
            .finish_non_exhaustive()
    }
}

impl<E: Entity> ActionDescriptor<E> {
    pub fn new(
        label: impl Into<String>,
        handler: impl Into<String>,
        action: impl Action<E> + 'static,
    ) -> Self {
        Self {
            label: label.into(),
            handler: handler.into(),
            action: Arc::new(action),
        }
    }

    /// The injected "Delete" entry.
    pub fn delete_selected() -> Self {
        Self::new("Delete", DELETE_SELECTED, DeleteSelected)
    }

    pub fn as_context(&self) -> serde_json::Value {
        json!({ "label": self.label, "handler": self.handler })
    }
}

/// A button shown on every list row.
pub struct ItemActionDescriptor<E> {
    pub title: String,
    pub key: String,
    /// CSS classes of the button icon.
    pub css: String,
    pub action: Arc<dyn Action<E>>,
}

impl<E> Clone for ItemActionDescriptor<E> {
    fn clone(&self) -> Self {
        Self {
            title: self.title.clone(),
            key: self.key.clone(),
            css: self.css.clone(),
            action: Arc::clone(&self.action),
        }
    }
}

impl<E> fmt::Debug for ItemActionDescriptor<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemActionDescriptor")
            .field("title", &self.title)
            .field("key", &self.key)
            .field("css", &self.css)
            .finish_non_exhaustive()
    }
}

impl<E: Entity> ItemActionDescriptor<E> {
    pub fn new(
        title: impl Into<String>,
        key: impl Into<String>,
        css: impl Into<String>,
        action: impl Action<E> + 'static,
    ) -> Self {
        Self {
            title: title.into(),
            key: key.into(),
            css: css.into(),
            action: Arc::new(action),
        }
    }

    pub fn as_context(&self) -> serde_json::Value {
        json!({ "title": self.title, "key": self.key, "css": self.css })
    }
}
