//! Template contexts for the list, edit, and delete pages.

use serde_json::{json, Map, Value as Json};

use singleurlcrud_core::utils::text::title;
use singleurlcrud_core::CrudResult;
use singleurlcrud_db::store::list_page;
use singleurlcrud_db::Entity;
use singleurlcrud_forms::{InlineFormSet, ModelForm};
use singleurlcrud_http::url::{canonical_url_for, strip_params, with_params};
use singleurlcrud_http::{HttpRequest, HttpResponse};

use super::display::RelatedTitles;
use super::operation::Operation;
use super::CrudView;
use crate::pagination::{PageRequest, PageWindow};
use crate::template::{DELETE_TEMPLATE, EDIT_TEMPLATE, LIST_TEMPLATE};

/// Query parameters dropped from page links besides the operation ones.
const PAGE_LINK_STRIP: [&str; 3] = ["o", "item", "page"];

/// Returns the `_popup` marker from the query or the body.
pub(crate) fn popup_param(request: &HttpRequest) -> Option<&str> {
    request
        .get()
        .get("_popup")
        .or_else(|| request.post().get("_popup"))
}

impl<E: Entity> CrudView<E> {
    /// The entity's verbose name in title case, e.g. "Question".
    pub(crate) fn item_title(&self) -> String {
        title(&E::meta().verbose_name)
    }

    /// The plural verbose name in title case, e.g. "Questions".
    pub(crate) fn items_title(&self) -> String {
        title(&E::meta().verbose_name_plural)
    }

    fn add_url(&self, canonical: &str) -> String {
        self.config
            .add_item_custom_url
            .clone()
            .unwrap_or_else(|| with_params(canonical, &[("o", "add")]))
    }

    fn item_url(&self, canonical: &str, custom: Option<&String>, op: Operation, pk: &str) -> String {
        match custom {
            Some(url) => with_params(url, &[("item", pk)]),
            None => with_params(canonical, &[("o", op.as_param().unwrap_or_default()), ("item", pk)]),
        }
    }

    /// Keys every page shares. `pagetitle` is set per page.
    fn base_context(&self, request: &HttpRequest, pagetitle: String) -> Map<String, Json> {
        let canonical = canonical_url_for(request);
        let config = &self.config;
        let mut ctx = Map::new();
        ctx.insert("pagetitle".into(), json!(pagetitle));
        ctx.insert("item_name".into(), json!(self.item_title()));
        ctx.insert("breadcrumbs".into(), json!(config.breadcrumbs));
        ctx.insert("media".into(), json!(config.media));
        ctx.insert("enable_create".into(), json!(config.can_add(request)));
        ctx.insert("enable_edit".into(), json!(config.enable_edit));
        ctx.insert("enable_delete".into(), json!(config.enable_delete));
        ctx.insert("popup".into(), json!(popup_param(request)));
        ctx.insert("messages".into(), json!([]));
        ctx.insert("add_url".into(), json!(self.add_url(&canonical)));
        ctx.insert(
            "action_url".into(),
            json!(with_params(&canonical, &[("o", "action")])),
        );
        ctx.insert("canonical_url".into(), json!(canonical));
        ctx
    }

    /// Renders the list page, draining queued messages.
    pub(crate) async fn render_list(&self, request: &HttpRequest) -> CrudResult<HttpResponse> {
        let config = &self.config;
        let page_request = PageRequest::from_param(request.get().get("page"))
            .map_err(|e| self.not_found(e.to_string()))?;
        let store = self.store.as_ref();
        let count = store.count(E::meta()).await?;
        let window = PageWindow::resolve(count, config.paginate_by, page_request)
            .map_err(|e| self.not_found(e.to_string()))?;
        let page = window.fill(list_page::<E>(store, window.offset, window.limit).await?);
        let related =
            RelatedTitles::prefetch(store, &config.display_fields, page.object_list()).await?;

        let canonical = canonical_url_for(request);
        let rows: Vec<Json> = page
            .object_list()
            .iter()
            .map(|entity| {
                let pk = entity.pk().map(|pk| pk.to_string()).unwrap_or_default();
                let values: Vec<String> = config
                    .display_fields
                    .iter()
                    .map(|field| field.render(entity, &related, &config.formatters))
                    .collect();
                json!({
                    "pk": pk,
                    "title": entity.display_title(),
                    "values": values,
                    "editable": config.can_edit(entity, request),
                    "deletable": config.can_delete(entity, request),
                    "edit_url": self.item_url(&canonical, config.edit_item_custom_url.as_ref(), Operation::Edit, &pk),
                    "delete_url": self.item_url(&canonical, config.delete_item_custom_url.as_ref(), Operation::Delete, &pk),
                    "action_url": with_params(&canonical, &[("o", "action"), ("item", &pk)]),
                })
            })
            .collect();

        let page_base = strip_params(request.path(), request.query_string(), &PAGE_LINK_STRIP);
        let page_url = |n: usize| with_params(&page_base, &[("page", &n.to_string())]);
        let item_title = self.item_title();

        let mut ctx = self.base_context(request, config.pagetitle.clone());
        ctx.insert(
            "list_display".into(),
            Json::Array(
                config
                    .display_fields
                    .iter()
                    .map(|f| json!({ "name": f.name, "label": f.label }))
                    .collect(),
            ),
        );
        ctx.insert("rows".into(), Json::Array(rows));
        ctx.insert(
            "actions".into(),
            Json::Array(config.actions.iter().map(|a| a.as_context()).collect()),
        );
        ctx.insert(
            "itemactions".into(),
            Json::Array(config.item_actions.iter().map(|a| a.as_context()).collect()),
        );
        ctx.insert("add_item_custom_url".into(), json!(config.add_item_custom_url));
        ctx.insert("edit_item_custom_url".into(), json!(config.edit_item_custom_url));
        ctx.insert("delete_item_custom_url".into(), json!(config.delete_item_custom_url));
        ctx.insert(
            "delete_msg".into(),
            json!(format!("Are you sure you want to delete the {item_title}: {{1}}")),
        );
        ctx.insert(
            "create_button_text".into(),
            json!(format!("Create new {item_title}")),
        );
        ctx.insert("create_disallowed_msg".into(), json!(config.create_disallowed_msg));
        ctx.insert(
            "is_paginated".into(),
            json!(page_request != PageRequest::All && page.has_other_pages()),
        );
        ctx.insert("page_obj".into(), page.as_context(page_url));
        ctx.insert(
            "all_url".into(),
            json!(with_params(&page_base, &[("page", "all")])),
        );

        let messages = config.messages.read(request);
        ctx.insert("messages".into(), json!(messages));

        let mut response = self.render(LIST_TEMPLATE, &Json::Object(ctx))?;
        config.messages.clear(request, &mut response);
        Ok(response)
    }

    /// Renders the add/edit page for `form` and the optional formset.
    pub(crate) fn render_edit(
        &self,
        request: &HttpRequest,
        op: Operation,
        object: Option<&E>,
        form: &ModelForm,
        formset: Option<&InlineFormSet>,
        has_errors: bool,
    ) -> CrudResult<HttpResponse> {
        let item_title = self.item_title();
        let pagetitle = match op {
            Operation::Edit => format!("Edit {item_title}"),
            _ => format!("Create new {item_title}"),
        };
        let mut ctx = self.base_context(request, pagetitle);
        ctx.insert(op.to_string(), json!(true));
        ctx.insert("form".into(), form.as_context());
        ctx.insert(
            "formset".into(),
            formset.map_or(Json::Null, InlineFormSet::as_context),
        );
        ctx.insert(
            "object".into(),
            object.map_or(Json::Null, |e| {
                json!({ "pk": e.pk(), "title": e.display_title() })
            }),
        );
        ctx.insert("form_haserrors".into(), json!(has_errors));
        ctx.insert("form_action".into(), json!(request.get_full_path()));
        self.render(EDIT_TEMPLATE, &Json::Object(ctx))
    }

    /// Renders the delete confirmation for one or more entities.
    pub(crate) fn render_delete(
        &self,
        request: &HttpRequest,
        objects: &[E],
    ) -> CrudResult<HttpResponse> {
        let item_title = self.item_title();
        let titles: Vec<String> = objects.iter().map(Entity::display_title).collect();
        let delete_msg = if objects.len() == 1 {
            format!("Are you sure you want to delete the {item_title}: {}", titles.join(""))
        } else {
            format!(
                "Are you sure you want to delete the {}: {}",
                self.items_title(),
                titles.join(", ")
            )
        };
        let mut ctx = self.base_context(request, format!("Delete {item_title}"));
        ctx.insert(
            "objects".into(),
            Json::Array(
                objects
                    .iter()
                    .zip(&titles)
                    .map(|(e, t)| json!({ "pk": e.pk(), "title": t }))
                    .collect(),
            ),
        );
        ctx.insert("delete_msg".into(), json!(delete_msg));
        ctx.insert("form_action".into(), json!(request.get_full_path()));
        self.render(DELETE_TEMPLATE, &Json::Object(ctx))
    }

    fn render(&self, template: &str, context: &Json) -> CrudResult<HttpResponse> {
        let body = self.renderer.render(template, context)?;
        let mut response = HttpResponse::ok(body);
        response.set_content_type(self.renderer.content_type());
        Ok(response)
    }
}
