//! Immutable per-controller configuration and its builder.
//!
//! Everything that can be checked without a request is checked in
//! [`CrudConfigBuilder::build`]: display fields resolve, labels name
//! displayed columns, related-widget links point at foreign keys, the
//! inline formset's foreign key targets the entity, and action ids are
//! unique.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;

use singleurlcrud_core::utils::text::capfirst;
use singleurlcrud_core::{CrudError, CrudResult, Settings, SETTINGS};
use singleurlcrud_db::{Accessor, Entity, ValueKind};
use singleurlcrud_forms::{
    FormValidator, InlineFormSetConfig, ModelFormConfig, ModelFormFields, SchemaValidator,
};
use singleurlcrud_http::HttpRequest;

use super::actions::{ActionDescriptor, ItemActionDescriptor};
use super::display::{DisplayField, Formatters, ValueFormatter};
use super::operation::Operation;
use super::permissions::{AllowAll, PermissionChecker};
use crate::messages::MessageCookie;

/// Shown instead of the create button when creation is disabled.
pub const DEFAULT_CREATE_DISALLOWED_MSG: &str = "New items cannot be created here.";

/// One breadcrumb; the last usually has no link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Breadcrumb {
    pub text: String,
    pub url: Option<String>,
}

impl Breadcrumb {
    pub fn new(text: impl Into<String>, url: Option<&str>) -> Self {
        Self {
            text: text.into(),
            url: url.map(String::from),
        }
    }
}

/// Script and stylesheet URLs a controller's pages include.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Media {
    pub js: Vec<String>,
    pub css: Vec<String>,
}

impl Media {
    /// The assets every controller page needs, under `static_url`.
    pub fn defaults(static_url: &str) -> Self {
        Self::default()
            .js(static_url, "singleurlcrud/js/crud-controller.js")
            .js(static_url, "admin/js/admin/RelatedObjectLookups.js")
            .css(static_url, "singleurlcrud/css/crud.css")
    }

    /// Adds a script; relative paths are placed under `static_url`.
    #[must_use]
    pub fn js(mut self, static_url: &str, path: &str) -> Self {
        self.js.push(static_path(static_url, path));
        self
    }

    /// Adds a stylesheet; relative paths are placed under `static_url`.
    #[must_use]
    pub fn css(mut self, static_url: &str, path: &str) -> Self {
        self.css.push(static_path(static_url, path));
        self
    }
}

fn static_path(static_url: &str, path: &str) -> String {
    if path.starts_with('/') || path.contains("://") {
        path.to_string()
    } else {
        format!("{}/{path}", static_url.trim_end_matches('/'))
    }
}

/// The resolved configuration of one [`CrudView`](super::CrudView).
pub struct CrudConfig<E: Entity> {
    pub(crate) display_fields: Vec<DisplayField<E>>,
    pub(crate) pagetitle: String,
    pub(crate) breadcrumbs: Vec<Breadcrumb>,
    pub(crate) enable_create: bool,
    pub(crate) enable_edit: bool,
    pub(crate) enable_delete: bool,
    pub(crate) enable_delete_multiple: bool,
    pub(crate) item_editable: fn(&E) -> bool,
    pub(crate) item_deletable: fn(&E) -> bool,
    pub(crate) actions: Vec<ActionDescriptor<E>>,
    pub(crate) item_actions: Vec<ItemActionDescriptor<E>>,
    pub(crate) permissions: Arc<dyn PermissionChecker<E>>,
    pub(crate) form_config: ModelFormConfig,
    pub(crate) validator: Arc<dyn FormValidator>,
    pub(crate) formset: Option<InlineFormSetConfig>,
    pub(crate) related_crud_urls: Vec<(String, String)>,
    pub(crate) formatters: Formatters,
    pub(crate) add_item_custom_url: Option<String>,
    pub(crate) edit_item_custom_url: Option<String>,
    pub(crate) delete_item_custom_url: Option<String>,
    pub(crate) media: Media,
    pub(crate) paginate_by: usize,
    pub(crate) messages: MessageCookie,
    pub(crate) create_disallowed_msg: String,
}

impl<E: Entity> std::fmt::Debug for CrudConfig<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrudConfig")
            .field("entity", &E::meta().model_name)
            .field("display_fields", &self.display_fields)
            .field("actions", &self.actions)
            .field("item_actions", &self.item_actions)
            .field("paginate_by", &self.paginate_by)
            .finish_non_exhaustive()
    }
}

impl<E: Entity> CrudConfig<E> {
    /// Starts a configuration for `E`.
    pub fn builder() -> CrudConfigBuilder<E> {
        CrudConfigBuilder::new()
    }

    pub fn display_fields(&self) -> &[DisplayField<E>] {
        &self.display_fields
    }

    /// Bulk actions, the injected delete action last.
    pub fn actions(&self) -> &[ActionDescriptor<E>] {
        &self.actions
    }

    pub fn item_actions(&self) -> &[ItemActionDescriptor<E>] {
        &self.item_actions
    }

    pub fn pagetitle(&self) -> &str {
        &self.pagetitle
    }

    pub fn breadcrumbs(&self) -> &[Breadcrumb] {
        &self.breadcrumbs
    }

    pub fn media(&self) -> &Media {
        &self.media
    }

    pub const fn paginate_by(&self) -> usize {
        self.paginate_by
    }

    pub const fn form_config(&self) -> &ModelFormConfig {
        &self.form_config
    }

    pub const fn formset(&self) -> Option<&InlineFormSetConfig> {
        self.formset.as_ref()
    }

    fn permitted(&self, op: Operation, entity: Option<&E>, request: &HttpRequest) -> bool {
        self.permissions.check_permission(op, entity, request)
    }

    pub(crate) fn can_add(&self, request: &HttpRequest) -> bool {
        self.enable_create && self.permitted(Operation::Add, None, request)
    }

    pub(crate) fn can_edit(&self, entity: &E, request: &HttpRequest) -> bool {
        self.enable_edit
            && (self.item_editable)(entity)
            && !entity.is_readonly()
            && self.permitted(Operation::Edit, Some(entity), request)
    }

    pub(crate) fn can_delete(&self, entity: &E, request: &HttpRequest) -> bool {
        self.enable_delete
            && self.deletable_in_bulk(entity)
            && self.permitted(Operation::Delete, Some(entity), request)
    }

    pub(crate) fn can_delete_multiple(&self, request: &HttpRequest) -> bool {
        self.enable_delete
            && self.enable_delete_multiple
            && self.permitted(Operation::DeleteMultiple, None, request)
    }

    /// Whether a bulk delete may remove `entity`.
    pub(crate) fn deletable_in_bulk(&self, entity: &E) -> bool {
        (self.item_deletable)(entity) && !entity.is_readonly()
    }
}

/// Builder for [`CrudConfig`].
pub struct CrudConfigBuilder<E: Entity> {
    list_display: Vec<String>,
    labels: HashMap<String, String>,
    controller_accessors: Vec<Accessor<E>>,
    pagetitle: Option<String>,
    breadcrumbs: Option<Vec<Breadcrumb>>,
    enable_create: bool,
    enable_edit: bool,
    enable_delete: bool,
    enable_delete_multiple: bool,
    item_editable: fn(&E) -> bool,
    item_deletable: fn(&E) -> bool,
    actions: Vec<ActionDescriptor<E>>,
    item_actions: Vec<ItemActionDescriptor<E>>,
    permissions: Arc<dyn PermissionChecker<E>>,
    form_fields: Option<ModelFormFields>,
    form_config: Option<ModelFormConfig>,
    validator: Arc<dyn FormValidator>,
    formset: Option<InlineFormSetConfig>,
    related_crud_urls: Vec<(String, String)>,
    formatters: Vec<(ValueKind, ValueFormatter)>,
    add_item_custom_url: Option<String>,
    edit_item_custom_url: Option<String>,
    delete_item_custom_url: Option<String>,
    media: Option<Media>,
    paginate_by: Option<usize>,
    create_disallowed_msg: Option<String>,
    settings: Option<Settings>,
}

const fn always<E>(_: &E) -> bool {
    true
}

impl<E: Entity> Default for CrudConfigBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> CrudConfigBuilder<E> {
    pub fn new() -> Self {
        Self {
            list_display: Vec::new(),
            labels: HashMap::new(),
            controller_accessors: Vec::new(),
            pagetitle: None,
            breadcrumbs: None,
            enable_create: true,
            enable_edit: true,
            enable_delete: true,
            enable_delete_multiple: true,
            item_editable: always::<E>,
            item_deletable: always::<E>,
            actions: Vec::new(),
            item_actions: Vec::new(),
            permissions: Arc::new(AllowAll),
            form_fields: None,
            form_config: None,
            validator: Arc::new(SchemaValidator),
            formset: None,
            related_crud_urls: Vec::new(),
            formatters: Vec::new(),
            add_item_custom_url: None,
            edit_item_custom_url: None,
            delete_item_custom_url: None,
            media: None,
            paginate_by: None,
            create_disallowed_msg: None,
            settings: None,
        }
    }

    /// Sets the list columns, in order.
    #[must_use]
    pub fn list_display(mut self, names: &[&str]) -> Self {
        self.list_display = names.iter().map(ToString::to_string).collect();
        self
    }

    /// Overrides the heading of a displayed column.
    #[must_use]
    pub fn label(mut self, name: impl Into<String>, label: impl Into<String>) -> Self {
        self.labels.insert(name.into(), label.into());
        self
    }

    /// Registers a controller accessor usable as a column.
    #[must_use]
    pub fn accessor(mut self, accessor: Accessor<E>) -> Self {
        self.controller_accessors.push(accessor);
        self
    }

    #[must_use]
    pub fn pagetitle(mut self, title: impl Into<String>) -> Self {
        self.pagetitle = Some(title.into());
        self
    }

    #[must_use]
    pub fn breadcrumbs(mut self, breadcrumbs: Vec<Breadcrumb>) -> Self {
        self.breadcrumbs = Some(breadcrumbs);
        self
    }

    #[must_use]
    pub const fn enable_create(mut self, enabled: bool) -> Self {
        self.enable_create = enabled;
        self
    }

    #[must_use]
    pub const fn enable_edit(mut self, enabled: bool) -> Self {
        self.enable_edit = enabled;
        self
    }

    #[must_use]
    pub const fn enable_delete(mut self, enabled: bool) -> Self {
        self.enable_delete = enabled;
        self
    }

    /// Enables the bulk delete action. It also requires `enable_delete`.
    #[must_use]
    pub const fn enable_delete_multiple(mut self, enabled: bool) -> Self {
        self.enable_delete_multiple = enabled;
        self
    }

    /// Per-item edit predicate.
    #[must_use]
    pub fn item_editable(mut self, predicate: fn(&E) -> bool) -> Self {
        self.item_editable = predicate;
        self
    }

    /// Per-item delete predicate.
    #[must_use]
    pub fn item_deletable(mut self, predicate: fn(&E) -> bool) -> Self {
        self.item_deletable = predicate;
        self
    }

    #[must_use]
    pub fn action(mut self, action: ActionDescriptor<E>) -> Self {
        self.actions.push(action);
        self
    }

    #[must_use]
    pub fn item_action(mut self, action: ItemActionDescriptor<E>) -> Self {
        self.item_actions.push(action);
        self
    }

    #[must_use]
    pub fn permissions(mut self, checker: impl PermissionChecker<E> + 'static) -> Self {
        self.permissions = Arc::new(checker);
        self
    }

    /// Which schema fields the add/edit form includes. Defaults to the
    /// schema fields among the list columns.
    #[must_use]
    pub fn form_fields(mut self, fields: ModelFormFields) -> Self {
        self.form_fields = Some(fields);
        self
    }

    /// Replaces the whole form configuration.
    #[must_use]
    pub fn form_config(mut self, config: ModelFormConfig) -> Self {
        self.form_config = Some(config);
        self
    }

    #[must_use]
    pub fn validator(mut self, validator: impl FormValidator + 'static) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    /// Edits child rows inline on the add/edit page.
    #[must_use]
    pub fn formset(mut self, formset: InlineFormSetConfig) -> Self {
        self.formset = Some(formset);
        self
    }

    /// Links a foreign-key field to the controller managing its target,
    /// enabling the "add another" popup next to its select.
    #[must_use]
    pub fn related_crud_url(mut self, field: impl Into<String>, url: impl Into<String>) -> Self {
        self.related_crud_urls.push((field.into(), url.into()));
        self
    }

    /// Registers a list cell formatter for a value kind.
    #[must_use]
    pub fn formatter(mut self, kind: ValueKind, formatter: ValueFormatter) -> Self {
        self.formatters.push((kind, formatter));
        self
    }

    #[must_use]
    pub fn add_item_custom_url(mut self, url: impl Into<String>) -> Self {
        self.add_item_custom_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn edit_item_custom_url(mut self, url: impl Into<String>) -> Self {
        self.edit_item_custom_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn delete_item_custom_url(mut self, url: impl Into<String>) -> Self {
        self.delete_item_custom_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn media(mut self, media: Media) -> Self {
        self.media = Some(media);
        self
    }

    #[must_use]
    pub const fn paginate_by(mut self, per_page: usize) -> Self {
        self.paginate_by = Some(per_page);
        self
    }

    #[must_use]
    pub fn create_disallowed_msg(mut self, msg: impl Into<String>) -> Self {
        self.create_disallowed_msg = Some(msg.into());
        self
    }

    /// Uses explicit settings instead of the process-wide ones.
    #[must_use]
    pub fn settings(mut self, settings: &Settings) -> Self {
        self.settings = Some(settings.clone());
        self
    }

    /// Resolves and checks the configuration.
    pub fn build(self) -> CrudResult<CrudConfig<E>> {
        let meta = E::meta();
        let settings = self.settings.unwrap_or_else(|| SETTINGS.get().clone());

        if self.list_display.is_empty() {
            return Err(CrudError::ConfigurationError(format!(
                "list_display for {} names no fields",
                meta.model_name
            )));
        }
        if let Some(name) = self.labels.keys().find(|n| !self.list_display.contains(*n)) {
            return Err(CrudError::ConfigurationError(format!(
                "label given for '{name}', which is not in list_display"
            )));
        }
        let display_fields = self
            .list_display
            .iter()
            .map(|name| {
                DisplayField::resolve(
                    name,
                    self.labels.get(name).map(String::as_str),
                    &self.controller_accessors,
                )
            })
            .collect::<CrudResult<Vec<_>>>()?;

        let form_config = self.form_config.unwrap_or_else(|| {
            let fields = self.form_fields.unwrap_or_else(|| {
                let schema: Vec<String> = display_fields
                    .iter()
                    .filter_map(DisplayField::schema_field)
                    .map(|f| f.name.to_string())
                    .collect();
                if schema.is_empty() {
                    ModelFormFields::All
                } else {
                    ModelFormFields::Include(schema)
                }
            });
            ModelFormConfig::new(meta).with_fields(fields)
        });

        for (field, _) in &self.related_crud_urls {
            let is_fk = form_config
                .schema_fields()
                .any(|f| f.name == field && f.field_type.is_relation());
            if !is_fk {
                return Err(CrudError::ConfigurationError(format!(
                    "related_crud_url given for '{field}', which is not a foreign key on the {} form",
                    meta.model_name
                )));
            }
        }
        if let Some(formset) = &self.formset {
            formset.check(meta)?;
        }

        let mut actions = self.actions;
        if self.enable_delete && self.enable_delete_multiple {
            actions.push(ActionDescriptor::delete_selected());
        }
        check_unique(actions.iter().map(|a| a.handler.as_str()), "action handler")?;
        check_unique(self.item_actions.iter().map(|a| a.key.as_str()), "item action key")?;

        let mut formatters = Formatters::new(&settings.date_format, &settings.datetime_format);
        for (kind, formatter) in self.formatters {
            formatters.register(kind, formatter);
        }

        let plural = capfirst(&meta.verbose_name_plural);
        Ok(CrudConfig {
            display_fields,
            pagetitle: self.pagetitle.unwrap_or_else(|| plural.clone()),
            breadcrumbs: self
                .breadcrumbs
                .unwrap_or_else(|| vec![Breadcrumb::new(plural, None)]),
            enable_create: self.enable_create,
            enable_edit: self.enable_edit,
            enable_delete: self.enable_delete,
            enable_delete_multiple: self.enable_delete_multiple,
            item_editable: self.item_editable,
            item_deletable: self.item_deletable,
            actions,
            item_actions: self.item_actions,
            permissions: self.permissions,
            form_config,
            validator: self.validator,
            formset: self.formset,
            related_crud_urls: self.related_crud_urls,
            formatters,
            add_item_custom_url: self.add_item_custom_url,
            edit_item_custom_url: self.edit_item_custom_url,
            delete_item_custom_url: self.delete_item_custom_url,
            media: self
                .media
                .unwrap_or_else(|| Media::defaults(&settings.static_url)),
            paginate_by: self.paginate_by.unwrap_or(settings.paginate_by),
            messages: MessageCookie::new(&settings.messages_cookie_name),
            create_disallowed_msg: self
                .create_disallowed_msg
                .unwrap_or_else(|| DEFAULT_CREATE_DISALLOWED_MSG.to_string()),
        })
    }
}

fn check_unique<'a>(ids: impl Iterator<Item = &'a str>, what: &str) -> CrudResult<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(CrudError::ConfigurationError(format!("duplicate {what} '{id}'")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::LazyLock;

    use singleurlcrud_db::{EntityMeta, FieldDef, FieldType, Record, Value};

    use super::*;
    use crate::crud::actions::{ActionTarget, FnAction, DELETE_SELECTED};
    use crate::crud::display::FieldResolver;

    #[derive(Clone, Debug)]
    struct Shelf {
        id: Option<i64>,
        label: String,
        locked: bool,
    }

    fn shelf_meta() -> &'static EntityMeta {
        static META: LazyLock<EntityMeta> = LazyLock::new(|| {
            EntityMeta::new(
                "library",
                "shelf",
                vec![
                    FieldDef::new("label", FieldType::Char),
                    FieldDef::new("locked", FieldType::Boolean),
                    FieldDef::foreign_key("parent", shelf_meta).nullable(),
                ],
            )
            .verbose_names("shelf", "shelves")
        });
        &META
    }

    impl Entity for Shelf {
        fn meta() -> &'static EntityMeta {
            shelf_meta()
        }
        fn pk(&self) -> Option<i64> {
            self.id
        }
        fn set_pk(&mut self, pk: i64) {
            self.id = Some(pk);
        }
        fn field_values(&self) -> Vec<(&'static str, Value)> {
            vec![
                ("label", Value::from(self.label.as_str())),
                ("locked", Value::from(self.locked)),
                ("parent", Value::Null),
            ]
        }
        fn from_record(record: &Record) -> CrudResult<Self> {
            Ok(Self {
                id: record.pk,
                label: record.text("label")?,
                locked: record.boolean("locked")?,
            })
        }
        fn display_title(&self) -> String {
            self.label.clone()
        }
        fn is_readonly(&self) -> bool {
            self.locked
        }
    }

    fn builder() -> CrudConfigBuilder<Shelf> {
        CrudConfig::builder()
            .settings(&Settings::default())
            .list_display(&["label"])
    }

    fn shelf(locked: bool) -> Shelf {
        Shelf {
            id: Some(1),
            label: "Top".into(),
            locked,
        }
    }

    #[test]
    fn test_defaults() {
        let config = builder().build().unwrap();
        assert_eq!(config.pagetitle(), "Shelves");
        assert_eq!(config.breadcrumbs(), &[Breadcrumb::new("Shelves", None)]);
        assert_eq!(config.paginate_by(), 20);
        assert_eq!(config.actions().len(), 1);
        assert_eq!(config.actions()[0].handler, DELETE_SELECTED);
        assert_eq!(
            config.media().js,
            vec![
                "/static/singleurlcrud/js/crud-controller.js",
                "/static/admin/js/admin/RelatedObjectLookups.js"
            ]
        );
        let form_fields: Vec<&str> = config.form_config().schema_fields().map(|f| f.name).collect();
        assert_eq!(form_fields, vec!["label"]);
    }

    #[test]
    fn test_controller_accessor_resolves() {
        let config = builder()
            .list_display(&["label", "depth"])
            .accessor(Accessor::new("depth", |_: &Shelf| Value::from(0)).short_description("Depth"))
            .build()
            .unwrap();
        assert!(matches!(
            config.display_fields()[1].resolver,
            FieldResolver::ControllerMethod(_)
        ));
    }

    #[test]
    fn test_configuration_errors() {
        let unknown = builder().list_display(&["label", "colour"]).build();
        assert!(matches!(unknown, Err(CrudError::ConfigurationError(_))));

        let empty = CrudConfig::<Shelf>::builder()
            .settings(&Settings::default())
            .build();
        assert!(matches!(empty, Err(CrudError::ConfigurationError(_))));

        let stray_label = builder().label("locked", "Locked?").build();
        assert!(matches!(stray_label, Err(CrudError::ConfigurationError(_))));

        let not_fk = builder().related_crud_url("label", "/shelves/").build();
        assert!(matches!(not_fk, Err(CrudError::ConfigurationError(_))));

        let dup = builder()
            .action(ActionDescriptor::new(
                "Remove",
                DELETE_SELECTED,
                FnAction(|_: ActionTarget<Shelf>, _: &HttpRequest| Ok(None)),
            ))
            .build();
        assert!(matches!(dup, Err(CrudError::ConfigurationError(_))));
    }

    #[test]
    fn test_related_crud_url_on_foreign_key() {
        let config = builder()
            .form_fields(ModelFormFields::All)
            .related_crud_url("parent", "/shelves/")
            .build();
        assert!(config.is_ok());
    }

    #[test]
    fn test_delete_multiple_needs_both_flags() {
        let config = builder().enable_delete(false).build().unwrap();
        assert!(config.actions().is_empty());
        let request = HttpRequest::builder().build();
        assert!(!config.can_delete_multiple(&request));
    }

    #[test]
    fn test_capability_checks() {
        let request = HttpRequest::builder().build();
        let config = builder()
            .item_deletable(|s: &Shelf| s.label != "Top")
            .build()
            .unwrap();
        assert!(config.can_edit(&shelf(false), &request));
        assert!(!config.can_edit(&shelf(true), &request));
        assert!(!config.can_delete(&shelf(false), &request));

        let denied = builder()
            .permissions(crate::crud::permissions::PermissionFn(
                |op: Operation, _: Option<&Shelf>, _: &HttpRequest| op != Operation::Add,
            ))
            .build()
            .unwrap();
        assert!(!denied.can_add(&request));
        assert!(denied.can_edit(&shelf(false), &request));
    }
}
