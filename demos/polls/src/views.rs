//! The two polls controllers.

use std::sync::Arc;

use singleurlcrud_core::{CrudResult, Settings};
use singleurlcrud_db::{Entity, EntityStore};
use singleurlcrud_forms::{InlineFormSetConfig, ModelFormFields};
use singleurlcrud_http::{HttpRequest, HttpResponse};
use singleurlcrud_views::crud::{ActionTarget, Breadcrumb, FnAction, ItemActionDescriptor};
use singleurlcrud_views::{CrudConfig, CrudView, TemplateRenderer};

use crate::models::{Author, Choice, Question};

/// Where the authors controller is mounted.
pub const AUTHORS_URL: &str = "/polls/authors/";
/// Where the questions controller is mounted.
pub const QUESTIONS_URL: &str = "/polls/questions/";

/// Authors: a plain list of names.
pub fn author_view(
    settings: &Settings,
    store: Arc<dyn EntityStore>,
    renderer: Arc<dyn TemplateRenderer>,
) -> CrudResult<CrudView<Author>> {
    let config = CrudConfig::<Author>::builder()
        .list_display(&["name"])
        .form_fields(ModelFormFields::Include(vec!["name".into(), "email".into()]))
        .breadcrumbs(vec![Breadcrumb::new("Authors", None)])
        .settings(settings)
        .build()?;
    Ok(CrudView::new(config, store, renderer))
}

/// Questions, edited together with their choices.
///
/// The author column links to the authors controller, which is also where
/// the add-author popup of the question form points. Questions titled
/// `test` are protected from deletion.
pub fn question_view(
    settings: &Settings,
    store: Arc<dyn EntityStore>,
    renderer: Arc<dyn TemplateRenderer>,
) -> CrudResult<CrudView<Question>> {
    let config = CrudConfig::<Question>::builder()
        .list_display(&["question_text", "pub_date", "author"])
        .related_crud_url("author", AUTHORS_URL)
        .item_deletable(|q| q.question_text != "test")
        .item_action(ItemActionDescriptor::new(
            "Vote",
            "vote1",
            "glyphicon glyphicon-envelope",
            FnAction(vote),
        ))
        .formset(InlineFormSetConfig::new(Choice::meta(), "question"))
        .breadcrumbs(vec![Breadcrumb::new("Questions", None)])
        .settings(settings)
        .build()?;
    Ok(CrudView::new(config, store, renderer))
}

fn vote(target: ActionTarget<Question>, _request: &HttpRequest) -> CrudResult<Option<HttpResponse>> {
    for question in target.entities() {
        tracing::info!(question = ?question.id, "vote requested");
    }
    Ok(None)
}
