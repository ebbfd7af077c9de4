//! Mounting the polls controllers.

use std::sync::Arc;

use singleurlcrud_core::{CrudResult, Settings};
use singleurlcrud_db::EntityStore;
use singleurlcrud_views::{CrudApp, TemplateRenderer, View, STATIC_DIR};

use crate::views::{author_view, question_view, AUTHORS_URL, QUESTIONS_URL};

/// Builds the polls application: authors and questions, plus the bundled
/// scripts and stylesheets under the static URL.
pub fn polls_app(
    settings: &Settings,
    store: Arc<dyn EntityStore>,
    renderer: Arc<dyn TemplateRenderer>,
) -> CrudResult<CrudApp> {
    let authors = author_view(settings, Arc::clone(&store), Arc::clone(&renderer))?;
    let questions = question_view(settings, store, renderer)?;
    Ok(CrudApp::new(settings.clone())
        .route(AUTHORS_URL, authors.as_view())
        .route(QUESTIONS_URL, questions.as_view())
        .static_dir(STATIC_DIR))
}
