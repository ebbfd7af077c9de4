//! Template rendering.
//!
//! The controller hands a template name and a JSON context to a
//! [`TemplateRenderer`]. [`TeraRenderer`] renders HTML with Tera, using
//! the built-in `singleurlcrud/*.html` templates unless a configured
//! template directory provides a file with the same name. [`JsonRenderer`]
//! returns the context itself, which lets tests assert on context values.

use std::path::PathBuf;

use singleurlcrud_core::{CrudError, CrudResult};

/// Template names the controller renders.
pub const LIST_TEMPLATE: &str = "singleurlcrud/list.html";
pub const EDIT_TEMPLATE: &str = "singleurlcrud/edit.html";
pub const DELETE_TEMPLATE: &str = "singleurlcrud/delete.html";

const BUILTIN_TEMPLATES: [(&str, &str); 4] = [
    (
        "singleurlcrud/base.html",
        include_str!("../templates/singleurlcrud/base.html"),
    ),
    (LIST_TEMPLATE, include_str!("../templates/singleurlcrud/list.html")),
    (EDIT_TEMPLATE, include_str!("../templates/singleurlcrud/edit.html")),
    (
        DELETE_TEMPLATE,
        include_str!("../templates/singleurlcrud/delete.html"),
    ),
];

/// Renders a named template with a JSON object context.
pub trait TemplateRenderer: Send + Sync {
    /// Renders `template_name`.
    fn render(&self, template_name: &str, context: &serde_json::Value) -> CrudResult<String>;

    /// The content type of rendered output.
    fn content_type(&self) -> &'static str {
        "text/html"
    }
}

/// Tera-backed HTML rendering.
#[derive(Debug)]
pub struct TeraRenderer {
    tera: tera::Tera,
}

impl TeraRenderer {
    /// Creates a renderer with only the built-in templates.
    pub fn new() -> CrudResult<Self> {
        Self::with_dirs(&[])
    }

    /// Creates a renderer that loads `**/*.html` from each directory, with
    /// the built-in templates filling in whatever the directories lack.
    /// Earlier directories take precedence.
    pub fn with_dirs(dirs: &[PathBuf]) -> CrudResult<Self> {
        let mut tera = tera::Tera::default();
        for dir in dirs.iter().rev() {
            let glob = format!("{}/**/*.html", dir.display());
            let loaded = tera::Tera::parse(&glob).map_err(template_error)?;
            tera.extend(&loaded).map_err(template_error)?;
            tracing::debug!(dir = %dir.display(), "loaded template directory");
        }
        let present: Vec<String> = tera.get_template_names().map(String::from).collect();
        let builtins: Vec<(&str, &str)> = BUILTIN_TEMPLATES
            .iter()
            .filter(|(name, _)| !present.iter().any(|p| p == name))
            .copied()
            .collect();
        tera.add_raw_templates(builtins).map_err(template_error)?;
        Ok(Self { tera })
    }
}

impl TemplateRenderer for TeraRenderer {
    fn render(&self, template_name: &str, context: &serde_json::Value) -> CrudResult<String> {
        let context = tera::Context::from_value(context.clone()).map_err(template_error)?;
        self.tera
            .render(template_name, &context)
            .map_err(template_error)
    }
}

/// Renders `{"template": name, "context": context}` as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl TemplateRenderer for JsonRenderer {
    fn render(&self, template_name: &str, context: &serde_json::Value) -> CrudResult<String> {
        Ok(serde_json::to_string(&serde_json::json!({
            "template": template_name,
            "context": context,
        }))?)
    }

    fn content_type(&self) -> &'static str {
        "application/json"
    }
}

/// Flattens a Tera error and its causes into one message.
fn template_error(err: tera::Error) -> CrudError {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(&err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    CrudError::TemplateError(message)
}
