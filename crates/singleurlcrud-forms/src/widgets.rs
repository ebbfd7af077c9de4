//! Widget system for rendering HTML form elements.
//!
//! Widgets render a field as HTML and pull its raw value back out of
//! submitted data. [`RelatedFieldWidgetWrapper`] decorates a `<select>` for
//! a foreign key with an "add another" link that opens the related
//! resource's add page in a popup window.

use std::collections::HashMap;
use std::fmt;

use singleurlcrud_core::utils::text::escape;
use singleurlcrud_db::Value;
use singleurlcrud_http::url::with_params;
use singleurlcrud_http::QueryDict;

/// Enumerates the built-in widget types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetType {
    /// `<input type="text">`.
    TextInput,
    /// `<input type="number">`.
    NumberInput,
    /// `<input type="email">`.
    EmailInput,
    /// `<input type="hidden">`.
    HiddenInput,
    /// `<textarea>`.
    Textarea,
    /// `<input type="checkbox">`.
    CheckboxInput,
    /// `<select>`.
    Select,
    /// A date text input.
    DateInput,
    /// A datetime text input.
    DateTimeInput,
    /// A `<select>` plus a popup link to the related resource's add page.
    RelatedSelect {
        /// The URL of the controller managing the related resource.
        crud_url: String,
    },
}

impl fmt::Display for WidgetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TextInput => "TextInput",
            Self::NumberInput => "NumberInput",
            Self::EmailInput => "EmailInput",
            Self::HiddenInput => "HiddenInput",
            Self::Textarea => "Textarea",
            Self::CheckboxInput => "CheckboxInput",
            Self::Select => "Select",
            Self::DateInput => "DateInput",
            Self::DateTimeInput => "DateTimeInput",
            Self::RelatedSelect { .. } => "RelatedFieldWidgetWrapper",
        };
        write!(f, "{name}")
    }
}

/// A trait for HTML form widgets.
pub trait Widget: Send + Sync + fmt::Debug {
    /// Renders the widget as HTML.
    fn render(&self, name: &str, value: Option<&str>, attrs: &HashMap<String, String>) -> String;

    /// Extracts the raw value from submitted form data.
    fn value_from_data(&self, data: &QueryDict, name: &str) -> Option<String> {
        data.get(name).map(String::from)
    }

    /// Hidden widgets render outside the visible field rows.
    fn is_hidden(&self) -> bool {
        false
    }
}

/// Formats attributes as ` key="value"` pairs, sorted for stable output.
fn render_attrs(attrs: &HashMap<String, String>) -> String {
    let mut parts: Vec<String> = attrs
        .iter()
        .map(|(k, v)| format!(r#" {k}="{}""#, escape(v)))
        .collect();
    parts.sort();
    parts.join("")
}

/// An `<input>` of a given type.
#[derive(Debug, Clone)]
pub struct Input {
    input_type: &'static str,
}

impl Input {
    /// Creates an input widget for `type="{input_type}"`.
    pub const fn new(input_type: &'static str) -> Self {
        Self { input_type }
    }
}

impl Widget for Input {
    fn render(&self, name: &str, value: Option<&str>, attrs: &HashMap<String, String>) -> String {
        let value_attr = value
            .filter(|v| !v.is_empty())
            .map(|v| format!(r#" value="{}""#, escape(v)))
            .unwrap_or_default();
        format!(
            r#"<input type="{}" name="{name}"{value_attr}{} />"#,
            self.input_type,
            render_attrs(attrs)
        )
    }

    fn is_hidden(&self) -> bool {
        self.input_type == "hidden"
    }
}

/// A `<textarea>` widget.
#[derive(Debug, Clone)]
pub struct Textarea;

impl Widget for Textarea {
    fn render(&self, name: &str, value: Option<&str>, attrs: &HashMap<String, String>) -> String {
        format!(
            r#"<textarea name="{name}" cols="40" rows="10"{}>{}</textarea>"#,
            render_attrs(attrs),
            escape(value.unwrap_or(""))
        )
    }
}

/// A `<input type="checkbox">` widget. An unchecked box submits nothing.
#[derive(Debug, Clone)]
pub struct CheckboxInput;

impl Widget for CheckboxInput {
    fn render(&self, name: &str, value: Option<&str>, attrs: &HashMap<String, String>) -> String {
        let checked = value.is_some_and(|v| matches!(v, "true" | "on" | "1"));
        let checked_attr = if checked { " checked" } else { "" };
        format!(
            r#"<input type="checkbox" name="{name}"{checked_attr}{} />"#,
            render_attrs(attrs)
        )
    }
}

/// A `<select>` widget.
#[derive(Debug, Clone)]
pub struct Select {
    /// The available choices as `(value, display_label)` pairs.
    pub choices: Vec<(String, String)>,
}

impl Select {
    /// Creates a new `Select` widget with the given choices.
    pub const fn new(choices: Vec<(String, String)>) -> Self {
        Self { choices }
    }

    /// Creates a `Select` from typed choices; `Null` becomes the empty
    /// option value.
    pub fn from_values(choices: &[(Value, String)]) -> Self {
        Self::new(
            choices
                .iter()
                .map(|(v, label)| (v.to_form_string().unwrap_or_default(), label.clone()))
                .collect(),
        )
    }
}

impl Widget for Select {
    fn render(&self, name: &str, value: Option<&str>, attrs: &HashMap<String, String>) -> String {
        let current = value.unwrap_or("");
        let mut options = String::new();
        for (val, label) in &self.choices {
            let selected = if val == current { " selected" } else { "" };
            options.push_str(&format!(
                r#"<option value="{}"{selected}>{}</option>"#,
                escape(val),
                escape(label)
            ));
        }
        format!(
            r#"<select name="{name}"{}>{options}</select>"#,
            render_attrs(attrs)
        )
    }
}

/// Wraps a `<select>` for a foreign key with a link that opens the related
/// resource's add page as a popup.
#[derive(Debug, Clone)]
pub struct RelatedFieldWidgetWrapper {
    inner: Select,
    crud_url: String,
}

impl RelatedFieldWidgetWrapper {
    /// Wraps `inner`, linking to the controller at `crud_url`.
    pub fn new(inner: Select, crud_url: impl Into<String>) -> Self {
        Self {
            inner,
            crud_url: crud_url.into(),
        }
    }

    /// The popup URL: the related controller's add page in popup mode.
    pub fn add_url(&self) -> String {
        with_params(&self.crud_url, &[("o", "add"), ("_popup", "1")])
    }
}

impl Widget for RelatedFieldWidgetWrapper {
    fn render(&self, name: &str, value: Option<&str>, attrs: &HashMap<String, String>) -> String {
        let select = self.inner.render(name, value, attrs);
        format!(
            r#"{select}<a href="{}" class="add-another" id="add_id_{name}" onclick="return showRelatedObjectPopup(this);"><span class="glyphicon glyphicon-plus"></span></a>"#,
            escape(&self.add_url())
        )
    }
}

/// Creates a boxed widget for a widget type, populating choices where the
/// widget uses them.
pub fn create_widget(widget_type: &WidgetType, choices: &[(Value, String)]) -> Box<dyn Widget> {
    match widget_type {
        WidgetType::TextInput | WidgetType::DateInput | WidgetType::DateTimeInput => {
            Box::new(Input::new("text"))
        }
        WidgetType::NumberInput => Box::new(Input::new("number")),
        WidgetType::EmailInput => Box::new(Input::new("email")),
        WidgetType::HiddenInput => Box::new(Input::new("hidden")),
        WidgetType::Textarea => Box::new(Textarea),
        WidgetType::CheckboxInput => Box::new(CheckboxInput),
        WidgetType::Select => Box::new(Select::from_values(choices)),
        WidgetType::RelatedSelect { crud_url } => Box::new(RelatedFieldWidgetWrapper::new(
            Select::from_values(choices),
            crud_url.clone(),
        )),
    }
}
