//! Integration tests for `CrudView`: every operation driven through
//! `View::dispatch` against a `MemoryStore`, with the JSON renderer so the
//! page contexts can be inspected.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock};

use chrono::{NaiveDate, NaiveDateTime};
use http::{Method, StatusCode};
use serde_json::Value as Json;

use singleurlcrud_core::CrudResult;
use singleurlcrud_db::store::{all, get};
use singleurlcrud_db::{
    Accessor, Entity, EntityMeta, EntityStore, FieldDef, FieldType, MemoryStore, Record, Value,
    ValueKind,
};
use singleurlcrud_forms::InlineFormSetConfig;
use singleurlcrud_http::{HttpRequest, HttpResponse};
use singleurlcrud_views::crud::display::BOOLEAN_TRUE_HTML;
use singleurlcrud_views::crud::{
    ActionDescriptor, ActionTarget, CrudConfigBuilder, FnAction, ItemActionDescriptor,
    PermissionFn, FORMSET_ERROR,
};
use singleurlcrud_views::messages::decode;
use singleurlcrud_views::{CrudConfig, CrudView, JsonRenderer, Operation, View};

// ── Entities ────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Author {
    id: Option<i64>,
    name: String,
    active: bool,
}

impl Entity for Author {
    fn meta() -> &'static EntityMeta {
        static META: LazyLock<EntityMeta> = LazyLock::new(|| {
            EntityMeta::new(
                "polls",
                "author",
                vec![
                    FieldDef::new("name", FieldType::Char).max_length(64),
                    FieldDef::new("active", FieldType::Boolean).default(true),
                ],
            )
            .title_field("name")
        });
        &META
    }

    fn pk(&self) -> Option<i64> {
        self.id
    }

    fn set_pk(&mut self, pk: i64) {
        self.id = Some(pk);
    }

    fn field_values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("name", Value::from(self.name.as_str())),
            ("active", Value::from(self.active)),
        ]
    }

    fn from_record(record: &Record) -> CrudResult<Self> {
        Ok(Self {
            id: record.pk,
            name: record.text("name")?,
            active: record.boolean("active")?,
        })
    }

    fn display_title(&self) -> String {
        self.name.clone()
    }
}

#[derive(Debug, Clone)]
struct Question {
    id: Option<i64>,
    question_text: String,
    pub_date: NaiveDateTime,
    author: i64,
}

impl Entity for Question {
    fn meta() -> &'static EntityMeta {
        static META: LazyLock<EntityMeta> = LazyLock::new(|| {
            EntityMeta::new(
                "polls",
                "question",
                vec![
                    FieldDef::new("question_text", FieldType::Char).max_length(200),
                    FieldDef::new("pub_date", FieldType::DateTime).verbose_name("date published"),
                    FieldDef::foreign_key("author", Author::meta),
                ],
            )
            .title_field("question_text")
        });
        &META
    }

    fn pk(&self) -> Option<i64> {
        self.id
    }

    fn set_pk(&mut self, pk: i64) {
        self.id = Some(pk);
    }

    fn field_values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("question_text", Value::from(self.question_text.as_str())),
            ("pub_date", Value::from(self.pub_date)),
            ("author", Value::from(self.author)),
        ]
    }

    fn from_record(record: &Record) -> CrudResult<Self> {
        Ok(Self {
            id: record.pk,
            question_text: record.text("question_text")?,
            pub_date: record.datetime("pub_date")?,
            author: record.int("author")?,
        })
    }

    fn display_title(&self) -> String {
        self.question_text.clone()
    }

    fn is_readonly(&self) -> bool {
        self.question_text.starts_with("[archived]")
    }

    fn accessors() -> Vec<Accessor<Self>> {
        vec![Accessor::new("shout", |q: &Self| {
            Value::from(format!("<b>{}</b>", q.question_text.to_uppercase()))
        })]
    }
}

#[derive(Debug, Clone)]
struct Choice {
    id: Option<i64>,
    question: i64,
    choice_text: String,
    votes: i64,
}

impl Entity for Choice {
    fn meta() -> &'static EntityMeta {
        static META: LazyLock<EntityMeta> = LazyLock::new(|| {
            EntityMeta::new(
                "polls",
                "choice",
                vec![
                    FieldDef::foreign_key("question", Question::meta),
                    FieldDef::new("choice_text", FieldType::Char).max_length(200),
                    FieldDef::new("votes", FieldType::Integer).default(0),
                ],
            )
            .title_field("choice_text")
        });
        &META
    }

    fn pk(&self) -> Option<i64> {
        self.id
    }

    fn set_pk(&mut self, pk: i64) {
        self.id = Some(pk);
    }

    fn field_values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("question", Value::from(self.question)),
            ("choice_text", Value::from(self.choice_text.as_str())),
            ("votes", Value::from(self.votes)),
        ]
    }

    fn from_record(record: &Record) -> CrudResult<Self> {
        Ok(Self {
            id: record.pk,
            question: record.int("question")?,
            choice_text: record.text("choice_text")?,
            votes: record.int("votes")?,
        })
    }

    fn display_title(&self) -> String {
        self.choice_text.clone()
    }
}

#[derive(Debug, Clone)]
struct Tag {
    id: Option<i64>,
    label: String,
}

impl Entity for Tag {
    fn meta() -> &'static EntityMeta {
        static META: LazyLock<EntityMeta> = LazyLock::new(|| {
            EntityMeta::new(
                "polls",
                "tag",
                vec![FieldDef::new("label", FieldType::Char).max_length(32).unique()],
            )
            .title_field("label")
        });
        &META
    }

    fn pk(&self) -> Option<i64> {
        self.id
    }

    fn set_pk(&mut self, pk: i64) {
        self.id = Some(pk);
    }

    fn field_values(&self) -> Vec<(&'static str, Value)> {
        vec![("label", Value::from(self.label.as_str()))]
    }

    fn from_record(record: &Record) -> CrudResult<Self> {
        Ok(Self {
            id: record.pk,
            label: record.text("label")?,
        })
    }

    fn display_title(&self) -> String {
        self.label.clone()
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

const QUESTIONS_URL: &str = "/polls/questions/";
const AUTHORS_URL: &str = "/polls/authors/";
const TAGS_URL: &str = "/polls/tags/";

async fn store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.register(Author::meta()).await.unwrap();
    store.register(Question::meta()).await.unwrap();
    store.register(Choice::meta()).await.unwrap();
    store.register(Tag::meta()).await.unwrap();
    store
}

fn date(day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, day)
        .unwrap()
        .and_hms_opt(15, 4, 0)
        .unwrap()
}

async fn seed_author(store: &MemoryStore, name: &str) -> i64 {
    let author = Author {
        id: None,
        name: name.to_string(),
        active: true,
    };
    store.insert(Author::meta(), &author.to_record()).await.unwrap()
}

async fn seed_question(store: &MemoryStore, text: &str, author: i64) -> i64 {
    let question = Question {
        id: None,
        question_text: text.to_string(),
        pub_date: date(5),
        author,
    };
    store.insert(Question::meta(), &question.to_record()).await.unwrap()
}

fn question_view(
    store: &Arc<MemoryStore>,
    configure: impl FnOnce(CrudConfigBuilder<Question>) -> CrudConfigBuilder<Question>,
) -> CrudView<Question> {
    let builder = CrudConfig::<Question>::builder()
        .list_display(&["question_text", "pub_date", "author"]);
    let config = configure(builder).build().unwrap();
    CrudView::new(config, Arc::clone(store) as Arc<dyn EntityStore>, Arc::new(JsonRenderer))
}

fn author_view(
    store: &Arc<MemoryStore>,
    configure: impl FnOnce(CrudConfigBuilder<Author>) -> CrudConfigBuilder<Author>,
) -> CrudView<Author> {
    let builder = CrudConfig::<Author>::builder().list_display(&["name", "active"]);
    let config = configure(builder).build().unwrap();
    CrudView::new(config, Arc::clone(store) as Arc<dyn EntityStore>, Arc::new(JsonRenderer))
}

fn get_request(path: &str, query: &str) -> HttpRequest {
    HttpRequest::builder().path(path).query_string(query).build()
}

fn post_request(path: &str, query: &str, form: &[(&str, &str)]) -> HttpRequest {
    HttpRequest::builder()
        .method(Method::POST)
        .path(path)
        .query_string(query)
        .form(form)
        .build()
}

/// Parses a JSON-rendered page into `(template, context)`.
fn page(response: &HttpResponse) -> (String, Json) {
    assert_eq!(response.status(), StatusCode::OK, "body: {}", response.text());
    let rendered: Json = serde_json::from_str(response.text()).unwrap();
    (
        rendered["template"].as_str().unwrap().to_string(),
        rendered["context"].clone(),
    )
}

fn set_cookies(response: &HttpResponse) -> Vec<String> {
    response
        .headers()
        .get_all(http::header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

/// The texts queued in the response's messages cookie.
fn queued_messages(response: &HttpResponse) -> Vec<String> {
    set_cookies(response)
        .iter()
        .filter_map(|c| c.strip_prefix("messages="))
        .filter_map(|c| c.split(';').next())
        .filter(|v| !v.is_empty())
        .flat_map(|v| decode(v).unwrap())
        .map(|m| m.text)
        .collect()
}

// ═════════════════════════════════════════════════════════════════════
// List
// ═════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_list_renders_resolved_values() {
    let store = store().await;
    let ada = seed_author(&store, "Ada").await;
    seed_question(&store, "Favourite colour", ada).await;
    let view = question_view(&store, |b| b);

    let response = view.dispatch(get_request(QUESTIONS_URL, "")).await;
    let (template, ctx) = page(&response);

    assert_eq!(template, "singleurlcrud/list.html");
    assert_eq!(ctx["pagetitle"], "Questions");
    let labels: Vec<&str> = ctx["list_display"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["label"].as_str().unwrap())
        .collect();
    assert_eq!(labels, vec!["Question text", "Date published", "Author"]);

    let row = &ctx["rows"][0];
    assert_eq!(row["values"][0], "Favourite colour");
    assert_eq!(row["values"][1], "Jan 5, 2024, 3:04 PM");
    assert_eq!(row["values"][2], "Ada");
    assert_eq!(row["edit_url"], "/polls/questions/?o=edit&item=1");
    assert_eq!(row["delete_url"], "/polls/questions/?o=delete&item=1");
    assert_eq!(ctx["add_url"], "/polls/questions/?o=add");
    assert_eq!(ctx["delete_msg"], "Are you sure you want to delete the Question: {1}");
    assert_eq!(ctx["create_button_text"], "Create new Question");
}

#[tokio::test]
async fn test_list_accessor_output_is_trusted() {
    let store = store().await;
    let ada = seed_author(&store, "Ada").await;
    seed_question(&store, "a < b", ada).await;
    let view = question_view(&store, |b| b.list_display(&["question_text", "shout"]));

    let (_, ctx) = page(&view.dispatch(get_request(QUESTIONS_URL, "")).await);
    assert_eq!(ctx["rows"][0]["values"][0], "a &lt; b");
    assert_eq!(ctx["rows"][0]["values"][1], "<b>A < B</b>");
    assert_eq!(ctx["list_display"][1]["label"], "Shout");
}

#[tokio::test]
async fn test_boolean_formatter_precedence() {
    let store = store().await;
    seed_author(&store, "Ada").await;

    let view = author_view(&store, |b| b);
    let (_, ctx) = page(&view.dispatch(get_request(AUTHORS_URL, "")).await);
    assert_eq!(ctx["rows"][0]["values"][1], BOOLEAN_TRUE_HTML);

    let view = author_view(&store, |b| {
        b.formatter(
            ValueKind::Bool,
            Arc::new(|v: &Value| if v == &Value::Bool(true) { "yes".to_string() } else { "no".to_string() }),
        )
    });
    let (_, ctx) = page(&view.dispatch(get_request(AUTHORS_URL, "")).await);
    assert_eq!(ctx["rows"][0]["values"][1], "yes");
}

#[tokio::test]
async fn test_pagination() {
    let store = store().await;
    let ada = seed_author(&store, "Ada").await;
    for i in 1..=25 {
        seed_question(&store, &format!("Question {i}"), ada).await;
    }
    let view = question_view(&store, |b| b.paginate_by(10));

    let (_, ctx) = page(&view.dispatch(get_request(QUESTIONS_URL, "page=3")).await);
    assert_eq!(ctx["rows"].as_array().unwrap().len(), 5);
    assert_eq!(ctx["is_paginated"], true);
    assert_eq!(ctx["page_obj"]["previous_url"], "/polls/questions/?page=2");

    let (_, ctx) = page(&view.dispatch(get_request(QUESTIONS_URL, "page=2")).await);
    assert_eq!(ctx["rows"][0]["title"], "Question 11");
    assert_eq!(ctx["rows"][9]["title"], "Question 20");
    assert_eq!(ctx["page_obj"]["start_index"], 11);

    let (_, ctx) = page(&view.dispatch(get_request(QUESTIONS_URL, "page=last")).await);
    assert_eq!(ctx["page_obj"]["number"], 3);
    assert_eq!(ctx["page_obj"]["count"], 25);

    let (_, ctx) = page(&view.dispatch(get_request(QUESTIONS_URL, "page=all")).await);
    assert_eq!(ctx["rows"].as_array().unwrap().len(), 25);
    assert_eq!(ctx["is_paginated"], false);

    for bad in ["page=9", "page=0", "page=abc"] {
        let response = view.dispatch(get_request(QUESTIONS_URL, bad)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{bad}");
    }
}

#[tokio::test]
async fn test_get_action_renders_list() {
    let store = store().await;
    let view = question_view(&store, |b| b);
    let (template, _) = page(&view.dispatch(get_request(QUESTIONS_URL, "o=action")).await);
    assert_eq!(template, "singleurlcrud/list.html");
}

// ═════════════════════════════════════════════════════════════════════
// Add / edit
// ═════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_add_disabled_is_not_found() {
    let store = store().await;
    let view = question_view(&store, |b| b.enable_create(false));

    let response = view.dispatch(get_request(QUESTIONS_URL, "o=add")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let (_, ctx) = page(&view.dispatch(get_request(QUESTIONS_URL, "")).await);
    assert_eq!(ctx["enable_create"], false);
    assert_eq!(ctx["create_disallowed_msg"], "New items cannot be created here.");
}

#[tokio::test]
async fn test_add_form_renders_formset() {
    let store = store().await;
    let view = question_view(&store, |b| {
        b.related_crud_url("author", AUTHORS_URL)
            .formset(InlineFormSetConfig::new(Choice::meta(), "question"))
    });

    let (template, ctx) = page(&view.dispatch(get_request(QUESTIONS_URL, "o=add")).await);
    assert_eq!(template, "singleurlcrud/edit.html");
    assert_eq!(ctx["pagetitle"], "Create new Question");
    assert_eq!(ctx["add"], true);
    assert_eq!(ctx["form_haserrors"], false);
    assert_eq!(ctx["form_action"], "/polls/questions/?o=add");
    assert!(ctx["formset"].is_object());
}

#[tokio::test]
async fn test_add_saves_question_and_choices() {
    let store = store().await;
    let ada = seed_author(&store, "Ada").await.to_string();
    let view = question_view(&store, |b| {
        b.formset(InlineFormSetConfig::new(Choice::meta(), "question"))
    });

    let response = view
        .dispatch(post_request(
            QUESTIONS_URL,
            "o=add",
            &[
                ("question_text", "Favourite colour"),
                ("pub_date", "2024-01-05 15:04"),
                ("author", &ada),
                ("choice_set-TOTAL_FORMS", "2"),
                ("choice_set-INITIAL_FORMS", "0"),
                ("choice_set-0-choice_text", "Red"),
                ("choice_set-0-votes", "3"),
                ("choice_set-1-votes", "0"),
            ],
        ))
        .await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.location(), Some(QUESTIONS_URL));
    assert!(queued_messages(&response).is_empty());

    let questions: Vec<Question> = all(store.as_ref()).await.unwrap();
    assert_eq!(questions.len(), 1);
    let choices: Vec<Choice> = all(store.as_ref()).await.unwrap();
    assert_eq!(choices.len(), 1);
    assert_eq!(choices[0].question, questions[0].id.unwrap());
    assert_eq!(choices[0].votes, 3);
}

#[tokio::test]
async fn test_invalid_add_changes_nothing() {
    let store = store().await;
    let ada = seed_author(&store, "Ada").await.to_string();
    let view = question_view(&store, |b| {
        b.formset(InlineFormSetConfig::new(Choice::meta(), "question"))
    });

    // Invalid parent form.
    let response = view
        .dispatch(post_request(
            QUESTIONS_URL,
            "o=add",
            &[
                ("question_text", ""),
                ("pub_date", "2024-01-05 15:04"),
                ("author", &ada),
                ("choice_set-TOTAL_FORMS", "1"),
                ("choice_set-INITIAL_FORMS", "0"),
                ("choice_set-0-choice_text", "Red"),
                ("choice_set-0-votes", "1"),
            ],
        ))
        .await;
    let (template, ctx) = page(&response);
    assert_eq!(template, "singleurlcrud/edit.html");
    assert_eq!(ctx["form_haserrors"], true);

    // Valid parent, invalid inline row: the parent insert is rolled back.
    let response = view
        .dispatch(post_request(
            QUESTIONS_URL,
            "o=add",
            &[
                ("question_text", "Favourite colour"),
                ("pub_date", "2024-01-05 15:04"),
                ("author", &ada),
                ("choice_set-TOTAL_FORMS", "1"),
                ("choice_set-INITIAL_FORMS", "0"),
                ("choice_set-0-choice_text", "Red"),
                ("choice_set-0-votes", "many"),
            ],
        ))
        .await;
    let (_, ctx) = page(&response);
    assert_eq!(ctx["form_haserrors"], true);
    assert_eq!(ctx["form"]["non_field_errors"][0], FORMSET_ERROR);

    assert_eq!(store.count(Question::meta()).await.unwrap(), 0);
    assert_eq!(store.count(Choice::meta()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_edit_updates_only_target() {
    let store = store().await;
    let ada = seed_author(&store, "Ada").await;
    let first = seed_question(&store, "First", ada).await;
    let second = seed_question(&store, "Second", ada).await;
    let view = question_view(&store, |b| b);

    let (_, ctx) = page(
        &view
            .dispatch(get_request(QUESTIONS_URL, &format!("o=edit&item={first}")))
            .await,
    );
    assert_eq!(ctx["pagetitle"], "Edit Question");
    assert_eq!(ctx["object"]["title"], "First");

    let response = view
        .dispatch(post_request(
            QUESTIONS_URL,
            &format!("page=2&o=edit&item={first}"),
            &[
                ("question_text", "First, revised"),
                ("pub_date", "2024-02-01 10:00"),
                ("author", &ada.to_string()),
            ],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.location(), Some("/polls/questions/?page=2"));
    assert_eq!(queued_messages(&response), vec!["Question details updated"]);

    let edited: Question = get(store.as_ref(), first).await.unwrap().unwrap();
    assert_eq!(edited.question_text, "First, revised");
    let untouched: Question = get(store.as_ref(), second).await.unwrap().unwrap();
    assert_eq!(untouched.question_text, "Second");
}

#[tokio::test]
async fn test_edit_missing_or_readonly_is_not_found() {
    let store = store().await;
    let ada = seed_author(&store, "Ada").await;
    let archived = seed_question(&store, "[archived] Old", ada).await;
    let view = question_view(&store, |b| b);

    for query in ["o=edit&item=99".to_string(), format!("o=edit&item={archived}"), "o=edit".into()] {
        let response = view.dispatch(get_request(QUESTIONS_URL, &query)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{query}");
    }

    let (_, ctx) = page(&view.dispatch(get_request(QUESTIONS_URL, "")).await);
    assert_eq!(ctx["rows"][0]["editable"], false);
    assert_eq!(ctx["rows"][0]["deletable"], false);
}

#[tokio::test]
async fn test_popup_add_returns_script() {
    let store = store().await;
    let view = author_view(&store, |b| b);

    let response = view
        .dispatch(post_request(
            AUTHORS_URL,
            "o=add&_popup=1",
            &[("name", "Grace \"Amazing\" Hopper"), ("active", "on")],
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.text(),
        r#"<script type="text/javascript">opener.dismissAddRelatedObjectPopup(window, "1", "Grace \u0022Amazing\u0022 Hopper");</script>"#
    );
    assert!(set_cookies(&response).is_empty());
}

#[tokio::test]
async fn test_popup_edit_returns_script_without_message() {
    let store = store().await;
    let ada = seed_author(&store, "Ada").await;
    let view = author_view(&store, |b| b);

    let response = view
        .dispatch(post_request(
            AUTHORS_URL,
            &format!("o=edit&item={ada}&_popup=1"),
            &[("name", "Ada Lovelace")],
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.text(),
        format!(
            r#"<script type="text/javascript">opener.dismissAddRelatedObjectPopup(window, "{ada}", "Ada Lovelace");</script>"#
        )
    );
    assert!(response.location().is_none());
    assert!(queued_messages(&response).is_empty());
    let renamed: Author = get(store.as_ref(), ada).await.unwrap().unwrap();
    assert_eq!(renamed.name, "Ada Lovelace");
    assert!(!renamed.active);
}

#[tokio::test]
async fn test_duplicate_unique_value_is_a_form_error() {
    let store = store().await;
    let config = CrudConfig::<Tag>::builder()
        .list_display(&["label"])
        .build()
        .unwrap();
    let view = CrudView::new(
        config,
        Arc::clone(&store) as Arc<dyn EntityStore>,
        Arc::new(JsonRenderer),
    );

    let first = view
        .dispatch(post_request(TAGS_URL, "o=add", &[("label", "rust")]))
        .await;
    assert_eq!(first.status(), StatusCode::FOUND);

    let (template, ctx) = page(
        &view
            .dispatch(post_request(TAGS_URL, "o=add", &[("label", "rust")]))
            .await,
    );
    assert_eq!(template, "singleurlcrud/edit.html");
    assert_eq!(ctx["form_haserrors"], true);
    let errors = ctx["form"]["non_field_errors"].as_array().unwrap();
    assert!(!errors.is_empty());
    assert!(errors[0].as_str().unwrap().contains("UNIQUE constraint failed"));
    assert_eq!(store.count(Tag::meta()).await.unwrap(), 1);
}

// ═════════════════════════════════════════════════════════════════════
// Delete
// ═════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_delete_then_repeat_is_not_found() {
    let store = store().await;
    let ada = seed_author(&store, "Ada").await;
    let pk = seed_question(&store, "Doomed", ada).await;
    let view = question_view(&store, |b| b);
    let query = format!("o=delete&item={pk}");

    let (template, ctx) = page(&view.dispatch(get_request(QUESTIONS_URL, &query)).await);
    assert_eq!(template, "singleurlcrud/delete.html");
    assert_eq!(ctx["delete_msg"], "Are you sure you want to delete the Question: Doomed");

    let response = view.dispatch(post_request(QUESTIONS_URL, &query, &[])).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(queued_messages(&response), vec!["Question Doomed deleted"]);
    assert_eq!(store.count(Question::meta()).await.unwrap(), 0);

    let response = view.dispatch(post_request(QUESTIONS_URL, &query, &[])).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_multiple_skips_missing_and_undeletable() {
    let store = store().await;
    let ada = seed_author(&store, "Ada").await;
    let a = seed_question(&store, "Alpha", ada).await;
    let b = seed_question(&store, "Beta", ada).await;
    let keep = seed_question(&store, "Keep me", ada).await;
    let view = question_view(&store, |b| {
        b.item_deletable(|q: &Question| !q.question_text.starts_with("Keep"))
    });
    let query = format!("o=delete_multiple&items={a},99,{keep},{b}");

    let (_, ctx) = page(&view.dispatch(get_request(QUESTIONS_URL, &query)).await);
    assert_eq!(ctx["delete_msg"], "Are you sure you want to delete the Questions: Alpha, Beta");

    let response = view.dispatch(post_request(QUESTIONS_URL, &query, &[])).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(queued_messages(&response), vec!["2 Questions deleted"]);

    let remaining: Vec<Question> = all(store.as_ref()).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, Some(keep));
}

#[tokio::test]
async fn test_delete_multiple_requires_items() {
    let store = store().await;
    let view = question_view(&store, |b| b);
    let response = view
        .dispatch(get_request(QUESTIONS_URL, "o=delete_multiple"))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let view = question_view(&store, |b| b.enable_delete_multiple(false));
    let response = view
        .dispatch(get_request(QUESTIONS_URL, "o=delete_multiple&items=1"))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ═════════════════════════════════════════════════════════════════════
// Messages and permissions
// ═════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_message_shown_once_after_redirect() {
    let store = store().await;
    let ada = seed_author(&store, "Ada").await;
    let pk = seed_question(&store, "Doomed", ada).await;
    let view = question_view(&store, |b| b);

    let response = view
        .dispatch(post_request(QUESTIONS_URL, &format!("o=delete&item={pk}"), &[]))
        .await;
    let cookie = set_cookies(&response)[0]
        .split(';')
        .next()
        .unwrap()
        .to_string();

    let list = view
        .dispatch(
            HttpRequest::builder()
                .path(QUESTIONS_URL)
                .header("cookie", &cookie)
                .build(),
        )
        .await;
    let (_, ctx) = page(&list);
    assert_eq!(ctx["messages"][0]["text"], "Question Doomed deleted");
    assert!(set_cookies(&list)
        .iter()
        .any(|c| c.starts_with("messages=;") && c.contains("Max-Age=0")));
}

#[tokio::test]
async fn test_permission_denied_is_not_found() {
    let store = store().await;
    let ada = seed_author(&store, "Ada").await;
    let pk = seed_question(&store, "Guarded", ada).await;
    let view = question_view(&store, |b| {
        b.permissions(PermissionFn(
            |op: Operation, _: Option<&Question>, _: &HttpRequest| op != Operation::Delete,
        ))
    });

    let query = format!("o=delete&item={pk}");
    let response = view.dispatch(get_request(QUESTIONS_URL, &query)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = view.dispatch(post_request(QUESTIONS_URL, &query, &[])).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(store.count(Question::meta()).await.unwrap(), 1);

    let (_, ctx) = page(&view.dispatch(get_request(QUESTIONS_URL, "")).await);
    assert_eq!(ctx["rows"][0]["deletable"], false);
    assert_eq!(ctx["rows"][0]["editable"], true);
}

// ═════════════════════════════════════════════════════════════════════
// Actions
// ═════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_delete_selected_redirects_to_confirmation() {
    let store = store().await;
    let ada = seed_author(&store, "Ada").await;
    seed_question(&store, "Alpha", ada).await;
    seed_question(&store, "Beta", ada).await;
    let view = question_view(&store, |b| b);

    let (_, ctx) = page(&view.dispatch(get_request(QUESTIONS_URL, "")).await);
    assert_eq!(ctx["actions"][0]["handler"], "delete_selected");

    let response = view
        .dispatch(post_request(
            QUESTIONS_URL,
            "o=action",
            &[("handler", "delete_selected"), ("ids", "1,2")],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.location(),
        Some("/polls/questions/?o=delete_multiple&items=1%2C2")
    );
}

#[tokio::test]
async fn test_custom_bulk_action() {
    static CALLS: AtomicUsize = AtomicUsize::new(0);

    let store = store().await;
    let ada = seed_author(&store, "Ada").await;
    seed_question(&store, "Alpha", ada).await;
    seed_question(&store, "Beta", ada).await;
    let view = question_view(&store, |b| {
        b.action(ActionDescriptor::new(
            "Count",
            "count",
            FnAction(|target: ActionTarget<Question>, _: &HttpRequest| -> CrudResult<Option<HttpResponse>> {
                CALLS.fetch_add(1, Ordering::SeqCst);
                Ok(Some(HttpResponse::ok(target.entities().len().to_string())))
            }),
        ))
    });

    let response = view
        .dispatch(post_request(
            QUESTIONS_URL,
            "o=action",
            &[("handler", "count"), ("ids", "1,2,99")],
        ))
        .await;
    assert_eq!(response.text(), "2");

    for form in [[("handler", "count"), ("ids", "")], [("handler", "nope"), ("ids", "1")]] {
        let response = view
            .dispatch(post_request(QUESTIONS_URL, "o=action", &form))
            .await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.location(), Some(QUESTIONS_URL));
    }
    assert_eq!(CALLS.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_item_action() {
    let store = store().await;
    let ada = seed_author(&store, "Ada").await;
    let pk = seed_question(&store, "Alpha", ada).await;
    let view = question_view(&store, |b| {
        b.item_action(ItemActionDescriptor::new(
            "Vote",
            "vote1",
            "glyphicon glyphicon-envelope",
            FnAction(|target: ActionTarget<Question>, _: &HttpRequest| -> CrudResult<Option<HttpResponse>> {
                let titles: Vec<String> =
                    target.entities().iter().map(Entity::display_title).collect();
                Ok(Some(HttpResponse::ok(format!("voted {}", titles.join(",")))))
            }),
        ))
    });

    let (_, ctx) = page(&view.dispatch(get_request(QUESTIONS_URL, "")).await);
    assert_eq!(ctx["itemactions"][0]["key"], "vote1");

    let response = view
        .dispatch(post_request(
            QUESTIONS_URL,
            &format!("o=action&item={pk}"),
            &[("handler", "vote1")],
        ))
        .await;
    assert_eq!(response.text(), "voted Alpha");

    let response = view
        .dispatch(post_request(QUESTIONS_URL, "o=action&item=99", &[("handler", "vote1")]))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_post_without_operation_redirects() {
    let store = store().await;
    let view = question_view(&store, |b| b);
    for query in ["", "o=bogus"] {
        let response = view
            .dispatch(post_request(QUESTIONS_URL, query, &[]))
            .await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.location(), Some(QUESTIONS_URL));
    }
}
