//! Polls entities: authors, questions and their choices.

use std::sync::LazyLock;

use chrono::{Duration, Local, NaiveDateTime};

use singleurlcrud_core::CrudResult;
use singleurlcrud_db::{
    Accessor, Entity, EntityMeta, EntityStore, FieldDef, FieldType, OnDelete, Record, Value,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Author {
    pub id: Option<i64>,
    pub name: String,
    pub email: Option<String>,
}

impl Author {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            email: None,
        }
    }
}

impl Entity for Author {
    fn meta() -> &'static EntityMeta {
        static META: LazyLock<EntityMeta> = LazyLock::new(|| {
            EntityMeta::new(
                "polls",
                "author",
                vec![
                    FieldDef::new("name", FieldType::Char).max_length(64),
                    FieldDef::new("email", FieldType::Email)
                        .max_length(254)
                        .nullable(),
                ],
            )
            .ordering(&["name"])
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
            ("email", Value::from(self.email.as_deref())),
        ]
    }

    fn from_record(record: &Record) -> CrudResult<Self> {
        Ok(Self {
            id: record.pk,
            name: record.text("name")?,
            email: record.opt_text("email")?,
        })
    }

    fn display_title(&self) -> String {
        self.name.clone()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub id: Option<i64>,
    pub question_text: String,
    pub pub_date: NaiveDateTime,
    pub author: Option<i64>,
}

impl Question {
    /// Whether the question was published within the last day.
    pub fn was_published_recently(&self) -> bool {
        self.pub_date >= Local::now().naive_local() - Duration::days(1)
    }
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
                    FieldDef::foreign_key("author", Author::meta)
                        .nullable()
                        .on_delete(OnDelete::SetNull),
                ],
            )
            .verbose_names("Question", "Questions")
            .ordering(&["-pub_date"])
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
            author: record.opt_int("author")?,
        })
    }

    fn display_title(&self) -> String {
        self.question_text.clone()
    }

    fn accessors() -> Vec<Accessor<Self>> {
        vec![
            Accessor::new("was_published_recently", |q: &Self| {
                Value::from(q.was_published_recently())
            })
            .short_description("Published recently?"),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Choice {
    pub id: Option<i64>,
    pub question: i64,
    pub choice_text: String,
    pub votes: i64,
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

/// Registers every polls schema with `store`, parents first.
pub async fn register_models(store: &dyn EntityStore) -> CrudResult<()> {
    store.register(Author::meta()).await?;
    store.register(Question::meta()).await?;
    store.register(Choice::meta()).await?;
    Ok(())
}
