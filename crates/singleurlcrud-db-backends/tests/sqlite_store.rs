//! Integration tests for `SqliteStore` against a database file.
//!
//! These cover what only a real engine does: foreign-key delete behavior,
//! transaction rollback and isolation, and persistence across reopen.

#![cfg(feature = "sqlite")]

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use singleurlcrud_core::{CrudError, CrudResult};
use singleurlcrud_db::fields::OnDelete;
use singleurlcrud_db::transactions::atomic;
use singleurlcrud_db::{EntityMeta, EntityStore, FieldDef, FieldType, Record, Value};
use singleurlcrud_db_backends::SqliteStore;

// ── Schemas ──────────────────────────────────────────────────────────

fn author_meta() -> &'static EntityMeta {
    static META: LazyLock<EntityMeta> = LazyLock::new(|| {
        EntityMeta::new(
            "polls",
            "author",
            vec![
                FieldDef::new("name", FieldType::Char).max_length(64),
                FieldDef::new("email", FieldType::Email).nullable(),
            ],
        )
        .ordering(&["name"])
        .title_field("name")
    });
    &META
}

fn question_meta() -> &'static EntityMeta {
    static META: LazyLock<EntityMeta> = LazyLock::new(|| {
        EntityMeta::new(
            "polls",
            "question",
            vec![
                FieldDef::new("question_text", FieldType::Char).max_length(200),
                FieldDef::new("pub_date", FieldType::DateTime),
                FieldDef::foreign_key("author", author_meta)
                    .nullable()
                    .on_delete(OnDelete::SetNull),
            ],
        )
    });
    &META
}

fn choice_meta() -> &'static EntityMeta {
    static META: LazyLock<EntityMeta> = LazyLock::new(|| {
        EntityMeta::new(
            "polls",
            "choice",
            vec![
                FieldDef::foreign_key("question", question_meta),
                FieldDef::new("choice_text", FieldType::Char).max_length(200),
                FieldDef::new("votes", FieldType::Integer).default(0_i64),
            ],
        )
    });
    &META
}

async fn open(path: &std::path::Path) -> SqliteStore {
    let store = SqliteStore::open(path).unwrap();
    store.register(author_meta()).await.unwrap();
    store.register(question_meta()).await.unwrap();
    store.register(choice_meta()).await.unwrap();
    store
}

fn question(text: &str, author: Option<i64>) -> Record {
    let pub_date = chrono::NaiveDate::from_ymd_opt(2024, 5, 1)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap();
    Record::new(
        None,
        [
            ("question_text", Value::from(text)),
            ("pub_date", Value::DateTime(pub_date)),
            ("author", Value::from(author)),
        ],
    )
}

fn choice(question: i64, text: &str) -> Record {
    Record::new(
        None,
        [
            ("question", Value::Int(question)),
            ("choice_text", Value::from(text)),
            ("votes", Value::Int(0)),
        ],
    )
}

// ── Tests ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_crud_and_ordering() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir.path().join("db.sqlite3")).await;

    let zed = store
        .insert(author_meta(), &Record::new(None, [("name", Value::from("Zed"))]))
        .await
        .unwrap();
    store
        .insert(author_meta(), &Record::new(None, [("name", Value::from("Amy"))]))
        .await
        .unwrap();

    let names: Vec<String> = store
        .list(author_meta())
        .await
        .unwrap()
        .iter()
        .map(|r| r.text("name").unwrap())
        .collect();
    assert_eq!(names, vec!["Amy", "Zed"]);

    let mut rec = store.fetch(author_meta(), zed).await.unwrap().unwrap();
    assert!(rec.get("email").is_null());
    rec.set("email", "zed@example.com");
    store.update(author_meta(), &rec).await.unwrap();
    let by_email = store
        .filter_eq(author_meta(), "email", &Value::from("zed@example.com"))
        .await
        .unwrap();
    assert_eq!(by_email.len(), 1);
    assert_eq!(store.count(author_meta()).await.unwrap(), 2);

    rec.pk = Some(999);
    assert!(matches!(
        store.update(author_meta(), &rec).await,
        Err(CrudError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_foreign_key_delete_behavior() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir.path().join("db.sqlite3")).await;

    let author = store
        .insert(author_meta(), &Record::new(None, [("name", Value::from("Ann"))]))
        .await
        .unwrap();
    let q = store
        .insert(question_meta(), &question("Why?", Some(author)))
        .await
        .unwrap();
    store.insert(choice_meta(), &choice(q, "Because")).await.unwrap();
    store.insert(choice_meta(), &choice(q, "Why not")).await.unwrap();

    assert!(store.delete(author_meta(), author).await.unwrap());
    let q_rec = store.fetch(question_meta(), q).await.unwrap().unwrap();
    assert!(q_rec.get("author").is_null());

    assert!(store.delete(question_meta(), q).await.unwrap());
    assert_eq!(store.count(choice_meta()).await.unwrap(), 0);
    assert!(!store.delete(question_meta(), q).await.unwrap());
}

#[tokio::test]
async fn test_foreign_key_must_exist() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir.path().join("db.sqlite3")).await;
    let err = store.insert(choice_meta(), &choice(42, "orphan")).await.unwrap_err();
    assert!(matches!(err, CrudError::IntegrityError(_)));
}

#[tokio::test]
async fn test_atomic_rolls_back_parent_and_children() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir.path().join("db.sqlite3")).await;

    let result: CrudResult<()> = atomic(&store, |tx| async move {
        let q = tx.insert(question_meta(), &question("Draft", None)).await?;
        tx.insert(choice_meta(), &choice(q, "A")).await?;
        Err(CrudError::ValidationFailed(
            "Some rows have errors. Please correct them.".into(),
        ))
    })
    .await;
    assert!(result.is_err());
    assert_eq!(store.count(question_meta()).await.unwrap(), 0);
    assert_eq!(store.count(choice_meta()).await.unwrap(), 0);

    let q = atomic(&store, |tx| async move {
        let q = tx.insert(question_meta(), &question("Kept", None)).await?;
        tx.insert(choice_meta(), &choice(q, "A")).await?;
        Ok(q)
    })
    .await
    .unwrap();
    let children = store
        .filter_eq(choice_meta(), "question", &Value::Int(q))
        .await
        .unwrap();
    assert_eq!(children.len(), 1);
}

#[tokio::test]
async fn test_cancelled_transaction_rolls_back_and_unlocks() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir.path().join("db.sqlite3")).await;

    let abandoned = atomic(&store, |tx| async move {
        tx.insert(question_meta(), &question("Ghost", None)).await?;
        std::future::pending::<CrudResult<()>>().await
    });
    assert!(tokio::time::timeout(Duration::from_millis(100), abandoned)
        .await
        .is_err());

    let count = tokio::time::timeout(Duration::from_secs(5), store.count(question_meta()))
        .await
        .expect("connection still held by the cancelled transaction")
        .unwrap();
    assert_eq!(count, 0);

    let next = atomic(&store, |tx| async move {
        tx.insert(question_meta(), &question("Kept", None)).await
    });
    let q = tokio::time::timeout(Duration::from_secs(5), next)
        .await
        .expect("second transaction never started")
        .unwrap();
    assert!(store.fetch(question_meta(), q).await.unwrap().is_some());
}

#[tokio::test]
async fn test_readers_never_see_uncommitted_rows() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(open(&dir.path().join("db.sqlite3")).await);

    let tx = store.begin().await.unwrap();
    tx.insert(question_meta(), &question("Draft", None)).await.unwrap();
    assert_eq!(tx.count(question_meta()).await.unwrap(), 1);

    let reader = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.count(question_meta()).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!reader.is_finished());

    tx.rollback().await.unwrap();
    assert_eq!(reader.await.unwrap().unwrap(), 0);
    assert!(matches!(
        tx.insert(question_meta(), &question("Late", None)).await,
        Err(CrudError::OperationalError(_))
    ));
}

#[tokio::test]
async fn test_list_page_uses_default_ordering() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir.path().join("db.sqlite3")).await;
    for name in ["Eve", "Ada", "Dan", "Bea", "Cal"] {
        store
            .insert(author_meta(), &Record::new(None, [("name", Value::from(name))]))
            .await
            .unwrap();
    }
    let names: Vec<String> = store
        .list_page(author_meta(), 1, 3)
        .await
        .unwrap()
        .iter()
        .map(|r| r.text("name").unwrap())
        .collect();
    assert_eq!(names, vec!["Bea", "Cal", "Dan"]);
    assert!(store.list_page(author_meta(), 5, 3).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_data_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db.sqlite3");
    let pk = {
        let store = open(&path).await;
        store
            .insert(question_meta(), &question("Persist?", None))
            .await
            .unwrap()
    };
    let store = open(&path).await;
    let rec = store.fetch(question_meta(), pk).await.unwrap().unwrap();
    assert_eq!(rec.text("question_text").unwrap(), "Persist?");
    assert!(rec.datetime("pub_date").is_ok());
    assert!(store.filter_pks(question_meta(), &[]).await.unwrap().is_empty());
}
