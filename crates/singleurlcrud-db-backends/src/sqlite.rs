//! `SQLite` store using `rusqlite`.
//!
//! [`SqliteStore`] derives its tables from [`EntityMeta`] schemas on
//! `register` and runs every statement on one connection through
//! `tokio::task::spawn_blocking`. Foreign keys are enforced by `SQLite`
//! itself (`PRAGMA foreign_keys=ON`), including `ON DELETE` behavior.
//!
//! A transaction holds the connection from `BEGIN` until it commits, rolls
//! back, or is dropped, so other callers wait rather than read its
//! uncommitted rows. Dropping an unfinished transaction issues `ROLLBACK`.
//!
//! Storage mapping:
//! - text, email, and char fields are `TEXT`
//! - booleans are `INTEGER` 0/1
//! - dates and datetimes are `TEXT` in ISO form
//! - a foreign key `author` is the column `author_id`

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::ValueRef;
use rusqlite::ErrorCode;
use tokio::sync::{Mutex, OwnedMutexGuard};

use singleurlcrud_core::{CrudError, CrudResult};
use singleurlcrud_db::fields::{FieldType, OnDelete};
use singleurlcrud_db::transactions::{nested_transaction, transaction_closed};
use singleurlcrud_db::value::{DATETIME_FORMAT, DATE_FORMAT};
use singleurlcrud_db::{EntityMeta, EntityStore, Record, Transaction, Value};

/// One stored column of an entity table.
#[derive(Debug, Clone, Copy)]
struct Column {
    field: &'static str,
    field_type: FieldType,
}

impl Column {
    fn all(meta: &EntityMeta) -> Vec<Self> {
        meta.fields
            .iter()
            .map(|f| Self {
                field: f.name,
                field_type: f.field_type,
            })
            .collect()
    }

    fn name(&self) -> String {
        if self.field_type.is_relation() {
            format!("{}_id", self.field)
        } else {
            self.field.to_string()
        }
    }
}

/// The connection statements run on. `Held` belongs to a transaction and
/// is `None` once that transaction has ended.
#[derive(Clone)]
enum Conn {
    Shared(Arc<Mutex<rusqlite::Connection>>),
    Held(Arc<Mutex<Option<OwnedMutexGuard<rusqlite::Connection>>>>),
}

impl Conn {
    /// Runs `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> CrudResult<T>
    where
        F: FnOnce(&rusqlite::Connection) -> CrudResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.clone();
        tokio::task::spawn_blocking(move || match conn {
            Conn::Shared(shared) => f(&shared.blocking_lock()),
            Conn::Held(held) => match held.blocking_lock().as_deref() {
                Some(conn) => f(conn),
                None => Err(transaction_closed()),
            },
        })
        .await
        .map_err(|e| CrudError::DatabaseError(format!("Task join error: {e}")))?
    }
}

/// Statement building shared by the store and its transactions.
struct Session {
    conn: Conn,
}

impl Session {
    async fn execute(&self, sql: String, params: Vec<Value>) -> CrudResult<usize> {
        tracing::trace!(%sql, "execute");
        self.conn
            .with_conn(move |conn| {
                let mut stmt = conn.prepare(&sql).map_err(map_error)?;
                bind_params(&mut stmt, &params)?;
                stmt.raw_execute().map_err(map_error)
            })
            .await
    }

    async fn select(
        &self,
        meta: &EntityMeta,
        filter: Option<String>,
        params: Vec<Value>,
        window: Option<(usize, usize)>,
    ) -> CrudResult<Vec<Record>> {
        let columns = Column::all(meta);
        let mut sql = format!(
            "SELECT \"id\"{} FROM {}",
            columns
                .iter()
                .map(|c| format!(", {}", quote(&c.name())))
                .collect::<String>(),
            quote(&meta.db_table)
        );
        if let Some(filter) = filter {
            sql.push_str(" WHERE ");
            sql.push_str(&filter);
        }
        sql.push_str(&order_by(meta)?);
        if let Some((offset, limit)) = window {
            sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}"));
        }
        tracing::trace!(%sql, "select");

        self.conn
            .with_conn(move |conn| {
                let mut stmt = conn.prepare(&sql).map_err(map_error)?;
                bind_params(&mut stmt, &params)?;
                let mut rows = stmt.raw_query();
                let mut records = Vec::new();
                while let Some(row) = rows.next().map_err(map_error)? {
                    records.push(convert_row(row, &columns)?);
                }
                Ok(records)
            })
            .await
    }

    async fn register(&self, meta: &'static EntityMeta) -> CrudResult<()> {
        let sql = create_table_sql(meta);
        tracing::debug!(table = %meta.db_table, "creating table");
        self.execute(sql, Vec::new()).await.map(drop)
    }

    async fn fetch(&self, meta: &EntityMeta, pk: i64) -> CrudResult<Option<Record>> {
        Ok(self
            .select(meta, Some("\"id\" = ?".to_string()), vec![Value::Int(pk)], None)
            .await?
            .into_iter()
            .next())
    }

    async fn filter_pks(&self, meta: &EntityMeta, pks: &[i64]) -> CrudResult<Vec<Record>> {
        if pks.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; pks.len()].join(", ");
        let params = pks.iter().copied().map(Value::Int).collect();
        self.select(meta, Some(format!("\"id\" IN ({placeholders})")), params, None)
            .await
    }

    async fn filter_eq(
        &self,
        meta: &EntityMeta,
        field: &str,
        value: &Value,
    ) -> CrudResult<Vec<Record>> {
        let column = column_for(meta, field)?;
        if value.is_null() {
            self.select(meta, Some(format!("{column} IS NULL")), Vec::new(), None)
                .await
        } else {
            self.select(meta, Some(format!("{column} = ?")), vec![value.clone()], None)
                .await
        }
    }

    async fn insert(&self, meta: &EntityMeta, record: &Record) -> CrudResult<i64> {
        let columns: Vec<String> = meta.fields.iter().map(|f| quote(&f.column())).collect();
        let sql = if columns.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", quote(&meta.db_table))
        } else {
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote(&meta.db_table),
                columns.join(", "),
                vec!["?"; columns.len()].join(", ")
            )
        };
        let params = field_params(meta, record);
        let pk = self
            .conn
            .with_conn(move |conn| {
                let mut stmt = conn.prepare(&sql).map_err(map_error)?;
                bind_params(&mut stmt, &params)?;
                stmt.raw_execute().map_err(map_error)?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        tracing::debug!(table = %meta.db_table, pk, "inserted row");
        Ok(pk)
    }

    async fn update(&self, meta: &EntityMeta, record: &Record) -> CrudResult<()> {
        let pk = record.require_pk()?;
        if meta.fields.is_empty() {
            return match self.fetch(meta, pk).await? {
                Some(_) => Ok(()),
                None => Err(CrudError::NotFound(format!("{} {pk}", meta.verbose_name))),
            };
        }
        let assignments: Vec<String> = meta
            .fields
            .iter()
            .map(|f| format!("{} = ?", quote(&f.column())))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE \"id\" = ?",
            quote(&meta.db_table),
            assignments.join(", ")
        );
        let mut params = field_params(meta, record);
        params.push(Value::Int(pk));
        if self.execute(sql, params).await? == 0 {
            return Err(CrudError::NotFound(format!("{} {pk}", meta.verbose_name)));
        }
        tracing::debug!(table = %meta.db_table, pk, "updated row");
        Ok(())
    }

    async fn delete(&self, meta: &EntityMeta, pk: i64) -> CrudResult<bool> {
        let sql = format!("DELETE FROM {} WHERE \"id\" = ?", quote(&meta.db_table));
        let deleted = self.execute(sql, vec![Value::Int(pk)]).await? > 0;
        tracing::debug!(table = %meta.db_table, pk, deleted, "deleted row");
        Ok(deleted)
    }

    async fn count(&self, meta: &EntityMeta) -> CrudResult<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote(&meta.db_table));
        self.conn
            .with_conn(move |conn| {
                let n: i64 = conn
                    .query_row(&sql, [], |row| row.get(0))
                    .map_err(map_error)?;
                usize::try_from(n).map_err(|e| CrudError::DatabaseError(e.to_string()))
            })
            .await
    }
}

/// A `SQLite`-backed [`EntityStore`].
///
/// # Examples
///
/// ```
/// use singleurlcrud_db_backends::SqliteStore;
///
/// let store = SqliteStore::memory().unwrap();
/// assert_eq!(store.path().to_str(), Some(":memory:"));
/// ```
pub struct SqliteStore {
    path: PathBuf,
    conn: Arc<Mutex<rusqlite::Connection>>,
    session: Session,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Opens (or creates) the database at `path`; `:memory:` opens a
    /// private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns `OperationalError` if the database cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> CrudResult<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = if path.to_str() == Some(":memory:") {
            rusqlite::Connection::open_in_memory()
        } else {
            rusqlite::Connection::open(&path)
        }
        .map_err(|e| CrudError::OperationalError(format!("SQLite open failed: {e}")))?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .map_err(|e| CrudError::OperationalError(format!("Failed to set pragmas: {e}")))?;

        let conn = Arc::new(Mutex::new(conn));
        Ok(Self {
            path,
            session: Session {
                conn: Conn::Shared(Arc::clone(&conn)),
            },
            conn,
        })
    }

    /// Opens an in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created.
    pub fn memory() -> CrudResult<Self> {
        Self::open(":memory:")
    }

    /// Returns the database file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn column_for(meta: &EntityMeta, field: &str) -> CrudResult<String> {
    if field == "id" || field == "pk" {
        return Ok(quote("id"));
    }
    meta.get_field(field)
        .map(|f| quote(&f.column()))
        .ok_or_else(|| {
            CrudError::ConfigurationError(format!(
                "'{}' has no field named '{field}'",
                meta.db_table
            ))
        })
}

fn order_by(meta: &EntityMeta) -> CrudResult<String> {
    let mut parts = Vec::new();
    for key in &meta.ordering {
        let (field, dir) = key
            .strip_prefix('-')
            .map_or((key.as_str(), "ASC"), |f| (f, "DESC"));
        parts.push(format!("{} {dir}", column_for(meta, field)?));
    }
    parts.push("\"id\" ASC".to_string());
    Ok(format!(" ORDER BY {}", parts.join(", ")))
}

/// Generates the `CREATE TABLE` statement for a schema.
pub fn create_table_sql(meta: &EntityMeta) -> String {
    let mut defs = vec!["\"id\" INTEGER PRIMARY KEY AUTOINCREMENT".to_string()];
    for field in &meta.fields {
        let sql_type = match field.field_type {
            FieldType::Char | FieldType::Text | FieldType::Email => "TEXT",
            FieldType::Integer | FieldType::Boolean | FieldType::ForeignKey { .. } => "INTEGER",
            FieldType::Float => "REAL",
            FieldType::Date | FieldType::DateTime => "TEXT",
        };
        let mut def = format!("{} {sql_type}", quote(&field.column()));
        if !field.null {
            def.push_str(" NOT NULL");
        }
        if field.unique {
            def.push_str(" UNIQUE");
        }
        if let FieldType::ForeignKey { to, on_delete } = field.field_type {
            let action = match on_delete {
                OnDelete::Cascade => "CASCADE",
                OnDelete::SetNull => "SET NULL",
            };
            def.push_str(&format!(
                " REFERENCES {}(\"id\") ON DELETE {action}",
                quote(&to().db_table)
            ));
        }
        defs.push(def);
    }
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote(&meta.db_table),
        defs.join(", ")
    )
}

/// Binds values to a statement. Dates and datetimes become ISO text.
fn bind_params(stmt: &mut rusqlite::Statement<'_>, params: &[Value]) -> CrudResult<()> {
    for (i, param) in params.iter().enumerate() {
        let idx = i + 1;
        match param {
            Value::Null => stmt.raw_bind_parameter(idx, rusqlite::types::Null),
            Value::Bool(b) => stmt.raw_bind_parameter(idx, b),
            Value::Int(v) => stmt.raw_bind_parameter(idx, v),
            Value::Float(v) => stmt.raw_bind_parameter(idx, v),
            Value::String(s) => stmt.raw_bind_parameter(idx, s.as_str()),
            Value::Date(d) => stmt.raw_bind_parameter(idx, d.format(DATE_FORMAT).to_string()),
            Value::DateTime(dt) => {
                stmt.raw_bind_parameter(idx, dt.format(DATETIME_FORMAT).to_string())
            }
        }
        .map_err(|e| CrudError::DatabaseError(format!("Bind error: {e}")))?;
    }
    Ok(())
}

/// Converts a row of `id` followed by `columns` to a record, restoring the
/// schema types `SQLite` does not keep.
fn convert_row(row: &rusqlite::Row<'_>, columns: &[Column]) -> CrudResult<Record> {
    let pk: i64 = row.get(0).map_err(map_error)?;
    let mut record = Record {
        pk: Some(pk),
        ..Record::default()
    };
    for (i, column) in columns.iter().enumerate() {
        let raw = row.get_ref(i + 1).map_err(map_error)?;
        record.set(column.field, from_sql(column, raw)?);
    }
    Ok(record)
}

fn from_sql(column: &Column, raw: ValueRef<'_>) -> CrudResult<Value> {
    let bad = || {
        CrudError::DatabaseError(format!(
            "column '{}' holds a value of the wrong type",
            column.name()
        ))
    };
    Ok(match (column.field_type, raw) {
        (_, ValueRef::Null) => Value::Null,
        (FieldType::Boolean, ValueRef::Integer(v)) => Value::Bool(v != 0),
        (FieldType::Float, ValueRef::Integer(v)) => Value::Float(v as f64),
        (_, ValueRef::Integer(v)) => Value::Int(v),
        (_, ValueRef::Real(v)) => Value::Float(v),
        (FieldType::Date, ValueRef::Text(t)) => {
            let s = std::str::from_utf8(t).map_err(|_| bad())?;
            Value::Date(NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|_| bad())?)
        }
        (FieldType::DateTime, ValueRef::Text(t)) => {
            let s = std::str::from_utf8(t).map_err(|_| bad())?;
            Value::DateTime(NaiveDateTime::parse_from_str(s, DATETIME_FORMAT).map_err(|_| bad())?)
        }
        (_, ValueRef::Text(t)) => Value::String(String::from_utf8_lossy(t).into_owned()),
        (_, ValueRef::Blob(_)) => return Err(bad()),
    })
}

/// Maps constraint violations to `IntegrityError`, everything else to
/// `DatabaseError`.
fn map_error(e: rusqlite::Error) -> CrudError {
    match &e {
        rusqlite::Error::SqliteFailure(err, msg) if err.code == ErrorCode::ConstraintViolation => {
            CrudError::IntegrityError(msg.clone().unwrap_or_else(|| e.to_string()))
        }
        _ => CrudError::DatabaseError(e.to_string()),
    }
}

fn field_params(meta: &EntityMeta, record: &Record) -> Vec<Value> {
    meta.fields
        .iter()
        .map(|f| record.get(f.name).clone())
        .collect()
}

#[async_trait]
impl EntityStore for SqliteStore {
    async fn register(&self, meta: &'static EntityMeta) -> CrudResult<()> {
        self.session.register(meta).await
    }

    async fn fetch(&self, meta: &EntityMeta, pk: i64) -> CrudResult<Option<Record>> {
        self.session.fetch(meta, pk).await
    }

    async fn list(&self, meta: &EntityMeta) -> CrudResult<Vec<Record>> {
        self.session.select(meta, None, Vec::new(), None).await
    }

    async fn list_page(
        &self,
        meta: &EntityMeta,
        offset: usize,
        limit: usize,
    ) -> CrudResult<Vec<Record>> {
        self.session
            .select(meta, None, Vec::new(), Some((offset, limit)))
            .await
    }

    async fn filter_pks(&self, meta: &EntityMeta, pks: &[i64]) -> CrudResult<Vec<Record>> {
        self.session.filter_pks(meta, pks).await
    }

    async fn filter_eq(
        &self,
        meta: &EntityMeta,
        field: &str,
        value: &Value,
    ) -> CrudResult<Vec<Record>> {
        self.session.filter_eq(meta, field, value).await
    }

    async fn insert(&self, meta: &EntityMeta, record: &Record) -> CrudResult<i64> {
        self.session.insert(meta, record).await
    }

    async fn update(&self, meta: &EntityMeta, record: &Record) -> CrudResult<()> {
        self.session.update(meta, record).await
    }

    async fn delete(&self, meta: &EntityMeta, pk: i64) -> CrudResult<bool> {
        self.session.delete(meta, pk).await
    }

    async fn count(&self, meta: &EntityMeta) -> CrudResult<usize> {
        self.session.count(meta).await
    }

    async fn begin(&self) -> CrudResult<Box<dyn Transaction>> {
        let held = Arc::new(Mutex::new(Some(Arc::clone(&self.conn).lock_owned().await)));
        let tx = SqliteTransaction {
            session: Session {
                conn: Conn::Held(Arc::clone(&held)),
            },
            held,
        };
        if let Err(e) = tx.session.execute("BEGIN".to_string(), Vec::new()).await {
            tx.held.lock().await.take();
            return Err(e);
        }
        Ok(Box::new(tx))
    }
}

/// An open `SQLite` transaction, holding the store's connection.
struct SqliteTransaction {
    session: Session,
    held: Arc<Mutex<Option<OwnedMutexGuard<rusqlite::Connection>>>>,
}

impl SqliteTransaction {
    /// Runs `COMMIT` or `ROLLBACK` and hands the connection back.
    async fn finish(&self, commit: bool) -> CrudResult<()> {
        let held = Arc::clone(&self.held);
        tokio::task::spawn_blocking(move || {
            let conn = held.blocking_lock().take().ok_or_else(transaction_closed)?;
            if !commit {
                return conn.execute_batch("ROLLBACK").map_err(map_error);
            }
            let result = conn.execute_batch("COMMIT").map_err(map_error);
            if result.is_err() {
                if let Err(e) = conn.execute_batch("ROLLBACK") {
                    tracing::error!(error = %e, "rollback after failed commit failed");
                }
            }
            result
        })
        .await
        .map_err(|e| CrudError::DatabaseError(format!("Task join error: {e}")))?
    }
}

#[async_trait]
impl EntityStore for SqliteTransaction {
    async fn register(&self, meta: &'static EntityMeta) -> CrudResult<()> {
        self.session.register(meta).await
    }

    async fn fetch(&self, meta: &EntityMeta, pk: i64) -> CrudResult<Option<Record>> {
        self.session.fetch(meta, pk).await
    }

    async fn list(&self, meta: &EntityMeta) -> CrudResult<Vec<Record>> {
        self.session.select(meta, None, Vec::new(), None).await
    }

    async fn list_page(
        &self,
        meta: &EntityMeta,
        offset: usize,
        limit: usize,
    ) -> CrudResult<Vec<Record>> {
        self.session
            .select(meta, None, Vec::new(), Some((offset, limit)))
            .await
    }

    async fn filter_pks(&self, meta: &EntityMeta, pks: &[i64]) -> CrudResult<Vec<Record>> {
        self.session.filter_pks(meta, pks).await
    }

    async fn filter_eq(
        &self,
        meta: &EntityMeta,
        field: &str,
        value: &Value,
    ) -> CrudResult<Vec<Record>> {
        self.session.filter_eq(meta, field, value).await
    }

    async fn insert(&self, meta: &EntityMeta, record: &Record) -> CrudResult<i64> {
        self.session.insert(meta, record).await
    }

    async fn update(&self, meta: &EntityMeta, record: &Record) -> CrudResult<()> {
        self.session.update(meta, record).await
    }

    async fn delete(&self, meta: &EntityMeta, pk: i64) -> CrudResult<bool> {
        self.session.delete(meta, pk).await
    }

    async fn count(&self, meta: &EntityMeta) -> CrudResult<usize> {
        self.session.count(meta).await
    }

    async fn begin(&self) -> CrudResult<Box<dyn Transaction>> {
        Err(nested_transaction())
    }
}

#[async_trait]
impl Transaction for SqliteTransaction {
    fn as_store(&self) -> &(dyn EntityStore + 'static) {
        self
    }

    async fn commit(&self) -> CrudResult<()> {
        self.finish(true).await
    }

    async fn rollback(&self) -> CrudResult<()> {
        self.finish(false).await
    }
}

impl Drop for SqliteTransaction {
    fn drop(&mut self) {
        if self.held.try_lock().is_ok_and(|held| held.is_none()) {
            return;
        }
        tracing::warn!("transaction dropped before it finished; rolling back");
        let held = Arc::clone(&self.held);
        let rollback = move || {
            if let Some(conn) = held.blocking_lock().take() {
                if let Err(e) = conn.execute_batch("ROLLBACK") {
                    tracing::error!(error = %e, "rollback of dropped transaction failed");
                }
            }
        };
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => drop(runtime.spawn_blocking(rollback)),
            Err(_) => rollback(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::LazyLock;

    use singleurlcrud_db::FieldDef;

    use super::*;

    fn tag_meta() -> &'static EntityMeta {
        static META: LazyLock<EntityMeta> = LazyLock::new(|| {
            EntityMeta::new(
                "t",
                "tag",
                vec![
                    FieldDef::new("label", FieldType::Char).unique(),
                    FieldDef::new("hidden", FieldType::Boolean).default(false),
                    FieldDef::new("created", FieldType::Date).nullable(),
                ],
            )
            .ordering(&["-label"])
        });
        &META
    }

    #[test]
    fn test_create_table_sql() {
        let sql = create_table_sql(tag_meta());
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS \"t_tag\""));
        assert!(sql.contains("\"label\" TEXT NOT NULL UNIQUE"));
        assert!(sql.contains("\"created\" TEXT,") || sql.ends_with("\"created\" TEXT)"));
    }

    #[test]
    fn test_order_by_descending_then_id() {
        assert_eq!(
            order_by(tag_meta()).unwrap(),
            " ORDER BY \"label\" DESC, \"id\" ASC"
        );
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("a\"b"), "\"a\"\"b\"");
    }

    #[tokio::test]
    async fn test_round_trip_types() {
        let store = SqliteStore::memory().unwrap();
        store.register(tag_meta()).await.unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let pk = store
            .insert(
                tag_meta(),
                &Record::new(
                    None,
                    [
                        ("label", Value::from("x")),
                        ("hidden", Value::Bool(true)),
                        ("created", Value::Date(date)),
                    ],
                ),
            )
            .await
            .unwrap();
        let rec = store.fetch(tag_meta(), pk).await.unwrap().unwrap();
        assert_eq!(rec.get("hidden"), &Value::Bool(true));
        assert_eq!(rec.get("created"), &Value::Date(date));
    }

    #[tokio::test]
    async fn test_unique_is_integrity_error() {
        let store = SqliteStore::memory().unwrap();
        store.register(tag_meta()).await.unwrap();
        let rec = Record::new(None, [("label", Value::from("dup")), ("hidden", Value::Bool(false))]);
        store.insert(tag_meta(), &rec).await.unwrap();
        let err = store.insert(tag_meta(), &rec).await.unwrap_err();
        match err {
            CrudError::IntegrityError(msg) => {
                assert_eq!(msg, "UNIQUE constraint failed: t_tag.label");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
