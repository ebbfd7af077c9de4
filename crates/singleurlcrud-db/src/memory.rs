//! An in-process [`EntityStore`].
//!
//! [`MemoryStore`] keeps every registered table in a map guarded by a tokio
//! mutex. A transaction works on a private copy of the dataset and swaps it
//! in on commit, so readers only ever see committed rows and dropping the
//! transaction discards its writes. Writers, transactional or not, take
//! turns through a [`TransactionGate`]. Unique fields, foreign-key
//! existence, and delete behavior are enforced the way the `SQLite` backend
//! enforces them.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use singleurlcrud_core::{CrudError, CrudResult};

use crate::fields::{FieldType, OnDelete};
use crate::model::{EntityMeta, Record};
use crate::store::EntityStore;
use crate::transactions::{
    nested_transaction, transaction_closed, GatePermit, Transaction, TransactionGate,
};
use crate::value::Value;

#[derive(Debug, Clone)]
struct Table {
    meta: &'static EntityMeta,
    next_id: i64,
    rows: BTreeMap<i64, HashMap<String, Value>>,
}

#[derive(Debug, Clone, Default)]
struct Dataset {
    tables: HashMap<String, Table>,
}

impl Dataset {
    fn table(&self, meta: &EntityMeta) -> CrudResult<&Table> {
        self.tables.get(&meta.db_table).ok_or_else(|| unregistered(meta))
    }

    fn table_mut(&mut self, meta: &EntityMeta) -> CrudResult<&mut Table> {
        self.tables
            .get_mut(&meta.db_table)
            .ok_or_else(|| unregistered(meta))
    }

    fn register(&mut self, meta: &'static EntityMeta) {
        self.tables
            .entry(meta.db_table.clone())
            .or_insert_with(|| Table {
                meta,
                next_id: 1,
                rows: BTreeMap::new(),
            });
    }

    fn records(&self, meta: &EntityMeta, pks: Option<&[i64]>) -> CrudResult<Vec<Record>> {
        let mut records: Vec<Record> = self
            .table(meta)?
            .rows
            .iter()
            .filter(|(id, _)| pks.map_or(true, |p| p.contains(id)))
            .map(|(id, values)| Record {
                pk: Some(*id),
                values: values.clone(),
            })
            .collect();
        sort_records(meta, &mut records);
        Ok(records)
    }

    fn fetch(&self, meta: &EntityMeta, pk: i64) -> CrudResult<Option<Record>> {
        Ok(self.table(meta)?.rows.get(&pk).map(|values| Record {
            pk: Some(pk),
            values: values.clone(),
        }))
    }

    fn list_page(&self, meta: &EntityMeta, offset: usize, limit: usize) -> CrudResult<Vec<Record>> {
        Ok(self
            .records(meta, None)?
            .into_iter()
            .skip(offset)
            .take(limit)
            .collect())
    }

    fn filter_eq(&self, meta: &EntityMeta, field: &str, value: &Value) -> CrudResult<Vec<Record>> {
        let mut records = self.records(meta, None)?;
        records.retain(|r| r.get(field) == value);
        Ok(records)
    }

    fn count(&self, meta: &EntityMeta) -> CrudResult<usize> {
        Ok(self.table(meta)?.rows.len())
    }

    fn insert(&mut self, meta: &EntityMeta, record: &Record) -> CrudResult<i64> {
        self.check_constraints(meta, None, &record.values)?;
        let table = self.table_mut(meta)?;
        let pk = table.next_id;
        table.next_id += 1;
        table.rows.insert(pk, record.values.clone());
        tracing::debug!(table = %meta.db_table, pk, "inserted row");
        Ok(pk)
    }

    fn update(&mut self, meta: &EntityMeta, record: &Record) -> CrudResult<()> {
        let pk = record.require_pk()?;
        if !self.table(meta)?.rows.contains_key(&pk) {
            return Err(CrudError::NotFound(format!("{} {pk}", meta.verbose_name)));
        }
        self.check_constraints(meta, Some(pk), &record.values)?;
        self.table_mut(meta)?.rows.insert(pk, record.values.clone());
        tracing::debug!(table = %meta.db_table, pk, "updated row");
        Ok(())
    }

    fn delete(&mut self, meta: &EntityMeta, pk: i64) -> CrudResult<bool> {
        self.table(meta)?;
        let deleted = self.delete_row(&meta.db_table, pk);
        tracing::debug!(table = %meta.db_table, pk, deleted, "deleted row");
        Ok(deleted)
    }

    /// Checks unique fields and foreign-key targets for a row about to be
    /// written under `pk` (`None` for inserts).
    fn check_constraints(
        &self,
        meta: &EntityMeta,
        pk: Option<i64>,
        values: &HashMap<String, Value>,
    ) -> CrudResult<()> {
        let table = self.table(meta)?;
        for field in &meta.fields {
            let value = values.get(field.name).unwrap_or(&Value::Null);
            if value.is_null() {
                if !field.null {
                    return Err(CrudError::IntegrityError(format!(
                        "NOT NULL constraint failed: {}.{}",
                        meta.db_table,
                        field.column()
                    )));
                }
                continue;
            }
            if field.unique
                && table
                    .rows
                    .iter()
                    .any(|(id, row)| Some(*id) != pk && row.get(field.name) == Some(value))
            {
                return Err(CrudError::IntegrityError(format!(
                    "UNIQUE constraint failed: {}.{}",
                    meta.db_table,
                    field.column()
                )));
            }
            if let FieldType::ForeignKey { to, .. } = field.field_type {
                let target = to();
                let exists = match (self.tables.get(&target.db_table), value.as_int()) {
                    (Some(t), Some(id)) => t.rows.contains_key(&id),
                    (None, _) => true,
                    (Some(_), None) => false,
                };
                if !exists {
                    return Err(CrudError::IntegrityError(format!(
                        "FOREIGN KEY constraint failed: {}.{}",
                        meta.db_table,
                        field.column()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Removes a row and applies delete behavior to rows referencing it.
    fn delete_row(&mut self, db_table: &str, pk: i64) -> bool {
        let removed = self
            .tables
            .get_mut(db_table)
            .and_then(|t| t.rows.remove(&pk))
            .is_some();
        if !removed {
            return false;
        }

        let referencing: Vec<(String, &'static str, OnDelete)> = self
            .tables
            .values()
            .flat_map(|t| {
                t.meta.fields.iter().filter_map(move |f| match f.field_type {
                    FieldType::ForeignKey { to, on_delete } if to().db_table == db_table => {
                        Some((t.meta.db_table.clone(), f.name, on_delete))
                    }
                    _ => None,
                })
            })
            .collect();

        for (table_name, field, on_delete) in referencing {
            let hits: Vec<i64> = self.tables.get(&table_name).map_or_else(Vec::new, |t| {
                t.rows
                    .iter()
                    .filter(|(_, row)| row.get(field) == Some(&Value::Int(pk)))
                    .map(|(id, _)| *id)
                    .collect()
            });
            for id in hits {
                match on_delete {
                    OnDelete::Cascade => {
                        self.delete_row(&table_name, id);
                    }
                    OnDelete::SetNull => {
                        if let Some(row) = self
                            .tables
                            .get_mut(&table_name)
                            .and_then(|t| t.rows.get_mut(&id))
                        {
                            row.insert(field.to_string(), Value::Null);
                        }
                    }
                }
            }
        }
        true
    }
}

fn unregistered(meta: &EntityMeta) -> CrudError {
    CrudError::ConfigurationError(format!(
        "entity type '{}' is not registered with the store",
        meta.db_table
    ))
}

/// Sorts records by the meta's ordering, then by primary key.
pub(crate) fn sort_records(meta: &EntityMeta, records: &mut [Record]) {
    records.sort_by(|a, b| {
        for key in &meta.ordering {
            let (field, descending) = key
                .strip_prefix('-')
                .map_or((key.as_str(), false), |f| (f, true));
            let ord = a.get(field).ordering(b.get(field));
            let ord = if descending { ord.reverse() } else { ord };
            if ord.is_ne() {
                return ord;
            }
        }
        a.pk.cmp(&b.pk)
    });
}

/// A transactional in-memory store.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use singleurlcrud_db::{EntityStore, MemoryStore};
///
/// let store: Arc<dyn EntityStore> = Arc::new(MemoryStore::new());
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Arc<Mutex<Dataset>>,
    gate: TransactionGate,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn register(&self, meta: &'static EntityMeta) -> CrudResult<()> {
        let _permit = self.gate.enter().await;
        self.data.lock().await.register(meta);
        Ok(())
    }

    async fn fetch(&self, meta: &EntityMeta, pk: i64) -> CrudResult<Option<Record>> {
        self.data.lock().await.fetch(meta, pk)
    }

    async fn list(&self, meta: &EntityMeta) -> CrudResult<Vec<Record>> {
        self.data.lock().await.records(meta, None)
    }

    async fn list_page(
        &self,
        meta: &EntityMeta,
        offset: usize,
        limit: usize,
    ) -> CrudResult<Vec<Record>> {
        self.data.lock().await.list_page(meta, offset, limit)
    }

    async fn filter_pks(&self, meta: &EntityMeta, pks: &[i64]) -> CrudResult<Vec<Record>> {
        self.data.lock().await.records(meta, Some(pks))
    }

    async fn filter_eq(
        &self,
        meta: &EntityMeta,
        field: &str,
        value: &Value,
    ) -> CrudResult<Vec<Record>> {
        self.data.lock().await.filter_eq(meta, field, value)
    }

    async fn insert(&self, meta: &EntityMeta, record: &Record) -> CrudResult<i64> {
        let _permit = self.gate.enter().await;
        self.data.lock().await.insert(meta, record)
    }

    async fn update(&self, meta: &EntityMeta, record: &Record) -> CrudResult<()> {
        let _permit = self.gate.enter().await;
        self.data.lock().await.update(meta, record)
    }

    async fn delete(&self, meta: &EntityMeta, pk: i64) -> CrudResult<bool> {
        let _permit = self.gate.enter().await;
        self.data.lock().await.delete(meta, pk)
    }

    async fn count(&self, meta: &EntityMeta) -> CrudResult<usize> {
        self.data.lock().await.count(meta)
    }

    async fn begin(&self) -> CrudResult<Box<dyn Transaction>> {
        let permit = self.gate.enter().await;
        let data = self.data.lock().await.clone();
        Ok(Box::new(MemoryTransaction {
            committed: Arc::clone(&self.data),
            staged: Mutex::new(Some(Staged {
                data,
                _permit: permit,
            })),
        }))
    }
}

/// The private copy a transaction writes to, with the writer permit it
/// holds until it ends.
#[derive(Debug)]
struct Staged {
    data: Dataset,
    _permit: GatePermit,
}

/// A [`MemoryStore`] transaction. `staged` is `None` once it has ended.
#[derive(Debug)]
struct MemoryTransaction {
    committed: Arc<Mutex<Dataset>>,
    staged: Mutex<Option<Staged>>,
}

impl MemoryTransaction {
    async fn read<T>(&self, f: impl FnOnce(&Dataset) -> CrudResult<T>) -> CrudResult<T> {
        self.staged
            .lock()
            .await
            .as_ref()
            .ok_or_else(transaction_closed)
            .and_then(|staged| f(&staged.data))
    }

    async fn write<T>(&self, f: impl FnOnce(&mut Dataset) -> CrudResult<T>) -> CrudResult<T> {
        self.staged
            .lock()
            .await
            .as_mut()
            .ok_or_else(transaction_closed)
            .and_then(|staged| f(&mut staged.data))
    }
}

#[async_trait]
impl EntityStore for MemoryTransaction {
    async fn register(&self, meta: &'static EntityMeta) -> CrudResult<()> {
        self.write(|data| {
            data.register(meta);
            Ok(())
        })
        .await
    }

    async fn fetch(&self, meta: &EntityMeta, pk: i64) -> CrudResult<Option<Record>> {
        self.read(|data| data.fetch(meta, pk)).await
    }

    async fn list(&self, meta: &EntityMeta) -> CrudResult<Vec<Record>> {
        self.read(|data| data.records(meta, None)).await
    }

    async fn list_page(
        &self,
        meta: &EntityMeta,
        offset: usize,
        limit: usize,
    ) -> CrudResult<Vec<Record>> {
        self.read(|data| data.list_page(meta, offset, limit)).await
    }

    async fn filter_pks(&self, meta: &EntityMeta, pks: &[i64]) -> CrudResult<Vec<Record>> {
        self.read(|data| data.records(meta, Some(pks))).await
    }

    async fn filter_eq(
        &self,
        meta: &EntityMeta,
        field: &str,
        value: &Value,
    ) -> CrudResult<Vec<Record>> {
        self.read(|data| data.filter_eq(meta, field, value)).await
    }

    async fn insert(&self, meta: &EntityMeta, record: &Record) -> CrudResult<i64> {
        self.write(|data| data.insert(meta, record)).await
    }

    async fn update(&self, meta: &EntityMeta, record: &Record) -> CrudResult<()> {
        self.write(|data| data.update(meta, record)).await
    }

    async fn delete(&self, meta: &EntityMeta, pk: i64) -> CrudResult<bool> {
        self.write(|data| data.delete(meta, pk)).await
    }

    async fn count(&self, meta: &EntityMeta) -> CrudResult<usize> {
        self.read(|data| data.count(meta)).await
    }

    async fn begin(&self) -> CrudResult<Box<dyn Transaction>> {
        Err(nested_transaction())
    }
}

#[async_trait]
impl Transaction for MemoryTransaction {
    fn as_store(&self) -> &(dyn EntityStore + 'static) {
        self
    }

    async fn commit(&self) -> CrudResult<()> {
        let mut committed = self.committed.lock().await;
        let staged = self.staged.lock().await.take().ok_or_else(transaction_closed)?;
        *committed = staged.data;
        tracing::debug!("committed transaction");
        Ok(())
    }

    async fn rollback(&self) -> CrudResult<()> {
        self.staged
            .lock()
            .await
            .take()
            .map(drop)
            .ok_or_else(transaction_closed)
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        if self.staged.get_mut().is_some() {
            tracing::warn!("transaction dropped before it finished; discarding its writes");
        }
    }
}
