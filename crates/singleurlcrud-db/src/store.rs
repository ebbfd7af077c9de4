//! The persistence seam.
//!
//! [`EntityStore`] is object-safe and record-based so one store instance
//! can serve every entity type. The free functions at the bottom of this
//! module add typed access on top of it.

use async_trait::async_trait;

use singleurlcrud_core::{CrudError, CrudResult};

use crate::model::{Entity, EntityMeta, Record};
use crate::transactions::Transaction;
use crate::value::Value;

/// CRUD persistence for records of registered entity types.
///
/// Stores enforce `unique` fields (returning
/// [`CrudError::IntegrityError`]) and apply foreign-key delete behavior.
/// [`begin`](EntityStore::begin) opens a [`Transaction`]; writers wait for
/// an open transaction to end, and readers outside it never see its
/// uncommitted rows. Use [`atomic`](crate::transactions::atomic) rather
/// than driving a transaction by hand.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Makes the store aware of an entity type, creating its table if
    /// needed. Registering twice is a no-op.
    async fn register(&self, meta: &'static EntityMeta) -> CrudResult<()>;

    /// Fetches one record by primary key.
    async fn fetch(&self, meta: &EntityMeta, pk: i64) -> CrudResult<Option<Record>>;

    /// Lists every record, in the meta's default ordering and then by
    /// primary key.
    async fn list(&self, meta: &EntityMeta) -> CrudResult<Vec<Record>>;

    /// Lists at most `limit` records after skipping `offset`, in the same
    /// order as [`list`](EntityStore::list).
    async fn list_page(
        &self,
        meta: &EntityMeta,
        offset: usize,
        limit: usize,
    ) -> CrudResult<Vec<Record>>;

    /// Returns the records whose primary key is in `pks`. Missing keys are
    /// skipped. Results follow the default ordering.
    async fn filter_pks(&self, meta: &EntityMeta, pks: &[i64]) -> CrudResult<Vec<Record>>;

    /// Returns the records whose `field` equals `value`.
    async fn filter_eq(&self, meta: &EntityMeta, field: &str, value: &Value)
        -> CrudResult<Vec<Record>>;

    /// Inserts a record and returns its new primary key. A `pk` already set
    /// on the record is ignored.
    async fn insert(&self, meta: &EntityMeta, record: &Record) -> CrudResult<i64>;

    /// Updates an existing record. Fails with `NotFound` if it is gone.
    async fn update(&self, meta: &EntityMeta, record: &Record) -> CrudResult<()>;

    /// Deletes a record, returning `false` if it did not exist.
    async fn delete(&self, meta: &EntityMeta, pk: i64) -> CrudResult<bool>;

    /// Counts the records of a type.
    async fn count(&self, meta: &EntityMeta) -> CrudResult<usize>;

    /// Opens a transaction, waiting for any other open transaction to end.
    ///
    /// Calling this on a transaction fails with `OperationalError`.
    async fn begin(&self) -> CrudResult<Box<dyn Transaction>>;
}

// ── Typed helpers ────────────────────────────────────────────────────

/// Fetches one entity by primary key.
pub async fn get<E: Entity>(store: &dyn EntityStore, pk: i64) -> CrudResult<Option<E>> {
    store
        .fetch(E::meta(), pk)
        .await?
        .map(|r| E::from_record(&r))
        .transpose()
}

/// Fetches one entity by primary key, mapping absence to `NotFound`.
pub async fn get_or_404<E: Entity>(store: &dyn EntityStore, pk: i64) -> CrudResult<E> {
    get(store, pk).await?.ok_or_else(|| {
        CrudError::NotFound(format!("No {} matches the given query", E::meta().verbose_name))
    })
}

/// Lists every entity of a type.
pub async fn all<E: Entity>(store: &dyn EntityStore) -> CrudResult<Vec<E>> {
    store
        .list(E::meta())
        .await?
        .iter()
        .map(E::from_record)
        .collect()
}

/// Lists one window of entities, in default order.
pub async fn list_page<E: Entity>(
    store: &dyn EntityStore,
    offset: usize,
    limit: usize,
) -> CrudResult<Vec<E>> {
    store
        .list_page(E::meta(), offset, limit)
        .await?
        .iter()
        .map(E::from_record)
        .collect()
}

/// Returns the entities with the given primary keys, skipping missing ones.
pub async fn filter_pks<E: Entity>(store: &dyn EntityStore, pks: &[i64]) -> CrudResult<Vec<E>> {
    store
        .filter_pks(E::meta(), pks)
        .await?
        .iter()
        .map(E::from_record)
        .collect()
}

/// Returns the entities whose `field` equals `value`.
pub async fn filter_eq<E: Entity>(
    store: &dyn EntityStore,
    field: &str,
    value: &Value,
) -> CrudResult<Vec<E>> {
    store
        .filter_eq(E::meta(), field, value)
        .await?
        .iter()
        .map(E::from_record)
        .collect()
}

/// Inserts or updates an entity depending on whether it has a primary key,
/// setting the key after an insert.
pub async fn save<E: Entity>(store: &dyn EntityStore, entity: &mut E) -> CrudResult<()> {
    let record = entity.to_record();
    if record.pk.is_some() {
        store.update(E::meta(), &record).await
    } else {
        let pk = store.insert(E::meta(), &record).await?;
        entity.set_pk(pk);
        Ok(())
    }
}

/// Deletes an entity. Unsaved entities are a `DatabaseError`.
pub async fn delete<E: Entity>(store: &dyn EntityStore, entity: &E) -> CrudResult<bool> {
    let pk = entity
        .pk()
        .ok_or_else(|| CrudError::DatabaseError("cannot delete an unsaved entity".to_string()))?;
    store.delete(E::meta(), pk).await
}
