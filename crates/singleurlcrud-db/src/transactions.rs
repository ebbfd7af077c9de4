//! Transaction support.
//!
//! [`EntityStore::begin`] hands out a [`Transaction`]: a store of its own
//! whose writes stay invisible to other readers until
//! [`commit`](Transaction::commit). A transaction that is dropped without
//! being committed rolls back, so a request future cancelled half way
//! through a save leaves neither rows behind nor the store locked.
//!
//! [`atomic`] runs a closure inside a transaction: commit on `Ok`,
//! rollback on `Err`. Transactions do not nest.
//!
//! # Examples
//!
//! ```ignore
//! use singleurlcrud_db::transactions::atomic;
//!
//! let pk = atomic(store, |tx| async move {
//!     let pk = tx.insert(Question::meta(), &question.to_record()).await?;
//!     tx.insert(Choice::meta(), &choice_for(pk)).await?;
//!     Ok(pk)
//! })
//! .await?;
//! ```

use std::fmt;
use std::future::Future;
use std::ops::Deref;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use singleurlcrud_core::{CrudError, CrudResult};

use crate::store::EntityStore;

/// An open store transaction.
///
/// Reads and writes made through the transaction's own [`EntityStore`]
/// methods see its uncommitted changes; nobody else does. Implementations
/// roll back in `Drop` when neither `commit` nor `rollback` ran. Once
/// finished, every further call fails with `OperationalError`.
#[async_trait]
pub trait Transaction: EntityStore {
    /// The transaction as a plain store, for helpers taking
    /// `&dyn EntityStore`.
    fn as_store(&self) -> &(dyn EntityStore + 'static);

    /// Makes the transaction's writes visible and ends it.
    async fn commit(&self) -> CrudResult<()>;

    /// Discards the transaction's writes and ends it.
    async fn rollback(&self) -> CrudResult<()>;
}

/// The error every call on a finished transaction returns.
pub fn transaction_closed() -> CrudError {
    CrudError::OperationalError("the transaction has already finished".to_string())
}

/// The error `begin` returns on a transaction.
pub fn nested_transaction() -> CrudError {
    CrudError::OperationalError("transactions do not nest".to_string())
}

/// A shared handle to an open transaction, passed to [`atomic`]'s closure.
///
/// Dereferences to the transaction's store, so entity helpers take `&tx`.
#[derive(Clone)]
pub struct Tx(Arc<dyn Transaction>);

impl Deref for Tx {
    type Target = dyn EntityStore;

    fn deref(&self) -> &Self::Target {
        self.0.as_store()
    }
}

impl fmt::Debug for Tx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tx").finish_non_exhaustive()
    }
}

/// Executes `f` within a store transaction.
///
/// If the closure returns `Ok`, the transaction is committed. If it returns
/// `Err`, the transaction is rolled back and the closure's error returned;
/// a failing rollback is logged, not reported. Dropping the returned future
/// before it completes also rolls back.
pub async fn atomic<F, Fut, T>(store: &dyn EntityStore, f: F) -> CrudResult<T>
where
    F: FnOnce(Tx) -> Fut,
    Fut: Future<Output = CrudResult<T>>,
{
    let tx = Tx(Arc::from(store.begin().await?));

    match f(tx.clone()).await {
        Ok(result) => {
            tx.0.commit().await?;
            Ok(result)
        }
        Err(e) => {
            if let Err(rollback_err) = tx.0.rollback().await {
                tracing::error!(error = %rollback_err, "rollback failed");
            }
            Err(e)
        }
    }
}

/// Serializes writers on a shared store.
///
/// [`enter`](Self::enter) waits until no other permit is alive. The permit
/// releases the gate when dropped, however its holder ends.
#[derive(Debug, Default, Clone)]
pub struct TransactionGate {
    lock: Arc<Mutex<()>>,
}

/// Proof of holding a [`TransactionGate`].
#[derive(Debug)]
pub struct GatePermit {
    _guard: OwnedMutexGuard<()>,
}

impl TransactionGate {
    /// Creates an open gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until the gate is free, then holds it until the permit drops.
    pub async fn enter(&self) -> GatePermit {
        GatePermit {
            _guard: Arc::clone(&self.lock).lock_owned().await,
        }
    }

    /// Returns `true` while a permit is alive.
    pub fn is_held(&self) -> bool {
        self.lock.try_lock().is_err()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_gate_enter_and_drop() {
        let gate = TransactionGate::new();
        assert!(!gate.is_held());
        let permit = gate.enter().await;
        assert!(gate.is_held());
        drop(permit);
        assert!(!gate.is_held());
    }

    #[tokio::test]
    async fn test_gate_serializes() {
        let gate = TransactionGate::new();
        let permit = gate.enter().await;

        let second = {
            let gate = gate.clone();
            tokio::spawn(async move {
                let _permit = gate.enter().await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!second.is_finished());
        drop(permit);
        second.await.unwrap();
    }

    #[tokio::test]
    async fn test_gate_released_when_holder_is_cancelled() {
        let gate = TransactionGate::new();
        let holder = {
            let gate = gate.clone();
            async move {
                let _permit = gate.enter().await;
                std::future::pending::<()>().await;
            }
        };
        assert!(tokio::time::timeout(Duration::from_millis(20), holder)
            .await
            .is_err());
        assert!(!gate.is_held());
        tokio::time::timeout(Duration::from_millis(500), gate.enter())
            .await
            .unwrap();
    }
}
