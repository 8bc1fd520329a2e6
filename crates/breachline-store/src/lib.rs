//! Document store capability for Breachline.
//!
//! The core never talks to a database directly. It consumes the
//! [`Store`] trait: a keyed JSON-document store with
//!
//! - optimistic, retryable transactions ([`Store::run_transaction`]),
//! - sparse field updates ([`Update`]: set, atomic increment, set-union),
//! - create-if-absent writes for fresh keys ([`Store::create`]),
//! - a per-document change feed ([`Store::subscribe`]).
//!
//! # Transaction model
//!
//! ```text
//! attempt ─→ body(&mut Transaction) ─→ commit ─┬─→ Committed
//!    ↑            reads are recorded          │
//!    └──── backoff ←── Conflict (a read doc changed since it was read)
//! ```
//!
//! A transaction body is an `Fn` closure whose only view of the store is
//! the [`Transaction`] handle, so it can be re-executed as many times as
//! the driver needs. Writes are buffered and applied all-or-nothing at
//! commit; a body that returns `Err` aborts without writing anything.
//!
//! [`MemoryStore`] is the in-process implementation used by tests and the
//! reference server.

#![allow(async_fn_in_trait)]

mod document;
mod error;
mod memory;
mod policy;
mod transaction;

pub use document::{DocKey, FieldOp, FieldPath, Snapshot, Update, to_value};
pub use error::StoreError;
pub use memory::MemoryStore;
pub use policy::RetryPolicy;
pub use transaction::{ReadRecord, ReadSource, Transaction, TransactionParts, Write};

use std::future::Future;

use serde_json::Value;
use tokio::sync::broadcast;

/// A transactional key-document store.
///
/// All methods take `&self`: stores are shared behind an `Arc` by every
/// request task.
pub trait Store: Send + Sync + 'static {
    /// Reads a document outside any transaction.
    fn get(
        &self,
        key: &DocKey,
    ) -> impl Future<Output = Result<Option<Snapshot>, StoreError>> + Send;

    /// Writes a document only if no document exists under `key`.
    ///
    /// # Errors
    /// Returns [`StoreError::AlreadyExists`] if the key is taken.
    fn create(
        &self,
        key: &DocKey,
        data: Value,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Unconditionally replaces (or creates) a document.
    fn set(
        &self,
        key: &DocKey,
        data: Value,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Runs `body` as an optimistic transaction, retrying on conflict.
    ///
    /// `body` may run several times. Errors it returns abort the
    /// transaction immediately and are passed through untouched; store
    /// failures (including [`StoreError::RetriesExhausted`]) are converted
    /// into `E`.
    fn run_transaction<T, E, F>(&self, body: F) -> impl Future<Output = Result<T, E>> + Send
    where
        F: Fn(&mut Transaction<'_>) -> Result<T, E> + Send + Sync,
        T: Send,
        E: From<StoreError> + Send;

    /// Subscribes to committed changes of one document.
    ///
    /// Every successful write to `key` after this call is delivered as a
    /// fresh [`Snapshot`]. Slow receivers observe
    /// [`broadcast::error::RecvError::Lagged`] and should re-read.
    fn subscribe(&self, key: &DocKey) -> broadcast::Receiver<Snapshot>;
}
