//! In-process [`Store`] implementation.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

use crate::{
    DocKey, ReadSource, RetryPolicy, Snapshot, Store, StoreError, Transaction, TransactionParts,
    Write,
};

/// Buffered snapshots per watched document before slow receivers lag.
const WATCH_CAPACITY: usize = 64;

/// A [`Store`] held entirely in memory.
///
/// Every committed write bumps a store-wide version counter; each document
/// remembers the version of its last write. A transaction commits only if
/// every document it read still carries the version it saw.
///
/// The mutex is only held for point reads and for the validate-and-install
/// step of a commit, never across an `.await`.
#[derive(Debug)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    policy: RetryPolicy,
}

#[derive(Debug, Default)]
struct Inner {
    docs: HashMap<DocKey, Snapshot>,
    version: u64,
    watchers: HashMap<DocKey, broadcast::Sender<Snapshot>>,
}

impl Inner {
    fn version_of(&self, key: &DocKey) -> u64 {
        self.docs.get(key).map_or(0, |s| s.version)
    }

    /// Installs `changes` under one fresh version and notifies watchers.
    fn install(&mut self, changes: BTreeMap<DocKey, Value>) {
        self.version += 1;
        let version = self.version;
        for (key, data) in changes {
            let snapshot = Snapshot {
                key: key.clone(),
                version,
                data,
            };
            if let Some(sender) = self.watchers.get(&key) {
                if sender.send(snapshot.clone()).is_err() {
                    self.watchers.remove(&key);
                }
            }
            self.docs.insert(key, snapshot);
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_policy(RetryPolicy::default())
    }

    pub fn with_policy(policy: RetryPolicy) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            policy: policy.validated(),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Writes a document immediately, outside any transaction, and returns
    /// its new version. Used to seed fixtures.
    pub fn insert(&self, key: DocKey, data: Value) -> u64 {
        let mut inner = self.lock();
        inner.install(BTreeMap::from([(key, data)]));
        inner.version
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.lock().docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Validates the read set and applies all writes, or nothing.
    ///
    /// Returns `Ok(false)` on a version conflict.
    fn commit(&self, parts: TransactionParts) -> Result<bool, StoreError> {
        let mut inner = self.lock();

        for read in parts.read_records() {
            let current = inner.version_of(read.key);
            if current != read.version {
                trace!(key = %read.key, seen = read.version, current, "read set is stale");
                return Ok(false);
            }
        }
        if parts.writes.is_empty() {
            return Ok(true);
        }

        let mut staged: BTreeMap<DocKey, Value> = BTreeMap::new();
        for write in parts.writes {
            match write {
                Write::Set { key, data } => {
                    staged.insert(key, data);
                }
                Write::Update { key, update } => {
                    let mut data = match staged.remove(&key) {
                        Some(data) => data,
                        None => inner
                            .docs
                            .get(&key)
                            .map(|s| s.data.clone())
                            .ok_or_else(|| StoreError::NotFound(key.clone()))?,
                    };
                    update.apply_to(&key, &mut data)?;
                    staged.insert(key, data);
                }
            }
        }

        inner.install(staged);
        Ok(true)
    }
}

impl ReadSource for MemoryStore {
    fn read(&self, key: &DocKey) -> Result<Option<Snapshot>, StoreError> {
        Ok(self.lock().docs.get(key).cloned())
    }
}

impl Store for MemoryStore {
    async fn get(&self, key: &DocKey) -> Result<Option<Snapshot>, StoreError> {
        self.read(key)
    }

    async fn create(&self, key: &DocKey, data: Value) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if inner.docs.contains_key(key) {
            return Err(StoreError::AlreadyExists(key.clone()));
        }
        inner.install(BTreeMap::from([(key.clone(), data)]));
        Ok(())
    }

    async fn set(&self, key: &DocKey, data: Value) -> Result<(), StoreError> {
        self.lock().install(BTreeMap::from([(key.clone(), data)]));
        Ok(())
    }

    async fn run_transaction<T, E, F>(&self, body: F) -> Result<T, E>
    where
        F: Fn(&mut Transaction<'_>) -> Result<T, E> + Send + Sync,
        T: Send,
        E: From<StoreError> + Send,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let (value, parts) = {
                let mut tx = Transaction::new(self);
                let value = body(&mut tx)?;
                (value, tx.into_parts())
            };

            if self.commit(parts)? {
                if attempt > 1 {
                    debug!(attempt, "transaction committed after retry");
                }
                return Ok(value);
            }

            if attempt >= self.policy.max_attempts {
                warn!(attempts = attempt, "transaction retries exhausted");
                return Err(StoreError::RetriesExhausted { attempts: attempt }.into());
            }
            let delay = self.policy.delay_for(attempt);
            debug!(
                attempt,
                delay_us = delay.as_micros() as u64,
                "transaction conflict, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    fn subscribe(&self, key: &DocKey) -> broadcast::Receiver<Snapshot> {
        let mut inner = self.lock();
        // Feeds whose receivers are all gone, including feeds of documents
        // that are never written again.
        inner.watchers.retain(|_, sender| sender.receiver_count() > 0);
        inner
            .watchers
            .entry(key.clone())
            .or_insert_with(|| broadcast::channel(WATCH_CAPACITY).0)
            .subscribe()
    }
}
