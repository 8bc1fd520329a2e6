//! The handle a transaction body sees.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{DocKey, Snapshot, StoreError, Update};

/// Point reads against committed state, used by [`Transaction`] to fill
/// its read set. Implemented by each store backend.
pub trait ReadSource: Sync {
    fn read(&self, key: &DocKey) -> Result<Option<Snapshot>, StoreError>;
}

/// A buffered write, applied at commit.
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    /// Replace the whole document.
    Set { key: DocKey, data: Value },
    /// Apply a sparse update to an existing document.
    Update { key: DocKey, update: Update },
}

impl Write {
    pub fn key(&self) -> &DocKey {
        match self {
            Self::Set { key, .. } | Self::Update { key, .. } => key,
        }
    }
}

/// The version a document had when the transaction first read it.
/// `version == 0` records that the document was absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadRecord<'k> {
    pub key: &'k DocKey,
    pub version: u64,
}

/// What a finished body hands to the commit step.
#[derive(Debug)]
pub struct TransactionParts {
    pub reads: Vec<(DocKey, u64)>,
    pub writes: Vec<Write>,
}

impl TransactionParts {
    pub fn read_records(&self) -> impl Iterator<Item = ReadRecord<'_>> {
        self.reads
            .iter()
            .map(|(key, version)| ReadRecord { key, version: *version })
    }
}

/// One attempt of an optimistic transaction.
///
/// Reads go through the backing store once per key and are cached, so a
/// body sees a stable view of every document it touches. All reads must
/// happen before the first write.
pub struct Transaction<'a> {
    source: &'a dyn ReadSource,
    reads: BTreeMap<DocKey, Option<Snapshot>>,
    writes: Vec<Write>,
}

impl<'a> Transaction<'a> {
    pub fn new(source: &'a dyn ReadSource) -> Self {
        Self {
            source,
            reads: BTreeMap::new(),
            writes: Vec::new(),
        }
    }

    /// Reads a document, recording its version for commit-time validation.
    ///
    /// # Errors
    /// Returns [`StoreError::ReadAfterWrite`] once a write has been
    /// buffered.
    pub fn get(&mut self, key: &DocKey) -> Result<Option<Snapshot>, StoreError> {
        if let Some(cached) = self.reads.get(key) {
            return Ok(cached.clone());
        }
        if !self.writes.is_empty() {
            return Err(StoreError::ReadAfterWrite(key.clone()));
        }
        let snapshot = self.source.read(key)?;
        self.reads.insert(key.clone(), snapshot.clone());
        Ok(snapshot)
    }

    /// [`get`](Self::get), decoded into `T`.
    pub fn get_as<T: DeserializeOwned>(&mut self, key: &DocKey) -> Result<Option<T>, StoreError> {
        self.get(key)?.map(|snapshot| snapshot.decode()).transpose()
    }

    /// Buffers a full-document write.
    pub fn set(&mut self, key: &DocKey, data: Value) {
        self.writes.push(Write::Set {
            key: key.clone(),
            data,
        });
    }

    /// Buffers a sparse update. The document must exist at commit.
    pub fn update(&mut self, key: &DocKey, update: Update) {
        self.writes.push(Write::Update {
            key: key.clone(),
            update,
        });
    }

    pub fn into_parts(self) -> TransactionParts {
        let reads = self
            .reads
            .into_iter()
            .map(|(key, snapshot)| {
                let version = snapshot.map_or(0, |s| s.version);
                (key, version)
            })
            .collect();
        TransactionParts {
            reads,
            writes: self.writes,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;

    struct Fixed {
        docs: HashMap<DocKey, Snapshot>,
        reads: AtomicUsize,
    }

    impl ReadSource for Fixed {
        fn read(&self, key: &DocKey) -> Result<Option<Snapshot>, StoreError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(self.docs.get(key).cloned())
        }
    }

    fn source() -> Fixed {
        let key = DocKey::new("users", "alice");
        let snapshot = Snapshot {
            key: key.clone(),
            version: 7,
            data: json!({ "btcBalance": 5 }),
        };
        Fixed {
            docs: HashMap::from([(key, snapshot)]),
            reads: AtomicUsize::new(0),
        }
    }

    #[test]
    fn test_get_caches_repeated_reads() {
        let source = source();
        let mut tx = Transaction::new(&source);
        let key = DocKey::new("users", "alice");

        tx.get(&key).unwrap();
        tx.get(&key).unwrap();

        assert_eq!(source.reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_get_after_write_is_rejected() {
        let source = source();
        let mut tx = Transaction::new(&source);
        tx.set(&DocKey::new("users", "bob"), json!({}));

        let result = tx.get(&DocKey::new("users", "alice"));
        assert!(matches!(result, Err(StoreError::ReadAfterWrite(_))));
    }

    #[test]
    fn test_into_parts_records_absent_reads_as_version_zero() {
        let source = source();
        let mut tx = Transaction::new(&source);
        tx.get(&DocKey::new("users", "alice")).unwrap();
        tx.get(&DocKey::new("users", "ghost")).unwrap();

        let parts = tx.into_parts();
        let versions: Vec<_> = parts.read_records().map(|r| (r.key.id().to_string(), r.version)).collect();

        assert_eq!(versions, vec![("alice".to_string(), 7), ("ghost".to_string(), 0)]);
    }
}
