//! Optimistic transaction behaviour of `MemoryStore`: conflict detection,
//! retry, exhaustion, and all-or-nothing commits.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use breachline_store::{DocKey, FieldPath, MemoryStore, RetryPolicy, Store, StoreError, Update};
use serde_json::json;

fn counter() -> DocKey {
    DocKey::new("counters", "main")
}

#[derive(Debug, PartialEq)]
enum BodyError {
    Rejected,
    Store(String),
}

impl From<StoreError> for BodyError {
    fn from(e: StoreError) -> Self {
        Self::Store(e.to_string())
    }
}

#[tokio::test]
async fn test_run_transaction_conflict_reruns_body() {
    let store = MemoryStore::new();
    store.insert(counter(), json!({ "n": 0 }));
    let attempts = AtomicUsize::new(0);

    let seen = store
        .run_transaction(|tx| {
            let n = tx.get(&counter())?.map(|s| s.data["n"].as_i64().unwrap_or(0));
            if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                // A competing writer commits between our read and our commit.
                store.insert(counter(), json!({ "n": 10 }));
            }
            tx.update(&counter(), Update::new().increment(FieldPath::field("n"), 1));
            Ok::<_, StoreError>(n)
        })
        .await
        .unwrap();

    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert_eq!(seen, Some(10));
    let doc = store.get(&counter()).await.unwrap().unwrap();
    assert_eq!(doc.data["n"], 11);
}

#[tokio::test]
async fn test_run_transaction_persistent_conflict_exhausts_retries() {
    let store = MemoryStore::with_policy(RetryPolicy::with_attempts(3));
    store.insert(counter(), json!({ "n": 0 }));
    let attempts = AtomicUsize::new(0);

    let result = store
        .run_transaction(|tx| {
            tx.get(&counter())?;
            attempts.fetch_add(1, Ordering::SeqCst);
            store.insert(counter(), json!({ "n": 99 }));
            tx.set(&counter(), json!({ "n": -1 }));
            Ok::<_, StoreError>(())
        })
        .await;

    assert!(matches!(
        result,
        Err(StoreError::RetriesExhausted { attempts: 3 })
    ));
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    let doc = store.get(&counter()).await.unwrap().unwrap();
    assert_eq!(doc.data["n"], 99);
}

#[tokio::test]
async fn test_run_transaction_body_error_writes_nothing() {
    let store = MemoryStore::new();
    store.insert(counter(), json!({ "n": 0 }));

    let result: Result<(), BodyError> = store
        .run_transaction(|tx| {
            tx.get(&counter())?;
            tx.set(&DocKey::new("counters", "other"), json!({ "n": 1 }));
            Err(BodyError::Rejected)
        })
        .await;

    assert_eq!(result, Err(BodyError::Rejected));
    assert!(store.get(&DocKey::new("counters", "other")).await.unwrap().is_none());
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_run_transaction_failed_update_applies_no_other_write() {
    let store = MemoryStore::new();
    store.insert(counter(), json!({ "n": "not a number" }));

    let result = store
        .run_transaction(|tx| {
            tx.set(&DocKey::new("counters", "side"), json!({}));
            tx.update(&counter(), Update::new().increment(FieldPath::field("n"), 1));
            Ok::<_, StoreError>(())
        })
        .await;

    assert!(matches!(result, Err(StoreError::InvalidUpdate { .. })));
    assert!(store.get(&DocKey::new("counters", "side")).await.unwrap().is_none());
}

#[tokio::test]
async fn test_run_transaction_absent_read_conflicts_with_create() {
    let store = MemoryStore::new();
    let attempts = AtomicUsize::new(0);

    let existed = store
        .run_transaction(|tx| {
            let existed = tx.get(&counter())?.is_some();
            if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                store.insert(counter(), json!({ "n": 5 }));
            }
            Ok::<_, StoreError>(existed)
        })
        .await
        .unwrap();

    assert!(existed);
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_increments_are_not_lost() {
    let policy = RetryPolicy {
        max_attempts: 200,
        max_backoff: Duration::from_millis(5),
        ..Default::default()
    };
    let store = Arc::new(MemoryStore::with_policy(policy));
    store.insert(counter(), json!({ "n": 0 }));

    let mut handles = Vec::new();
    for _ in 0..16 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store
                .run_transaction(|tx| {
                    let n = tx
                        .get(&counter())?
                        .and_then(|s| s.data["n"].as_i64())
                        .unwrap_or(0);
                    tx.set(&counter(), json!({ "n": n + 1 }));
                    Ok::<_, StoreError>(())
                })
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let doc = store.get(&counter()).await.unwrap().unwrap();
    assert_eq!(doc.data["n"], 16);
}

#[tokio::test]
async fn test_subscribe_sees_transactional_commit() {
    let store = MemoryStore::new();
    store.insert(counter(), json!({ "n": 0 }));
    let mut rx = store.subscribe(&counter());

    store
        .run_transaction(|tx| {
            tx.update(&counter(), Update::new().set(FieldPath::field("n"), json!(3)));
            Ok::<_, StoreError>(())
        })
        .await
        .unwrap();

    let snapshot = rx.recv().await.unwrap();
    assert_eq!(snapshot.data["n"], 3);
}
