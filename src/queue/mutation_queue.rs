use super::operation::{OperationDescriptor, QueuedOperation};
use super::store::KeyValueStore;
use std::sync::{Arc, Mutex, MutexGuard};

/// Result of recording a failed attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum FailureOutcome {
    /// Still queued; will be attempted again on a later pass.
    Retained { retry_count: u32 },
    /// Hit the retry cap and was removed.
    Dropped(QueuedOperation),
    /// No longer in the queue (cleared concurrently).
    Missing,
}

/// Ordered, persisted list of pending writes.
///
/// Every mutation rewrites the whole snapshot to the store before returning.
/// Mutations hold `write_lock` across the store write so the persisted order
/// always matches the in-memory order.
pub struct MutationQueue {
    store: Arc<dyn KeyValueStore>,
    storage_key: String,
    items: Mutex<Vec<QueuedOperation>>,
    write_lock: tokio::sync::Mutex<()>,
}

impl MutationQueue {
    /// Restore the queue from `store`. An unreadable or corrupt snapshot is
    /// logged and the queue starts empty.
    pub async fn load(store: Arc<dyn KeyValueStore>, storage_key: impl Into<String>) -> Self {
        let storage_key = storage_key.into();

        let items = match store.get(&storage_key).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<Vec<QueuedOperation>>(&bytes) {
                Ok(items) => {
                    tracing::info!(
                        "[QUEUE] restored {} pending operations from {}",
                        items.len(),
                        storage_key
                    );
                    items
                }
                Err(e) => {
                    tracing::error!(
                        "[QUEUE] failed to parse persisted queue {}: {}, starting empty",
                        storage_key,
                        e
                    );
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::error!(
                    "[QUEUE] failed to load persisted queue {}: {}, starting empty",
                    storage_key,
                    e
                );
                Vec::new()
            }
        };

        Self {
            store,
            storage_key,
            items: Mutex::new(items),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    fn items(&self) -> MutexGuard<'_, Vec<QueuedOperation>> {
        self.items.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    /// Append a new operation with `retry_count = 0` and persist.
    pub async fn enqueue(&self, operation: OperationDescriptor) -> QueuedOperation {
        let _write = self.write_lock.lock().await;
        let queued = QueuedOperation::new(operation);
        let snapshot = {
            let mut items = self.items();
            items.push(queued.clone());
            serde_json::to_vec(&*items)
        };
        tracing::debug!("[QUEUE] enqueued {} ({})", queued.id, queued.kind());
        self.persist(snapshot).await;
        queued
    }

    pub fn size(&self) -> usize {
        self.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items().iter().any(|op| op.id == id)
    }

    pub fn pending(&self) -> Vec<QueuedOperation> {
        self.items().clone()
    }

    /// Oldest-first copy of at most `limit` operations.
    pub fn snapshot(&self, limit: Option<usize>) -> Vec<QueuedOperation> {
        let items = self.items();
        let take = limit.unwrap_or(items.len()).min(items.len());
        items[..take].to_vec()
    }

    /// Remove an operation after it succeeded. Returns false if it was not queued.
    pub async fn remove(&self, id: &str) -> bool {
        let _write = self.write_lock.lock().await;
        let snapshot = {
            let mut items = self.items();
            let before = items.len();
            items.retain(|op| op.id != id);
            if items.len() == before {
                return false;
            }
            serde_json::to_vec(&*items)
        };
        self.persist(snapshot).await;
        true
    }

    /// Count a failed attempt; drop the operation once it reaches `max_retries`.
    pub async fn record_failure(&self, id: &str, max_retries: u32) -> FailureOutcome {
        let _write = self.write_lock.lock().await;
        let (outcome, snapshot) = {
            let mut items = self.items();
            let Some(index) = items.iter().position(|op| op.id == id) else {
                return FailureOutcome::Missing;
            };

            items[index].retry_count += 1;
            let outcome = if items[index].retry_count >= max_retries {
                FailureOutcome::Dropped(items.remove(index))
            } else {
                FailureOutcome::Retained {
                    retry_count: items[index].retry_count,
                }
            };
            (outcome, serde_json::to_vec(&*items))
        };
        self.persist(snapshot).await;
        outcome
    }

    /// Drop everything and persist the empty queue.
    pub async fn clear(&self) -> usize {
        let _write = self.write_lock.lock().await;
        let (removed, snapshot) = {
            let mut items = self.items();
            let removed = items.len();
            items.clear();
            (removed, serde_json::to_vec(&*items))
        };
        tracing::info!("[QUEUE] cleared {} pending operations", removed);
        self.persist(snapshot).await;
        removed
    }

    async fn persist(&self, snapshot: serde_json::Result<Vec<u8>>) {
        let bytes = match snapshot {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!("[QUEUE] failed to serialize queue: {}", e);
                return;
            }
        };
        if let Err(e) = self.store.set(&self.storage_key, bytes).await {
            tracing::error!(
                "[QUEUE] failed to persist queue to {}: {}",
                self.storage_key,
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, SluiceError};
    use crate::queue::store::MemoryStore;
    use async_trait::async_trait;
    use serde_json::json;

    struct BrokenStore;

    #[async_trait]
    impl KeyValueStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>> {
            Err(SluiceError::Store("disk on fire".into()))
        }
        async fn set(&self, _key: &str, _value: Vec<u8>) -> Result<()> {
            Err(SluiceError::Store("disk on fire".into()))
        }
        async fn remove(&self, _key: &str) -> Result<()> {
            Err(SluiceError::Store("disk on fire".into()))
        }
    }

    fn op(n: u32) -> OperationDescriptor {
        OperationDescriptor::new("save_note", json!({ "n": n }))
    }

    async fn persisted(store: &MemoryStore) -> Vec<QueuedOperation> {
        let bytes = store.get("offline_queue").await.unwrap().unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_enqueue_appends_in_order_and_persists() {
        let store = Arc::new(MemoryStore::new());
        let queue = MutationQueue::load(store.clone(), "offline_queue").await;

        let a = queue.enqueue(op(1)).await;
        let b = queue.enqueue(op(2)).await;

        assert_eq!(queue.size(), 2);
        let pending = queue.pending();
        assert_eq!(pending[0].id, a.id);
        assert_eq!(pending[1].id, b.id);
        assert_eq!(persisted(&store).await, pending);
    }

    #[tokio::test]
    async fn test_snapshot_respects_limit() {
        let store = Arc::new(MemoryStore::new());
        let queue = MutationQueue::load(store, "offline_queue").await;
        for n in 0..5 {
            queue.enqueue(op(n)).await;
        }

        assert_eq!(queue.snapshot(None).len(), 5);
        let capped = queue.snapshot(Some(2));
        assert_eq!(capped.len(), 2);
        assert_eq!(capped[0].operation.args["n"], 0);
        assert_eq!(capped[1].operation.args["n"], 1);
        assert_eq!(queue.snapshot(Some(50)).len(), 5);
    }

    #[tokio::test]
    async fn test_record_failure_retains_then_drops() {
        let store = Arc::new(MemoryStore::new());
        let queue = MutationQueue::load(store.clone(), "offline_queue").await;
        let queued = queue.enqueue(op(1)).await;

        assert_eq!(
            queue.record_failure(&queued.id, 3).await,
            FailureOutcome::Retained { retry_count: 1 }
        );
        assert_eq!(persisted(&store).await[0].retry_count, 1);
        assert_eq!(
            queue.record_failure(&queued.id, 3).await,
            FailureOutcome::Retained { retry_count: 2 }
        );

        match queue.record_failure(&queued.id, 3).await {
            FailureOutcome::Dropped(dropped) => {
                assert_eq!(dropped.id, queued.id);
                assert_eq!(dropped.retry_count, 3);
            }
            other => panic!("expected drop, got {:?}", other),
        }
        assert!(queue.is_empty());
        assert!(persisted(&store).await.is_empty());

        assert_eq!(
            queue.record_failure(&queued.id, 3).await,
            FailureOutcome::Missing
        );
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let store = Arc::new(MemoryStore::new());
        let queue = MutationQueue::load(store.clone(), "offline_queue").await;
        let a = queue.enqueue(op(1)).await;
        queue.enqueue(op(2)).await;
        queue.enqueue(op(3)).await;

        assert!(queue.remove(&a.id).await);
        assert!(!queue.remove(&a.id).await);
        assert!(!queue.contains(&a.id));
        assert_eq!(persisted(&store).await.len(), 2);

        assert_eq!(queue.clear().await, 2);
        assert_eq!(queue.size(), 0);
        assert!(persisted(&store).await.is_empty());
    }

    #[tokio::test]
    async fn test_reload_restores_items_and_retry_counts() {
        let store = Arc::new(MemoryStore::new());
        let original = {
            let queue = MutationQueue::load(store.clone(), "offline_queue").await;
            let a = queue.enqueue(op(1)).await;
            queue.enqueue(op(2)).await;
            queue.record_failure(&a.id, 3).await;
            queue.pending()
        };

        let reloaded = MutationQueue::load(store, "offline_queue").await;
        assert_eq!(reloaded.pending(), original);
        assert_eq!(reloaded.pending()[0].retry_count, 1);
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_starts_empty() {
        let store = Arc::new(MemoryStore::new());
        store
            .set("offline_queue", b"{not json".to_vec())
            .await
            .unwrap();

        let queue = MutationQueue::load(store, "offline_queue").await;
        assert_eq!(queue.size(), 0);
    }

    #[tokio::test]
    async fn test_store_failures_do_not_block_in_memory_queue() {
        let queue = MutationQueue::load(Arc::new(BrokenStore), "offline_queue").await;

        let queued = queue.enqueue(op(1)).await;
        assert_eq!(queue.size(), 1);
        assert!(queue.remove(&queued.id).await);
        assert_eq!(queue.size(), 0);
    }
}
