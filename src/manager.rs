use crate::config::SyncConfig;
use crate::error::{Result, SluiceError};
use crate::network::{NetworkMonitor, Transition};
use crate::queue::{
    DrainReport, HandlerRegistry, InvalidationHook, KeyValueStore, MutationQueue,
    OperationDescriptor, QueueEvent, QueueProcessor, QueuedOperation,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// How [`SyncManager::run_or_enqueue`] handled a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Ran immediately against the backend.
    Executed,
    /// Deferred; carries the queued operation id.
    Queued(String),
}

/// Owns the offline queue, its processor and the connectivity watcher.
///
/// Create one per process with [`SyncManager::start`] and pass it to
/// whatever needs to write. Background tasks stop on [`SyncManager::shutdown`]
/// or when the manager is dropped.
pub struct SyncManager {
    config: SyncConfig,
    queue: Arc<MutationQueue>,
    registry: Arc<HandlerRegistry>,
    network: Arc<NetworkMonitor>,
    processor: Arc<QueueProcessor>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl SyncManager {
    /// Restore the persisted queue and start the drain worker and the
    /// network watcher. Must be called inside a tokio runtime.
    pub async fn start(
        config: SyncConfig,
        store: Arc<dyn KeyValueStore>,
        network: Arc<NetworkMonitor>,
        registry: Arc<HandlerRegistry>,
    ) -> Result<Arc<Self>> {
        config.validate()?;

        let queue = Arc::new(MutationQueue::load(store, config.queue.storage_key.clone()).await);
        let processor = QueueProcessor::new(
            Arc::clone(&queue),
            Arc::clone(&registry),
            Arc::clone(&network),
            config.queue.clone(),
        );

        let worker = tokio::spawn(Arc::clone(&processor).run());

        let mut transitions = network.subscribe();
        let watched = Arc::clone(&processor);
        let watcher = tokio::spawn(async move {
            while let Some(transition) = transitions.next().await {
                match transition {
                    Transition::CameOnline => {
                        tracing::info!("[NET] back online, scheduling drain");
                        watched.trigger();
                    }
                    Transition::WentOffline => {
                        tracing::info!("[NET] offline, writes will be queued");
                    }
                }
            }
        });

        // Anything restored from a previous run goes out as soon as possible.
        if network.is_online() && !queue.is_empty() {
            processor.trigger();
        }

        tracing::info!(
            "[QUEUE] sync manager started ({} pending, {})",
            queue.size(),
            if network.is_online() { "online" } else { "offline" }
        );

        Ok(Arc::new(Self {
            config,
            queue,
            registry,
            network,
            processor,
            tasks: Mutex::new(vec![worker, watcher]),
            closed: AtomicBool::new(false),
        }))
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    pub fn network(&self) -> &Arc<NetworkMonitor> {
        &self.network
    }

    /// Queue a write. While online a drain is scheduled right away; the call
    /// returns without waiting for it.
    pub async fn enqueue(
        &self,
        kind: impl Into<String>,
        args: serde_json::Value,
    ) -> Result<QueuedOperation> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SluiceError::QueueClosed);
        }
        let queued = self
            .queue
            .enqueue(OperationDescriptor::new(kind, args))
            .await;
        if self.network.is_online() {
            self.processor.trigger();
        }
        Ok(queued)
    }

    /// Execute now when online, queue otherwise. A direct execution that
    /// fails is returned to the caller and not queued.
    pub async fn run_or_enqueue(
        &self,
        kind: impl Into<String>,
        args: serde_json::Value,
    ) -> Result<Dispatch> {
        let descriptor = OperationDescriptor::new(kind, args);
        if self.network.is_online() {
            self.registry.execute(&descriptor).await?;
            return Ok(Dispatch::Executed);
        }

        if self.closed.load(Ordering::SeqCst) {
            return Err(SluiceError::QueueClosed);
        }
        let queued = self.queue.enqueue(descriptor).await;
        tracing::debug!("[QUEUE] offline, deferred {} ({})", queued.id, queued.kind());
        Ok(Dispatch::Queued(queued.id))
    }

    pub fn queue_size(&self) -> usize {
        self.queue.size()
    }

    pub fn pending(&self) -> Vec<QueuedOperation> {
        self.queue.pending()
    }

    pub fn is_online(&self) -> bool {
        self.network.is_online()
    }

    pub async fn clear_queue(&self) -> usize {
        self.queue.clear().await
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<QueueEvent> {
        self.processor.subscribe()
    }

    /// Run one pass now and wait for it. Waits behind a pass already running.
    pub async fn drain_now(&self) -> DrainReport {
        self.processor.drain().await
    }

    pub fn set_invalidation_hook(&self, hook: Arc<dyn InvalidationHook>) {
        self.processor.set_invalidation_hook(hook);
    }

    /// Stop the background tasks. The queue stays persisted for the next start.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.processor.shutdown();
        let tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(|p| p.into_inner()));
        for task in tasks {
            task.abort();
        }
        tracing::info!("[QUEUE] sync manager stopped ({} pending)", self.queue.size());
    }
}

impl Drop for SyncManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExternalError;
    use crate::queue::MemoryStore;
    use serde_json::json;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    async fn manager(online: bool, calls: Arc<AtomicU32>) -> Arc<SyncManager> {
        let registry = Arc::new(HandlerRegistry::new());
        registry.register_fn("follow", move |_| {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });
        registry.register_fn("broken", |_| async {
            Err(ExternalError::Network("connection reset".into()))
        });
        SyncManager::start(
            SyncConfig::default(),
            Arc::new(MemoryStore::new()),
            Arc::new(NetworkMonitor::new(online)),
            registry,
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let mut config = SyncConfig::default();
        config.queue.max_retries = 0;
        let result = SyncManager::start(
            config,
            Arc::new(MemoryStore::new()),
            Arc::new(NetworkMonitor::new(true)),
            Arc::new(HandlerRegistry::new()),
        )
        .await;
        assert!(matches!(result, Err(SluiceError::Config(_))));
    }

    #[tokio::test]
    async fn test_run_or_enqueue_online_executes_directly() {
        let calls = Arc::new(AtomicU32::new(0));
        let manager = manager(true, Arc::clone(&calls)).await;

        let dispatch = manager.run_or_enqueue("follow", json!({})).await.unwrap();
        assert_eq!(dispatch, Dispatch::Executed);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(manager.queue_size(), 0);
    }

    #[tokio::test]
    async fn test_run_or_enqueue_online_failure_is_not_queued() {
        let manager = manager(true, Arc::new(AtomicU32::new(0))).await;
        let err = manager.run_or_enqueue("broken", json!({})).await.unwrap_err();
        assert!(matches!(err, SluiceError::External(ExternalError::Network(_))));
        assert_eq!(manager.queue_size(), 0);
    }

    #[tokio::test]
    async fn test_run_or_enqueue_offline_defers() {
        let calls = Arc::new(AtomicU32::new(0));
        let manager = manager(false, Arc::clone(&calls)).await;

        match manager.run_or_enqueue("follow", json!({})).await.unwrap() {
            Dispatch::Queued(id) => assert_eq!(manager.pending()[0].id, id),
            other => panic!("expected queued, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(manager.queue_size(), 1);
    }

    #[tokio::test]
    async fn test_coming_online_drains_queue() {
        let calls = Arc::new(AtomicU32::new(0));
        let manager = manager(false, Arc::clone(&calls)).await;
        let mut events = manager.subscribe_events();

        manager.enqueue("follow", json!({"ticker": "AAPL"})).await.unwrap();
        manager.enqueue("follow", json!({"ticker": "MSFT"})).await.unwrap();
        assert_eq!(manager.queue_size(), 2);

        manager.network().set_online(true);

        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let Ok(QueueEvent::DrainFinished(report)) = events.recv().await {
                    if report.remaining == 0 {
                        break;
                    }
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(manager.queue_size(), 0);
    }

    #[tokio::test]
    async fn test_enqueue_after_shutdown_fails() {
        let manager = manager(false, Arc::new(AtomicU32::new(0))).await;
        manager.shutdown();
        let err = manager.enqueue("follow", json!({})).await.unwrap_err();
        assert!(matches!(err, SluiceError::QueueClosed));
    }
}
