use super::events::{DrainReport, QueueEvent};
use super::mutation_queue::{FailureOutcome, MutationQueue};
use super::registry::HandlerRegistry;
use crate::config::QueueConfig;
use crate::network::NetworkMonitor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::{broadcast, Notify};

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorState {
    Idle,
    Draining,
}

/// Marks the processor as draining for as long as it is held, including when
/// the pass future is dropped mid-flight.
struct DrainingGuard<'a>(&'a AtomicBool);

impl<'a> DrainingGuard<'a> {
    fn enter(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for DrainingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Called after a pass in which every attempted operation succeeded, so
/// dependent cached data can be refreshed.
pub trait InvalidationHook: Send + Sync {
    fn invalidate(&self);
}

impl<F> InvalidationHook for F
where
    F: Fn() + Send + Sync,
{
    fn invalidate(&self) {
        self()
    }
}

/// Drains a [`MutationQueue`] while online.
///
/// Passes never overlap. Triggers that arrive during a pass coalesce into a
/// single follow-up pass run by the background worker.
pub struct QueueProcessor {
    queue: Arc<MutationQueue>,
    registry: Arc<HandlerRegistry>,
    network: Arc<NetworkMonitor>,
    config: QueueConfig,
    drain_lock: tokio::sync::Mutex<()>,
    draining: AtomicBool,
    wake: Notify,
    shutdown: Notify,
    events: broadcast::Sender<QueueEvent>,
    hook: RwLock<Option<Arc<dyn InvalidationHook>>>,
}

impl QueueProcessor {
    pub fn new(
        queue: Arc<MutationQueue>,
        registry: Arc<HandlerRegistry>,
        network: Arc<NetworkMonitor>,
        config: QueueConfig,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            queue,
            registry,
            network,
            config,
            drain_lock: tokio::sync::Mutex::new(()),
            draining: AtomicBool::new(false),
            wake: Notify::new(),
            shutdown: Notify::new(),
            events,
            hook: RwLock::new(None),
        })
    }

    pub fn state(&self) -> ProcessorState {
        if self.draining.load(Ordering::SeqCst) {
            ProcessorState::Draining
        } else {
            ProcessorState::Idle
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.events.subscribe()
    }

    pub fn set_invalidation_hook(&self, hook: Arc<dyn InvalidationHook>) {
        *self.hook.write().unwrap_or_else(|p| p.into_inner()) = Some(hook);
    }

    /// Ask the background worker for a pass. Fire-and-forget.
    pub fn trigger(&self) {
        self.wake.notify_one();
    }

    /// Background worker loop. Spawn once per processor.
    pub async fn run(self: Arc<Self>) {
        tracing::info!("[DRAIN] queue worker started");
        loop {
            tokio::select! {
                _ = self.wake.notified() => {
                    self.drain().await;
                }
                _ = self.shutdown.notified() => {
                    tracing::info!("[DRAIN] queue worker shutting down");
                    break;
                }
            }
        }
    }

    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }

    /// Run one pass over a snapshot of the queue, oldest first.
    ///
    /// Each operation is attempted at most once per pass. Skipped entirely
    /// while offline.
    pub async fn drain(&self) -> DrainReport {
        let _pass = self.drain_lock.lock().await;
        let mut report = DrainReport::default();

        if !self.network.is_online() {
            tracing::debug!("[DRAIN] offline, skipping pass");
            report.remaining = self.queue.size();
            return report;
        }

        let snapshot = self.queue.snapshot(self.config.max_drain_batch);
        if snapshot.is_empty() {
            return report;
        }

        let draining = DrainingGuard::enter(&self.draining);
        tracing::info!("[DRAIN] pass over {} operations", snapshot.len());

        for op in snapshot {
            // A concurrent clear() may have removed it since the snapshot.
            if !self.queue.contains(&op.id) {
                report.skipped += 1;
                continue;
            }

            let kind = op.kind().to_string();
            match self.registry.execute(&op.operation).await {
                Ok(()) => {
                    self.queue.remove(&op.id).await;
                    report.completed += 1;
                    tracing::debug!("[DRAIN] {} ({}) done", op.id, kind);
                    self.emit(QueueEvent::Completed { id: op.id, kind });
                }
                Err(e) => {
                    let error = e.to_string();
                    match self
                        .queue
                        .record_failure(&op.id, self.config.max_retries)
                        .await
                    {
                        FailureOutcome::Retained { retry_count } => {
                            report.retained += 1;
                            tracing::warn!(
                                "[DRAIN] {} ({}) failed, attempt {}/{}: {}",
                                op.id,
                                kind,
                                retry_count,
                                self.config.max_retries,
                                error
                            );
                            self.emit(QueueEvent::Retrying {
                                id: op.id,
                                kind,
                                retry_count,
                                error,
                            });
                        }
                        FailureOutcome::Dropped(dropped) => {
                            report.dropped += 1;
                            tracing::error!(
                                "[DRAIN] {} ({}) exceeded {} attempts, dropping: {}",
                                dropped.id,
                                kind,
                                self.config.max_retries,
                                error
                            );
                            self.emit(QueueEvent::Dropped {
                                id: dropped.id,
                                kind,
                                retry_count: dropped.retry_count,
                                error,
                            });
                        }
                        FailureOutcome::Missing => {
                            report.skipped += 1;
                        }
                    }
                }
            }
        }

        report.remaining = self.queue.size();
        drop(draining);

        tracing::info!(
            "[DRAIN] pass done: {} completed, {} retained, {} dropped, {} remaining",
            report.completed,
            report.retained,
            report.dropped,
            report.remaining
        );
        self.emit(QueueEvent::DrainFinished(report.clone()));

        if report.is_full_success() {
            let hook = self.hook.read().unwrap_or_else(|p| p.into_inner()).clone();
            if let Some(hook) = hook {
                hook.invalidate();
            }
        }

        report
    }

    fn emit(&self, event: QueueEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}
