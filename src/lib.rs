//! # Sluice
//!
//! Resilient plumbing between a client app and unreliable external systems.
//!
//! Two halves share one problem: running a sequence of fallible,
//! rate-constrained operations with bounded retries and observable partial
//! success.
//!
//! * **Outbound** ([`client`]): a [`RateLimiter`] spacing calls to one API,
//!   a [`BackoffPolicy`] classifying failures, a [`ResilientClient`] wrapping
//!   one call in both, and a [`BatchExecutor`] that walks a list of keys and
//!   isolates per-item failures into a [`BatchResult`].
//! * **Inbound** ([`queue`]): a persisted [`MutationQueue`] of writes made
//!   while offline, replayed by a [`QueueProcessor`] whenever the
//!   [`NetworkMonitor`] reports the device came back online.
//!
//! [`SyncManager`] wires the inbound half together as one service object.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use sluice::{HandlerRegistry, MemoryStore, NetworkMonitor, SyncConfig, SyncManager};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn run() -> sluice::Result<()> {
//! let registry = Arc::new(HandlerRegistry::new());
//! registry.register_fn("follow_company", |args| async move {
//!     println!("following {}", args["ticker"]);
//!     Ok(())
//! });
//!
//! let network = Arc::new(NetworkMonitor::new(false));
//! let manager = SyncManager::start(
//!     SyncConfig::from_env()?,
//!     Arc::new(MemoryStore::new()),
//!     Arc::clone(&network),
//!     registry,
//! )
//! .await?;
//!
//! manager.enqueue("follow_company", json!({"ticker": "AAPL"})).await?;
//! assert_eq!(manager.queue_size(), 1);
//!
//! // Platform connectivity callback:
//! network.set_online(true);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod manager;
pub mod network;
pub mod queue;

pub use client::{BackoffPolicy, BatchExecutor, BatchResult, RateLimiter, ResilientClient};
pub use config::{ClientConfig, QueueConfig, SyncConfig};
pub use error::{ExternalError, FatalError, Result, SluiceError};
pub use manager::{Dispatch, SyncManager};
pub use network::{NetworkMonitor, NetworkTransitions, Transition};
pub use queue::{
    DrainReport, FileStore, HandlerRegistry, KeyValueStore, MemoryStore, MutationQueue,
    OperationDescriptor, QueueEvent, QueueProcessor, QueuedOperation,
};
