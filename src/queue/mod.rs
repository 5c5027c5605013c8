//! Inbound side: durable queue of local writes deferred while offline, and
//! the processor that replays them once connectivity returns.

pub mod events;
pub mod mutation_queue;
pub mod operation;
pub mod processor;
pub mod registry;
pub mod store;

pub use events::{DrainReport, QueueEvent};
pub use mutation_queue::{FailureOutcome, MutationQueue};
pub use operation::{OperationDescriptor, QueuedOperation};
pub use processor::{InvalidationHook, ProcessorState, QueueProcessor};
pub use registry::{FnHandler, HandlerRegistry, OperationHandler};
pub use store::{FileStore, KeyValueStore, MemoryStore};
