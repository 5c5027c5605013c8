use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Serializable description of a deferred write: which handler to run and
/// with what arguments. Handlers are looked up by `kind` in the
/// [`HandlerRegistry`](super::registry::HandlerRegistry), so a reloaded queue
/// can still be executed after a restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationDescriptor {
    pub kind: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

impl OperationDescriptor {
    pub fn new(kind: impl Into<String>, args: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            args,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedOperation {
    pub id: String,
    pub operation: OperationDescriptor,
    pub enqueued_at: DateTime<Utc>,
    #[serde(default)]
    pub retry_count: u32,
}

impl QueuedOperation {
    pub fn new(operation: OperationDescriptor) -> Self {
        let enqueued_at = Utc::now();
        Self {
            id: generate_id(&enqueued_at),
            operation,
            enqueued_at,
            retry_count: 0,
        }
    }

    pub fn kind(&self) -> &str {
        &self.operation.kind
    }
}

/// `<unix millis>_<random hex>`: sorts by enqueue time, unique within a millisecond.
fn generate_id(at: &DateTime<Utc>) -> String {
    format!("{}_{:08x}", at.timestamp_millis(), rand::random::<u32>())
}
