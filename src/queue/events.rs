use serde::Serialize;

/// Summary of one drain pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    /// Operations that ran successfully and left the queue.
    pub completed: usize,
    /// Operations that failed and stay queued for a later pass.
    pub retained: usize,
    /// Operations that hit the retry cap and were discarded.
    pub dropped: usize,
    /// Snapshot entries no longer queued when their turn came (cleared).
    pub skipped: usize,
    /// Queue size after the pass.
    pub remaining: usize,
}

impl DrainReport {
    pub fn attempted(&self) -> usize {
        self.completed + self.retained + self.dropped
    }

    /// True when the pass ran something and every attempt succeeded.
    pub fn is_full_success(&self) -> bool {
        self.completed > 0 && self.retained == 0 && self.dropped == 0
    }
}

/// Observable outcome of queue processing, published on a broadcast channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum QueueEvent {
    Completed {
        id: String,
        kind: String,
    },
    Retrying {
        id: String,
        kind: String,
        retry_count: u32,
        error: String,
    },
    Dropped {
        id: String,
        kind: String,
        retry_count: u32,
        error: String,
    },
    DrainFinished(DrainReport),
}
