use super::operation::OperationDescriptor;
use crate::error::ExternalError;
use async_trait::async_trait;
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;

/// Executes one kind of queued write.
#[async_trait]
pub trait OperationHandler: Send + Sync {
    async fn execute(&self, args: &serde_json::Value) -> Result<(), ExternalError>;
}

/// Adapts an async closure into an [`OperationHandler`].
pub struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> OperationHandler for FnHandler<F>
where
    F: Fn(serde_json::Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), ExternalError>> + Send,
{
    async fn execute(&self, args: &serde_json::Value) -> Result<(), ExternalError> {
        (self.0)(args.clone()).await
    }
}

/// Maps operation kinds back to executable handlers.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: DashMap<String, Arc<dyn OperationHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the handler for `kind`.
    pub fn register(&self, kind: impl Into<String>, handler: Arc<dyn OperationHandler>) {
        let kind = kind.into();
        if self.handlers.insert(kind.clone(), handler).is_some() {
            tracing::debug!("[QUEUE] replaced handler for {}", kind);
        }
    }

    pub fn register_fn<F, Fut>(&self, kind: impl Into<String>, f: F)
    where
        F: Fn(serde_json::Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ExternalError>> + Send + 'static,
    {
        self.register(kind, Arc::new(FnHandler(f)));
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.handlers.contains_key(kind)
    }

    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.handlers.iter().map(|e| e.key().clone()).collect();
        kinds.sort();
        kinds
    }

    /// Run the handler for `op`. A kind with no handler counts as a failed
    /// attempt; the handler may be registered before the next pass.
    pub async fn execute(&self, op: &OperationDescriptor) -> Result<(), ExternalError> {
        // Clone the Arc out so the map shard is not held across the await.
        let handler = self.handlers.get(&op.kind).map(|h| Arc::clone(h.value()));
        match handler {
            Some(handler) => handler.execute(&op.args).await,
            None => Err(ExternalError::Other(format!(
                "no handler registered for operation kind '{}'",
                op.kind
            ))),
        }
    }
}
