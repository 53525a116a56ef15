use crate::types::{CompletionResult, HandlerResult, LifecycleEvent};
use anyhow::Result;
use async_trait::async_trait;

/// Integrator-supplied lifecycle logic, invoked exactly once per event.
///
/// The engine is transport-agnostic: an implementation may do its work
/// in-process, over RPC, or by enqueuing to a shared handler pool — the
/// dispatch engine only sees the trait.
#[async_trait]
pub trait SyncHandler: Send + Sync {
    /// Perform the side-effecting work for one lifecycle event. An `Err`
    /// signals a FAILED outcome for the whole operation; no partial data
    /// is honored.
    async fn on_event(&self, event: &LifecycleEvent) -> Result<HandlerResult>;
}

/// Integrator-supplied readiness check, invoked on every poll attempt with
/// the normalized event plus all passthrough fields accumulated so far.
#[async_trait]
pub trait CompletionHandler: Send + Sync {
    /// Report whether the operation has stabilized. `is_complete: false`
    /// means "ask again later"; an `Err` is immediately terminal.
    async fn is_complete(&self, event: &LifecycleEvent) -> Result<CompletionResult>;
}
