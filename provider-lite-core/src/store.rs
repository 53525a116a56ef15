use crate::events::RuntimeEvent;
use crate::types::PendingDeletion;
use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

/// Persistence trait for all engine state.
///
/// The dispatch and completion engines operate exclusively through this
/// trait, enabling pluggable backends (`MemoryStore` in-process, something
/// durable in production). No method is shared across concurrent operations
/// in a way that needs engine-side locking — each lifecycle event is driven
/// by a single worker.
#[async_trait]
pub trait ProviderStore: Send + Sync {
    // ── Event log (append-only) ──

    /// Append an event for an operation and return its sequence number.
    async fn append_event(&self, op_id: Uuid, event: &RuntimeEvent) -> Result<u64>;
    async fn read_events(&self, op_id: Uuid, from_seq: u64) -> Result<Vec<(u64, RuntimeEvent)>>;

    // ── Confirmed physical ids ──

    /// Record the physical id most recently confirmed live for a logical id.
    async fn record_physical_id(
        &self,
        logical_resource_id: &str,
        physical_resource_id: &str,
    ) -> Result<()>;
    async fn confirmed_physical_id(&self, logical_resource_id: &str) -> Result<Option<String>>;
    async fn clear_physical_id(&self, logical_resource_id: &str) -> Result<()>;

    // ── Replacement deletions ──

    async fn schedule_deletion(&self, deletion: &PendingDeletion) -> Result<()>;
    async fn pending_deletions(&self) -> Result<Vec<PendingDeletion>>;
    /// Claim a pending deletion by physical id, removing it from the queue.
    async fn take_pending_deletion(
        &self,
        physical_resource_id: &str,
    ) -> Result<Option<PendingDeletion>>;
}
