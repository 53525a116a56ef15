use crate::events::RuntimeEvent;
use crate::store::ProviderStore;
use crate::types::PendingDeletion;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;
use uuid::Uuid;

/// In-process store backend. Good for tests and single-process embedding;
/// everything lives behind one mutex because contention is per-operation
/// and operations are short.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    events: BTreeMap<Uuid, Vec<RuntimeEvent>>,
    confirmed: BTreeMap<String, String>,
    deletions: Vec<PendingDeletion>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>> {
        self.inner.lock().map_err(|_| anyhow!("memory store mutex poisoned"))
    }
}

#[async_trait]
impl ProviderStore for MemoryStore {
    async fn append_event(&self, op_id: Uuid, event: &RuntimeEvent) -> Result<u64> {
        let mut inner = self.lock()?;
        let log = inner.events.entry(op_id).or_default();
        log.push(event.clone());
        Ok(log.len() as u64 - 1)
    }

    async fn read_events(&self, op_id: Uuid, from_seq: u64) -> Result<Vec<(u64, RuntimeEvent)>> {
        let inner = self.lock()?;
        Ok(inner
            .events
            .get(&op_id)
            .map(|log| {
                log.iter()
                    .enumerate()
                    .skip(from_seq as usize)
                    .map(|(seq, event)| (seq as u64, event.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn record_physical_id(
        &self,
        logical_resource_id: &str,
        physical_resource_id: &str,
    ) -> Result<()> {
        self.lock()?
            .confirmed
            .insert(logical_resource_id.to_string(), physical_resource_id.to_string());
        Ok(())
    }

    async fn confirmed_physical_id(&self, logical_resource_id: &str) -> Result<Option<String>> {
        Ok(self.lock()?.confirmed.get(logical_resource_id).cloned())
    }

    async fn clear_physical_id(&self, logical_resource_id: &str) -> Result<()> {
        self.lock()?.confirmed.remove(logical_resource_id);
        Ok(())
    }

    async fn schedule_deletion(&self, deletion: &PendingDeletion) -> Result<()> {
        self.lock()?.deletions.push(deletion.clone());
        Ok(())
    }

    async fn pending_deletions(&self) -> Result<Vec<PendingDeletion>> {
        Ok(self.lock()?.deletions.clone())
    }

    async fn take_pending_deletion(
        &self,
        physical_resource_id: &str,
    ) -> Result<Option<PendingDeletion>> {
        let mut inner = self.lock()?;
        let position = inner
            .deletions
            .iter()
            .position(|d| d.physical_resource_id == physical_resource_id);
        Ok(position.map(|i| inner.deletions.remove(i)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RequestType;

    #[tokio::test]
    async fn event_log_is_ordered_per_operation() {
        let store = MemoryStore::new();
        let op = Uuid::now_v7();
        let seq0 = store
            .append_event(
                op,
                &RuntimeEvent::HandlerInvoked {
                    request_type: RequestType::Create,
                },
            )
            .await
            .unwrap();
        let seq1 = store
            .append_event(
                op,
                &RuntimeEvent::HandlerSucceeded {
                    physical_resource_id: "idx-001".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!((seq0, seq1), (0, 1));

        let tail = store.read_events(op, 1).await.unwrap();
        assert_eq!(tail.len(), 1);
        assert!(matches!(tail[0].1, RuntimeEvent::HandlerSucceeded { .. }));
    }

    #[tokio::test]
    async fn take_pending_deletion_claims_exactly_one() {
        let store = MemoryStore::new();
        let deletion = PendingDeletion {
            logical_resource_id: "SearchIndex".to_string(),
            physical_resource_id: "idx-old".to_string(),
            scheduled_at: 0,
        };
        store.schedule_deletion(&deletion).await.unwrap();

        let taken = store.take_pending_deletion("idx-old").await.unwrap();
        assert_eq!(taken, Some(deletion));
        assert!(store.pending_deletions().await.unwrap().is_empty());
        assert_eq!(store.take_pending_deletion("idx-old").await.unwrap(), None);
    }

    #[tokio::test]
    async fn confirmed_ids_are_recorded_and_cleared() {
        let store = MemoryStore::new();
        store.record_physical_id("SearchIndex", "idx-001").await.unwrap();
        assert_eq!(
            store.confirmed_physical_id("SearchIndex").await.unwrap(),
            Some("idx-001".to_string())
        );
        store.clear_physical_id("SearchIndex").await.unwrap();
        assert_eq!(store.confirmed_physical_id("SearchIndex").await.unwrap(), None);
    }
}
