use crate::dispatch::{DispatchOutcome, Dispatcher};
use crate::error::ProviderError;
use crate::events::RuntimeEvent;
use crate::handler::{CompletionHandler, SyncHandler};
use crate::store::ProviderStore;
use crate::types::{
    now_ms, LifecycleEvent, PendingDeletion, PropertyMap, ProviderResponse, RequestType,
    ResourceRecord, ResponseStatus,
};
use crate::waiter::{Waiter, WaiterOptions};
use std::sync::Arc;
use uuid::Uuid;

/// The provider runtime: one entry point per lifecycle event, one terminal
/// response out.
///
/// Construction injects the store and the synchronous handler; an
/// asynchronous provider adds its completion check via
/// [`Provider::with_completion`]. The engines never retry a handler and
/// never share mutable state across concurrent operations — workers for
/// different logical ids can run side by side on the same `Provider`.
pub struct Provider {
    store: Arc<dyn ProviderStore>,
    handler: Arc<dyn SyncHandler>,
    dispatcher: Dispatcher,
    waiter: Option<Waiter>,
}

impl Provider {
    pub fn new(store: Arc<dyn ProviderStore>, handler: Arc<dyn SyncHandler>) -> Self {
        let dispatcher = Dispatcher::new(store.clone(), handler.clone(), false);
        Self {
            store,
            handler,
            dispatcher,
            waiter: None,
        }
    }

    /// Builder: configure the completion check and its polling options.
    /// Dispatch outcomes switch from `Complete` to `Pending`, handing every
    /// successful dispatch to the waiter.
    pub fn with_completion(
        mut self,
        completion: Arc<dyn CompletionHandler>,
        options: WaiterOptions,
    ) -> Self {
        self.dispatcher = Dispatcher::new(self.store.clone(), self.handler.clone(), true);
        self.waiter = Some(Waiter::new(self.store.clone(), completion, options));
        self
    }

    /// Process one lifecycle event to its terminal response.
    ///
    /// Callers observe exactly one of SUCCESS (physical id + data) or
    /// FAILED (reason) — never both, never neither. All fatal errors land
    /// here as the FAILED reason; nothing is swallowed.
    pub async fn run(&self, event: LifecycleEvent) -> ProviderResponse {
        let op_id = Uuid::now_v7();
        let stack_id = event.stack_id.clone();
        let request_id = event.request_id.clone();
        let logical_resource_id = event.logical_resource_id.clone();
        let inbound_physical_id = event.physical_resource_id.clone();

        match self.execute(op_id, event).await {
            Ok(record) => {
                let issued = RuntimeEvent::ResponseIssued {
                    status: ResponseStatus::Success,
                    physical_resource_id: Some(record.physical_resource_id.clone()),
                };
                if let Err(err) = self.store.append_event(op_id, &issued).await {
                    tracing::warn!(op_id = %op_id, error = %err, "failed to record terminal response");
                }
                tracing::info!(
                    op_id = %op_id,
                    logical_resource_id = %logical_resource_id,
                    physical_resource_id = %record.physical_resource_id,
                    "lifecycle operation succeeded"
                );
                ProviderResponse {
                    status: ResponseStatus::Success,
                    reason: None,
                    physical_resource_id: Some(record.physical_resource_id),
                    stack_id,
                    request_id,
                    logical_resource_id,
                    data: record.data,
                    no_echo: record.no_echo,
                }
            }
            Err(err) => {
                let reason = err.to_string();
                let issued = RuntimeEvent::ResponseIssued {
                    status: ResponseStatus::Failed,
                    physical_resource_id: inbound_physical_id.clone(),
                };
                if let Err(store_err) = self.store.append_event(op_id, &issued).await {
                    tracing::warn!(op_id = %op_id, error = %store_err, "failed to record terminal response");
                }
                tracing::warn!(
                    op_id = %op_id,
                    logical_resource_id = %logical_resource_id,
                    reason = %reason,
                    "lifecycle operation failed"
                );
                ProviderResponse {
                    status: ResponseStatus::Failed,
                    reason: Some(reason),
                    physical_resource_id: inbound_physical_id,
                    stack_id,
                    request_id,
                    logical_resource_id,
                    data: PropertyMap::new(),
                    no_echo: false,
                }
            }
        }
    }

    async fn execute(
        &self,
        op_id: Uuid,
        event: LifecycleEvent,
    ) -> Result<ResourceRecord, ProviderError> {
        self.store
            .append_event(
                op_id,
                &RuntimeEvent::EventReceived {
                    request_type: event.request_type,
                    logical_resource_id: event.logical_resource_id.clone(),
                    request_id: event.request_id.clone(),
                },
            )
            .await?;

        let request_type = event.request_type;
        let logical_resource_id = event.logical_resource_id.clone();

        let record = match self.dispatcher.dispatch(op_id, event).await? {
            DispatchOutcome::Complete(record) => record,
            DispatchOutcome::Pending(pending) => match &self.waiter {
                Some(waiter) => waiter.wait(op_id, pending).await?,
                // Dispatch only tags Pending when a completion handler is
                // configured, and `with_completion` installs both halves.
                None => pending.record,
            },
        };

        match request_type {
            RequestType::Create | RequestType::Update => {
                self.store
                    .record_physical_id(&logical_resource_id, &record.physical_resource_id)
                    .await?;
                // A replacement's old identity is deleted only now, after
                // the new one is confirmed live.
                if let Some(old) = &record.replaces {
                    let deletion = PendingDeletion {
                        logical_resource_id: logical_resource_id.clone(),
                        physical_resource_id: old.clone(),
                        scheduled_at: now_ms(),
                    };
                    self.store.schedule_deletion(&deletion).await?;
                    self.store
                        .append_event(
                            op_id,
                            &RuntimeEvent::DeletionScheduled {
                                logical_resource_id,
                                physical_resource_id: old.clone(),
                            },
                        )
                        .await?;
                }
            }
            RequestType::Delete => {
                self.store.clear_physical_id(&logical_resource_id).await?;
            }
        }

        Ok(record)
    }
}
