use crate::contract;
use crate::error::ProviderError;
use crate::events::RuntimeEvent;
use crate::handler::SyncHandler;
use crate::store::ProviderStore;
use crate::types::{LifecycleEvent, RequestType, ResourceRecord};
use std::sync::Arc;
use uuid::Uuid;

/// Result of dispatching one lifecycle event.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// No completion handler is configured — the resource is live as of the
    /// handler returning.
    Complete(ResourceRecord),
    /// A completion handler is configured — the merged event is carried
    /// forward into the completion engine.
    Pending(PendingOperation),
}

/// The handoff from dispatch to the completion engine: the normalized event
/// (physical id assigned, passthrough fields merged) plus the record built
/// from the synchronous handler's answer.
#[derive(Debug)]
pub struct PendingOperation {
    pub event: LifecycleEvent,
    pub record: ResourceRecord,
}

/// The synchronous dispatch engine. Invokes the integrator's handler
/// exactly once per lifecycle event — no internal retry — and normalizes
/// the result into a [`ResourceRecord`].
pub struct Dispatcher {
    store: Arc<dyn ProviderStore>,
    handler: Arc<dyn SyncHandler>,
    completion_configured: bool,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn ProviderStore>,
        handler: Arc<dyn SyncHandler>,
        completion_configured: bool,
    ) -> Self {
        Self {
            store,
            handler,
            completion_configured,
        }
    }

    /// Validate, invoke the handler once, and normalize its answer.
    ///
    /// Contract violations fail fast before the handler runs; handler
    /// failures are terminal — no completion polling is attempted for them.
    pub async fn dispatch(
        &self,
        op_id: Uuid,
        mut event: LifecycleEvent,
    ) -> Result<DispatchOutcome, ProviderError> {
        self.check_contract(op_id, &event).await?;

        self.store
            .append_event(
                op_id,
                &RuntimeEvent::HandlerInvoked {
                    request_type: event.request_type,
                },
            )
            .await?;
        tracing::debug!(
            op_id = %op_id,
            request_type = ?event.request_type,
            logical_resource_id = %event.logical_resource_id,
            "dispatching lifecycle event"
        );

        let result = match self.handler.on_event(&event).await {
            Ok(result) => result,
            Err(err) => {
                let reason = format!("{err:#}");
                self.store
                    .append_event(op_id, &RuntimeEvent::HandlerFailed { reason: reason.clone() })
                    .await?;
                tracing::warn!(op_id = %op_id, error = %reason, "lifecycle handler failed");
                return Err(ProviderError::HandlerError { reason });
            }
        };

        let resolved =
            contract::resolve_physical_id(&event, result.physical_resource_id.as_deref())?;

        let replaces = match (&event.request_type, event.physical_resource_id.as_deref()) {
            (RequestType::Update, Some(inbound)) if inbound != resolved => {
                Some(inbound.to_string())
            }
            _ => None,
        };
        if let Some(old) = &replaces {
            self.store
                .append_event(
                    op_id,
                    &RuntimeEvent::ReplacementDetected {
                        old_physical_id: old.clone(),
                        new_physical_id: resolved.clone(),
                    },
                )
                .await?;
        }

        // Forward the handler's answer to whatever runs next: the resolved
        // identity plus every passthrough key, merged with new keys winning.
        event.physical_resource_id = Some(resolved.clone());
        event.extra.extend(result.extra);

        self.store
            .append_event(
                op_id,
                &RuntimeEvent::HandlerSucceeded {
                    physical_resource_id: resolved.clone(),
                },
            )
            .await?;

        let record = ResourceRecord {
            physical_resource_id: resolved,
            data: result.data,
            no_echo: result.no_echo.unwrap_or(false),
            replaces,
        };

        Ok(if self.completion_configured {
            DispatchOutcome::Pending(PendingOperation { event, record })
        } else {
            DispatchOutcome::Complete(record)
        })
    }

    /// Presence rules, then the identity rule: for Update/Delete the inbound
    /// physical id must equal the one most recently confirmed for this
    /// logical id, when the store knows one. Rejections are recorded before
    /// they propagate.
    async fn check_contract(
        &self,
        op_id: Uuid,
        event: &LifecycleEvent,
    ) -> Result<(), ProviderError> {
        let mut violation = contract::validate(event).err();

        if violation.is_none()
            && matches!(event.request_type, RequestType::Update | RequestType::Delete)
        {
            if let Some(confirmed) = self
                .store
                .confirmed_physical_id(&event.logical_resource_id)
                .await?
            {
                let inbound = event.physical_resource_id.as_deref().unwrap_or_default();
                if inbound != confirmed {
                    violation = Some(ProviderError::ContractViolation {
                        reason: format!(
                            "PhysicalResourceId \"{inbound}\" does not match the confirmed id \"{confirmed}\" for logical id \"{}\"",
                            event.logical_resource_id
                        ),
                    });
                }
            }
        }

        match violation {
            Some(err) => {
                self.store
                    .append_event(
                        op_id,
                        &RuntimeEvent::ContractRejected {
                            reason: err.to_string(),
                        },
                    )
                    .await?;
                Err(err)
            }
            None => Ok(()),
        }
    }
}
