use crate::types::{RequestType, ResponseStatus};
use serde::{Deserialize, Serialize};

/// Runtime events — the durable audit trail for every lifecycle operation.
///
/// One operation (keyed by its op id) appends events in order from receipt
/// to terminal response, so the full dispatch/poll history can be replayed
/// for diagnosis.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum RuntimeEvent {
    EventReceived {
        request_type: RequestType,
        logical_resource_id: String,
        request_id: String,
    },
    /// The event broke a field-presence rule; no handler was invoked.
    ContractRejected {
        reason: String,
    },
    HandlerInvoked {
        request_type: RequestType,
    },
    HandlerSucceeded {
        physical_resource_id: String,
    },
    HandlerFailed {
        reason: String,
    },
    /// An Update returned a new physical identity for an existing logical id.
    ReplacementDetected {
        old_physical_id: String,
        new_physical_id: String,
    },
    /// The replaced identity was queued for deletion after its successor
    /// was confirmed live.
    DeletionScheduled {
        logical_resource_id: String,
        physical_resource_id: String,
    },
    PollStarted {
        query_interval_ms: u64,
        total_timeout_ms: u64,
        backoff_rate: f64,
        max_attempts: u32,
    },
    PollAttempted {
        attempt: u32,
        is_complete: bool,
    },
    PollFailed {
        attempt: u32,
        reason: String,
    },
    PollTimedOut {
        attempts_made: u32,
    },
    ResponseIssued {
        status: ResponseStatus,
        physical_resource_id: Option<String>,
    },
}
