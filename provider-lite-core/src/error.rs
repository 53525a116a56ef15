//! Typed failure taxonomy for lifecycle operations.
//!
//! Every terminal FAILED response maps to exactly one variant. The engine
//! never swallows an error: each one propagates up as a single FAILED
//! response with a human-readable reason. The only condition treated as
//! "try again" is an explicit incomplete poll, which is not an error at all.

/// Fatal outcomes of a lifecycle operation.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The inbound event breaks a field-presence rule. Detected before any
    /// handler is invoked; never retried.
    #[error("Contract violation: {reason}")]
    ContractViolation { reason: String },

    /// The synchronous handler failed. Terminal for this lifecycle event —
    /// retries, if any, happen at the orchestrator as brand-new events.
    #[error("Handler failed: {reason}")]
    HandlerError { reason: String },

    /// The completion check failed during polling. Terminal immediately,
    /// distinct from "not yet complete".
    #[error("Completion check failed: {reason}")]
    CompletionCheckError { reason: String },

    /// The polling budget (wall clock or attempts) ran out without a
    /// success or an error. The reason string is fixed so callers can tell
    /// infrastructure slowness from a real defect.
    #[error("Operation timed out")]
    TimedOut { attempts_made: u32 },

    /// A Delete handler answered with a different physical identity than
    /// the one it was asked to delete.
    #[error("Delete handler returned physical id \"{returned}\" for inbound physical id \"{expected}\"")]
    ReplacementViolation { expected: String, returned: String },

    /// The persistence backend failed.
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}
