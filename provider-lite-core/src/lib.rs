//! provider-lite-core — a small runtime for out-of-band resource
//! provisioning.
//!
//! A deployment orchestrator delivers one [`types::LifecycleEvent`]
//! (Create/Update/Delete) per operation. The synchronous dispatch engine
//! ([`dispatch::Dispatcher`]) invokes the integrator's [`handler::SyncHandler`]
//! exactly once and normalizes its answer; when a
//! [`handler::CompletionHandler`] is configured, the completion engine
//! ([`waiter::Waiter`]) polls it with exponential backoff until the
//! operation is confirmed done, fails, or the time/attempt budget runs
//! out. [`provider::Provider`] ties the two together and reports exactly
//! one terminal SUCCESS/FAILED response per event.
//!
//! Engines persist an append-only audit trail and the physical-id registry
//! through the [`store::ProviderStore`] trait; [`store_memory::MemoryStore`]
//! is the in-process backend.

pub mod contract;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod handler;
pub mod provider;
pub mod store;
pub mod store_memory;
pub mod types;
pub mod waiter;

pub use dispatch::{DispatchOutcome, Dispatcher, PendingOperation};
pub use error::ProviderError;
pub use events::RuntimeEvent;
pub use handler::{CompletionHandler, SyncHandler};
pub use provider::Provider;
pub use store::ProviderStore;
pub use store_memory::MemoryStore;
pub use types::{
    CompletionResult, HandlerResult, LifecycleEvent, PendingDeletion, PropertyMap,
    ProviderResponse, RequestType, ResourceRecord, ResponseStatus, Value,
};
pub use waiter::{Waiter, WaiterOptions, WaiterState};
