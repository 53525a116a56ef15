use crate::dispatch::PendingOperation;
use crate::error::ProviderError;
use crate::events::RuntimeEvent;
use crate::handler::CompletionHandler;
use crate::store::ProviderStore;
use crate::types::ResourceRecord;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

const DEFAULT_QUERY_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_TOTAL_TIMEOUT: Duration = Duration::from_secs(30 * 60);
const MAX_TOTAL_TIMEOUT: Duration = Duration::from_secs(60 * 60);
const DEFAULT_BACKOFF_RATE: f64 = 1.5;

// ─── Options ──────────────────────────────────────────────────

/// Tuning for the completion engine. `query_interval` is the first wait,
/// growing by `backoff_rate` each attempt; `total_timeout` and
/// `max_attempts` are independent bounds — whichever is hit first ends
/// the loop.
#[derive(Clone, Debug, PartialEq)]
pub struct WaiterOptions {
    pub query_interval: Duration,
    pub total_timeout: Duration,
    pub backoff_rate: f64,
    /// Defaults to `ceil(total_timeout / query_interval)` when unset.
    pub max_attempts: Option<u32>,
}

impl Default for WaiterOptions {
    fn default() -> Self {
        Self {
            query_interval: DEFAULT_QUERY_INTERVAL,
            total_timeout: DEFAULT_TOTAL_TIMEOUT,
            backoff_rate: DEFAULT_BACKOFF_RATE,
            max_attempts: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WaiterOptionsYaml {
    #[serde(default)]
    query_interval_secs: Option<u64>,
    #[serde(default)]
    total_timeout_secs: Option<u64>,
    #[serde(default)]
    backoff_rate: Option<f64>,
    #[serde(default)]
    max_attempts: Option<u32>,
}

impl WaiterOptions {
    /// Parse options from YAML, filling defaults for absent keys.
    ///
    /// ```yaml
    /// query_interval_secs: 10
    /// total_timeout_secs: 600
    /// backoff_rate: 2.0
    /// ```
    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yaml::Error> {
        let raw: WaiterOptionsYaml = serde_yaml::from_str(yaml)?;
        let defaults = Self::default();
        Ok(Self {
            query_interval: raw
                .query_interval_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.query_interval),
            total_timeout: raw
                .total_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.total_timeout),
            backoff_rate: raw.backoff_rate.unwrap_or(defaults.backoff_rate),
            max_attempts: raw.max_attempts,
        })
    }

    /// Clamp out-of-range settings instead of failing events over a tuning
    /// mistake: the timeout has a hard ceiling, the backoff may not shrink
    /// intervals, and a zero interval would spin.
    pub fn normalized(mut self) -> Self {
        if self.total_timeout > MAX_TOTAL_TIMEOUT {
            tracing::warn!(
                requested_secs = self.total_timeout.as_secs(),
                ceiling_secs = MAX_TOTAL_TIMEOUT.as_secs(),
                "total timeout exceeds the ceiling, clamping"
            );
            self.total_timeout = MAX_TOTAL_TIMEOUT;
        }
        if self.backoff_rate < 1.0 {
            tracing::warn!(requested = self.backoff_rate, "backoff rate below 1.0, clamping");
            self.backoff_rate = 1.0;
        }
        if self.query_interval.is_zero() {
            tracing::warn!("zero query interval, falling back to the default");
            self.query_interval = DEFAULT_QUERY_INTERVAL;
        }
        self
    }

    fn effective_max_attempts(&self) -> u32 {
        match self.max_attempts {
            Some(n) => n.max(1),
            None => {
                let ratio =
                    self.total_timeout.as_secs_f64() / self.query_interval.as_secs_f64();
                (ratio.ceil() as u32).max(1)
            }
        }
    }
}

// ─── Waiter state ─────────────────────────────────────────────

/// Internal state of one polling run. Owned exclusively by the worker
/// driving the operation; created on handoff, discarded at the terminal
/// outcome.
#[derive(Clone, Debug)]
pub struct WaiterState {
    pub attempts_made: u32,
    pub next_interval: Duration,
    pub deadline: Instant,
    pub last_error: Option<String>,
}

impl WaiterState {
    fn new(options: &WaiterOptions) -> Self {
        Self {
            attempts_made: 0,
            next_interval: options.query_interval,
            deadline: Instant::now() + options.total_timeout,
            last_error: None,
        }
    }
}

// ─── Waiter ───────────────────────────────────────────────────

/// The asynchronous completion engine: polls the integrator's readiness
/// check until it reports complete, throws, or the budget runs out. Each
/// poll sees the normalized event with all passthrough fields; the wait
/// between polls grows exponentially and the final wait is clamped to the
/// remaining budget so it never overshoots the deadline.
pub struct Waiter {
    store: Arc<dyn ProviderStore>,
    completion: Arc<dyn CompletionHandler>,
    options: WaiterOptions,
}

impl Waiter {
    pub fn new(
        store: Arc<dyn ProviderStore>,
        completion: Arc<dyn CompletionHandler>,
        options: WaiterOptions,
    ) -> Self {
        Self {
            store,
            completion,
            options: options.normalized(),
        }
    }

    /// Poll until a terminal outcome. Exactly one of: success (completion
    /// data merged over the dispatch data, new keys win), completion error
    /// (terminal on the spot), or timeout (budget spent, fixed reason).
    pub async fn wait(
        &self,
        op_id: Uuid,
        pending: PendingOperation,
    ) -> Result<ResourceRecord, ProviderError> {
        let max_attempts = self.options.effective_max_attempts();
        self.store
            .append_event(
                op_id,
                &RuntimeEvent::PollStarted {
                    query_interval_ms: self.options.query_interval.as_millis() as u64,
                    total_timeout_ms: self.options.total_timeout.as_millis() as u64,
                    backoff_rate: self.options.backoff_rate,
                    max_attempts,
                },
            )
            .await?;

        let mut state = WaiterState::new(&self.options);
        let PendingOperation { event, mut record } = pending;

        loop {
            let result = match self.completion.is_complete(&event).await {
                Ok(result) => result,
                Err(err) => {
                    let reason = format!("{err:#}");
                    state.last_error = Some(reason.clone());
                    self.store
                        .append_event(
                            op_id,
                            &RuntimeEvent::PollFailed {
                                attempt: state.attempts_made + 1,
                                reason: reason.clone(),
                            },
                        )
                        .await?;
                    tracing::warn!(op_id = %op_id, error = %reason, "completion check failed");
                    return Err(ProviderError::CompletionCheckError { reason });
                }
            };

            state.attempts_made += 1;
            self.store
                .append_event(
                    op_id,
                    &RuntimeEvent::PollAttempted {
                        attempt: state.attempts_made,
                        is_complete: result.is_complete,
                    },
                )
                .await?;

            if result.is_complete {
                if let Some(data) = result.data {
                    record.data.extend(data);
                }
                tracing::debug!(
                    op_id = %op_id,
                    attempts = state.attempts_made,
                    "operation confirmed complete"
                );
                return Ok(record);
            }

            if state.attempts_made >= max_attempts {
                return self.timed_out(op_id, &state).await;
            }
            let remaining = state.deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return self.timed_out(op_id, &state).await;
            }

            // Never sleep past the deadline: the last wait shrinks to
            // whatever budget is left.
            let pause = state.next_interval.min(remaining);
            tracing::debug!(
                op_id = %op_id,
                attempt = state.attempts_made,
                pause_ms = pause.as_millis() as u64,
                "not yet complete, waiting"
            );
            tokio::time::sleep(pause).await;
            state.next_interval = state.next_interval.mul_f64(self.options.backoff_rate);

            if Instant::now() >= state.deadline {
                return self.timed_out(op_id, &state).await;
            }
        }
    }

    async fn timed_out(
        &self,
        op_id: Uuid,
        state: &WaiterState,
    ) -> Result<ResourceRecord, ProviderError> {
        self.store
            .append_event(
                op_id,
                &RuntimeEvent::PollTimedOut {
                    attempts_made: state.attempts_made,
                },
            )
            .await?;
        tracing::warn!(op_id = %op_id, attempts = state.attempts_made, "polling budget exhausted");
        Err(ProviderError::TimedOut {
            attempts_made: state.attempts_made,
        })
    }
}
