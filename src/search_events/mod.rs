//! Event system for observing search progress
//!
//! The orchestrator publishes lifecycle events (start, rate-limit waits,
//! per-project completion, finish) on a broadcast bus so front ends can show
//! throttling indicators without polling.

pub mod bus;
pub mod errors;
pub mod metrics;
pub mod streaming;
pub mod types;

pub use bus::SearchEventBus;
pub use errors::EventBusError;
pub use metrics::{EventBusMetrics, MetricsSnapshot};
pub use streaming::FilteredReceiver;
pub use types::{FinishReason, SearchEvent};
