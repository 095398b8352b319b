//! Per-instance request quotas
//!
//! `controller` implements the fixed-window gate for one instance and
//! `registry` keeps one gate per configured instance id.

pub mod controller;
pub mod registry;

pub use controller::{RateLimitController, RateLimitDecision, RateLimitError, WindowReset};
pub use registry::RateLimiterRegistry;
