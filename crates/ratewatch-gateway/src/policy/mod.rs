//! Policy layer (named admission policies and their registry).
//!
//! A [`NamedPolicy`] is the narrow capability the rest of the gateway consumes:
//! a name, a non-suspending admission check, and a live event feed. How a
//! policy decides is its own business.

pub mod limiter;
pub mod registry;

use tokio::sync::broadcast;

use ratewatch_core::PolicyEvent;

pub use limiter::TokenBucketLimiter;
pub use registry::{check_name, PolicyRegistry};

/// Admission-controlled resource identified by a unique name.
pub trait NamedPolicy: Send + Sync {
    fn name(&self) -> &str;

    /// Non-suspending admission check. Emits exactly one event per call.
    fn acquire_permission(&self) -> bool;

    /// Fresh live subscription. Starts at "now"; no backlog is replayed.
    fn event_stream(&self) -> broadcast::Receiver<PolicyEvent>;
}
