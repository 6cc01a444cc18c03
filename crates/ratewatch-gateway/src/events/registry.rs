use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use ratewatch_core::PolicyEvent;

use super::buffer::{EventBuffer, DEFAULT_BUFFER_SIZE};
use crate::obs::metrics::GatewayMetrics;
use crate::policy::NamedPolicy;

/// Policy name -> bounded event history.
///
/// Buffers are created on first reference and never removed. Creation is
/// serialized per key by the map's entry lock; each buffer then carries its own
/// lock, so writers for different policies never contend.
pub struct EventBufferRegistry {
    buffers: DashMap<String, Arc<EventBuffer>>,
    default_capacity: usize,
    seq: AtomicU64,
    metrics: Option<Arc<GatewayMetrics>>,
}

impl Default for EventBufferRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_SIZE)
    }
}

impl EventBufferRegistry {
    pub fn new(default_capacity: usize) -> Self {
        Self {
            buffers: DashMap::new(),
            default_capacity: default_capacity.max(1),
            seq: AtomicU64::new(0),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<GatewayMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Buffer for `name`, created with the default capacity if absent.
    pub fn buffer(&self, name: &str) -> Arc<EventBuffer> {
        self.buffer_with_capacity(name, self.default_capacity)
    }

    /// Buffer for `name`; `capacity` only applies if this call creates it.
    pub fn buffer_with_capacity(&self, name: &str, capacity: usize) -> Arc<EventBuffer> {
        if let Some(b) = self.buffers.get(name) {
            return Arc::clone(b.value());
        }
        let entry = self
            .buffers
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(EventBuffer::new(capacity)));
        Arc::clone(entry.value())
    }

    /// Lookup without creating.
    pub fn get(&self, name: &str) -> Option<Arc<EventBuffer>> {
        self.buffers.get(name).map(|b| Arc::clone(b.value()))
    }

    pub fn all(&self) -> Vec<(String, Arc<EventBuffer>)> {
        self.buffers
            .iter()
            .map(|e| (e.key().clone(), Arc::clone(e.value())))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Record into the buffer named by the event's policy.
    pub fn record(&self, event: PolicyEvent) {
        let buffer = self.buffer(event.policy_name());
        self.record_into(&buffer, event);
    }

    fn record_into(&self, buffer: &EventBuffer, event: PolicyEvent) {
        if let Some(m) = &self.metrics {
            m.events_recorded.inc(&[("policy", event.policy_name())]);
        }
        buffer.push(&self.seq, event);
    }

    /// Create `policy`'s buffer and feed it from the policy's live stream.
    ///
    /// The subscription is taken before this returns, so every event emitted
    /// afterwards lands in the buffer. The consumer task runs until the
    /// policy's stream closes.
    pub fn attach(self: &Arc<Self>, policy: &dyn NamedPolicy, capacity: usize) -> JoinHandle<()> {
        let name = policy.name().to_string();
        let buffer = self.buffer_with_capacity(&name, capacity);
        let mut rx = policy.event_stream();
        let registry = Arc::clone(self);

        tracing::info!(policy = %name, capacity = buffer.capacity(), "event consumer attached");

        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => registry.record_into(&buffer, event),
                    Err(RecvError::Lagged(n)) => {
                        tracing::warn!(policy = %name, lagged = n, "event consumer lagged, events missed");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            tracing::info!(policy = %name, "event consumer stopped");
        })
    }
}
