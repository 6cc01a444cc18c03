//! Shared application state for the ratewatch gateway.
//!
//! Builds the policy registry from config, attaches one event consumer per
//! subscribed limiter, and hands out the query/stream services. Construction
//! spawns tasks, so it must run inside a tokio runtime.

use std::sync::Arc;

use ratewatch_core::error::Result;

use crate::config::GatewayConfig;
use crate::events::{EventBufferRegistry, EventQueryService, EventStreamService};
use crate::obs::metrics::GatewayMetrics;
use crate::policy::{check_name, NamedPolicy, PolicyRegistry, TokenBucketLimiter};
use crate::transformer::PolicyTransformer;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: GatewayConfig,
    policies: Arc<PolicyRegistry>,
    buffers: Arc<EventBufferRegistry>,
    queries: EventQueryService,
    streams: EventStreamService,
    metrics: Arc<GatewayMetrics>,
}

impl AppState {
    /// Build application state.
    /// Returns Result so main can handle errors gracefully (no panic).
    pub fn new(cfg: GatewayConfig) -> Result<Self> {
        cfg.validate()?;

        let metrics = Arc::new(GatewayMetrics::default());
        let policies = Arc::new(PolicyRegistry::new());
        let buffers = Arc::new(
            EventBufferRegistry::new(cfg.events.buffer_size).with_metrics(Arc::clone(&metrics)),
        );

        for rl in &cfg.rate_limiters {
            let history = cfg.buffer_size_for(rl);
            // The history consumer reads from the same channel as live
            // subscribers; it must hold a full history's worth of backlog.
            let capacity = if rl.subscribe_for_events {
                cfg.events.stream_capacity.max(history)
            } else {
                cfg.events.stream_capacity
            };
            let limiter = Arc::new(TokenBucketLimiter::new(
                rl.name.clone(),
                rl.limit_for_period,
                rl.limit_refresh_period_ms,
                capacity,
            ));

            if rl.subscribe_for_events {
                buffers.attach(limiter.as_ref(), history);
            } else {
                tracing::warn!(policy = %rl.name, "subscribe_for_events disabled; history queries will return not found");
            }

            policies.register(limiter)?;
        }

        tracing::info!(policies = policies.len(), buffers = buffers.len(), "policy registry ready");

        Ok(Self {
            inner: Arc::new(AppStateInner {
                queries: EventQueryService::new(Arc::clone(&buffers)),
                streams: EventStreamService::new(Arc::clone(&policies)),
                cfg,
                policies,
                buffers,
                metrics,
            }),
        })
    }

    /// Register a host-provided policy and record its events with the default
    /// history length. Rejects names unusable in routes or SSE ids.
    pub fn register(&self, policy: Arc<dyn NamedPolicy>) -> Result<()> {
        check_name(policy.name())?;
        self.inner
            .buffers
            .attach(policy.as_ref(), self.inner.cfg.events.buffer_size);
        self.inner.policies.register(policy)
    }

    /// Guard for the named policy, reporting decisions to gateway metrics.
    pub fn transformer<T>(&self, policy: &str) -> Result<PolicyTransformer<T>> {
        let policy = self.inner.policies.find(policy)?;
        Ok(PolicyTransformer::of(policy).with_metrics(Arc::clone(&self.inner.metrics)))
    }

    pub fn cfg(&self) -> &GatewayConfig {
        &self.inner.cfg
    }

    pub fn policies(&self) -> Arc<PolicyRegistry> {
        Arc::clone(&self.inner.policies)
    }

    pub fn buffers(&self) -> Arc<EventBufferRegistry> {
        Arc::clone(&self.inner.buffers)
    }

    pub fn queries(&self) -> &EventQueryService {
        &self.inner.queries
    }

    pub fn streams(&self) -> &EventStreamService {
        &self.inner.streams
    }

    pub fn metrics(&self) -> Arc<GatewayMetrics> {
        Arc::clone(&self.inner.metrics)
    }

    /// Point-in-time gauges appended to the `/metrics` output.
    pub fn metrics_extra(&self) -> Vec<(&'static str, u64)> {
        vec![
            ("ratewatch_policies", self.inner.policies.len() as u64),
            ("ratewatch_buffers", self.inner.buffers.len() as u64),
        ]
    }
}
