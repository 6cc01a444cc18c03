//! Rate-limit guard for single-value async pipelines.
//!
//! [`PolicyTransformer::apply`] wraps a lazy upstream future. When the wrapped
//! future is first polled it asks the policy for permission exactly once:
//!
//! - interrupted around the check: [`Outcome::Interrupted`], nothing else runs
//! - denied: the recovery value as [`Outcome::Success`], or [`Outcome::Denied`]
//! - granted: the upstream is driven and its signal forwarded untouched
//!
//! On every path except "granted" the upstream future is dropped without being
//! polled. Work done while *constructing* that future is not covered, so pass
//! an `async` block rather than the result of an eager call.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

use ratewatch_core::error::RateWatchError;
use ratewatch_core::RequestNotPermitted;

use crate::obs::metrics::GatewayMetrics;
use crate::policy::NamedPolicy;

/// Terminal signal of a single-value pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal<T, E> {
    Success(T),
    Error(E),
    /// Finished without a value.
    Complete,
}

impl<T, E> From<Result<T, E>> for Signal<T, E> {
    fn from(r: Result<T, E>) -> Self {
        match r {
            Ok(v) => Signal::Success(v),
            Err(e) => Signal::Error(e),
        }
    }
}

/// What the downstream of a guarded stage receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T, E> {
    Success(T),
    /// Upstream error, passed through as-is.
    Error(E),
    Complete,
    /// Policy refused and no recovery was configured.
    Denied(RequestNotPermitted),
    /// Interrupted around the admission check. Never recovered.
    Interrupted,
}

impl<T, E> From<Signal<T, E>> for Outcome<T, E> {
    fn from(s: Signal<T, E>) -> Self {
        match s {
            Signal::Success(v) => Outcome::Success(v),
            Signal::Error(e) => Outcome::Error(e),
            Signal::Complete => Outcome::Complete,
        }
    }
}

impl<T, E> Outcome<T, E> {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    /// `Complete` maps to `Ok(None)`.
    pub fn into_result(self) -> Result<Option<T>, GuardError<E>> {
        match self {
            Outcome::Success(v) => Ok(Some(v)),
            Outcome::Complete => Ok(None),
            Outcome::Error(e) => Err(GuardError::Upstream(e)),
            Outcome::Denied(d) => Err(GuardError::Policy(RateWatchError::PermissionDenied(d))),
            Outcome::Interrupted => Err(GuardError::Policy(RateWatchError::InterruptedWait)),
        }
    }
}

#[derive(Debug, Error)]
pub enum GuardError<E> {
    /// `PermissionDenied` or `InterruptedWait`.
    #[error(transparent)]
    Policy(RateWatchError),
    #[error("upstream failed: {0}")]
    Upstream(E),
}

/// Interruption flag shared between a caller and one guarded invocation.
///
/// Observing the flag clears it, so a handle can be reused for the next call.
#[derive(Debug, Clone, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interrupt(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_interrupted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

type Recoverer<T> = Arc<dyn Fn(RequestNotPermitted) -> T + Send + Sync>;

pub struct PolicyTransformer<T> {
    policy: Arc<dyn NamedPolicy>,
    recoverer: Option<Recoverer<T>>,
    metrics: Option<Arc<GatewayMetrics>>,
}

impl<T> Clone for PolicyTransformer<T> {
    fn clone(&self) -> Self {
        Self {
            policy: Arc::clone(&self.policy),
            recoverer: self.recoverer.clone(),
            metrics: self.metrics.clone(),
        }
    }
}

impl<T> PolicyTransformer<T> {
    /// Guard with no recovery: denial surfaces as [`Outcome::Denied`].
    pub fn of(policy: Arc<dyn NamedPolicy>) -> Self {
        Self {
            policy,
            recoverer: None,
            metrics: None,
        }
    }

    /// Value to deliver instead of a denial.
    pub fn recover<F>(mut self, f: F) -> Self
    where
        F: Fn(RequestNotPermitted) -> T + Send + Sync + 'static,
    {
        self.recoverer = Some(Arc::new(f));
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<GatewayMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn policy_name(&self) -> &str {
        self.policy.name()
    }

    pub fn apply<U, E>(&self, upstream: U) -> impl Future<Output = Outcome<T, E>> + Send
    where
        U: Future<Output = Signal<T, E>> + Send,
    {
        self.apply_interruptible(upstream, Interrupt::new())
    }

    /// As [`apply`](Self::apply), observing `interrupt` right after the
    /// admission check returns.
    pub fn apply_interruptible<U, E>(
        &self,
        upstream: U,
        interrupt: Interrupt,
    ) -> impl Future<Output = Outcome<T, E>> + Send
    where
        U: Future<Output = Signal<T, E>> + Send,
    {
        let policy = Arc::clone(&self.policy);
        let recoverer = self.recoverer.clone();
        let metrics = self.metrics.clone();

        async move {
            let permitted = policy.acquire_permission();
            let decision = |d: &str| {
                if let Some(m) = &metrics {
                    m.permission_decisions
                        .inc(&[("policy", policy.name()), ("decision", d)]);
                }
            };

            if interrupt.take() {
                decision("interrupted");
                tracing::warn!(policy = %policy.name(), "interrupted during permission wait");
                return Outcome::Interrupted;
            }

            if !permitted {
                let denial = RequestNotPermitted::new(policy.name());
                return match &recoverer {
                    Some(recover) => {
                        decision("recovered");
                        tracing::debug!(policy = %policy.name(), "permission denied, recovering");
                        Outcome::Success(recover(denial))
                    }
                    None => {
                        decision("denied");
                        tracing::debug!(policy = %policy.name(), "permission denied");
                        Outcome::Denied(denial)
                    }
                };
            }

            decision("permitted");
            upstream.await.into()
        }
    }
}
