#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;

use ratewatch_core::error::ClientCode;
use ratewatch_core::{EventType, PolicyEvent};
use ratewatch_gateway::app_state::AppState;
use ratewatch_gateway::config;
use ratewatch_gateway::policy::NamedPolicy;
use ratewatch_gateway::transformer::{GuardError, Interrupt, Outcome, PolicyTransformer, Signal};

/// Policy with a fixed answer that counts admission checks and can raise an
/// interrupt while "waiting".
struct FixedPolicy {
    permit: AtomicBool,
    calls: AtomicUsize,
    interrupt_during_wait: Option<Interrupt>,
    events: broadcast::Sender<PolicyEvent>,
}

impl FixedPolicy {
    fn new(permit: bool) -> Arc<Self> {
        Self::build(permit, None)
    }

    fn interrupting(permit: bool, interrupt: Interrupt) -> Arc<Self> {
        Self::build(permit, Some(interrupt))
    }

    fn build(permit: bool, interrupt_during_wait: Option<Interrupt>) -> Arc<Self> {
        let (events, _) = broadcast::channel(16);
        Arc::new(Self {
            permit: AtomicBool::new(permit),
            calls: AtomicUsize::new(0),
            interrupt_during_wait,
            events,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl NamedPolicy for FixedPolicy {
    fn name(&self) -> &str {
        "fixed"
    }

    fn acquire_permission(&self) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(i) = &self.interrupt_during_wait {
            i.interrupt();
        }
        let permitted = self.permit.load(Ordering::SeqCst);
        let t = if permitted {
            EventType::SuccessfulAcquire
        } else {
            EventType::FailedAcquire
        };
        let _ = self.events.send(PolicyEvent::now("fixed", t, 1));
        permitted
    }

    fn event_stream(&self) -> broadcast::Receiver<PolicyEvent> {
        self.events.subscribe()
    }
}

fn counted<T: Send>(ran: &Arc<AtomicUsize>, s: Signal<T, String>) -> impl std::future::Future<Output = Signal<T, String>> + Send {
    let ran = Arc::clone(ran);
    async move {
        ran.fetch_add(1, Ordering::SeqCst);
        s
    }
}

#[tokio::test]
async fn granted_passes_every_signal_through() {
    let policy = FixedPolicy::new(true);
    let guard: PolicyTransformer<u32> = PolicyTransformer::of(policy.clone());
    let ran = Arc::new(AtomicUsize::new(0));

    assert_eq!(guard.apply(counted(&ran, Signal::Success(7))).await, Outcome::Success(7));
    assert_eq!(
        guard.apply(counted(&ran, Signal::Error("boom".to_string()))).await,
        Outcome::Error("boom".to_string())
    );
    assert_eq!(guard.apply(counted::<u32>(&ran, Signal::Complete)).await, Outcome::Complete);

    assert_eq!(ran.load(Ordering::SeqCst), 3);
    assert_eq!(policy.calls(), 3);
}

#[tokio::test]
async fn denied_without_recovery_never_runs_upstream() {
    let policy = FixedPolicy::new(false);
    let guard: PolicyTransformer<u32> = PolicyTransformer::of(policy.clone());
    let ran = Arc::new(AtomicUsize::new(0));

    let out = guard.apply(counted(&ran, Signal::Success(1))).await;
    match out {
        Outcome::Denied(d) => assert_eq!(d.policy, "fixed"),
        other => panic!("expected denial, got {other:?}"),
    }
    assert_eq!(ran.load(Ordering::SeqCst), 0);
    assert_eq!(policy.calls(), 1);
}

#[tokio::test]
async fn denied_with_recovery_delivers_recovery_value() {
    let policy = FixedPolicy::new(false);
    let guard = PolicyTransformer::of(policy.clone()).recover(|d| format!("fallback for {}", d.policy));
    let ran = Arc::new(AtomicUsize::new(0));

    let out = guard
        .apply(counted(&ran, Signal::Success("live".to_string())))
        .await;
    assert_eq!(out, Outcome::Success("fallback for fixed".to_string()));
    assert_eq!(ran.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn interrupt_wins_over_recovery_and_is_cleared() {
    let interrupt = Interrupt::new();
    let policy = FixedPolicy::interrupting(false, interrupt.clone());
    let guard = PolicyTransformer::of(policy.clone()).recover(|_| 0_u32);
    let ran = Arc::new(AtomicUsize::new(0));

    let out = guard
        .apply_interruptible(counted(&ran, Signal::Success(1)), interrupt.clone())
        .await;
    assert_eq!(out, Outcome::Interrupted);
    assert!(!interrupt.is_interrupted());
    assert_eq!(ran.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn interrupt_before_check_blocks_even_when_granted() {
    let policy = FixedPolicy::new(true);
    let guard: PolicyTransformer<u32> = PolicyTransformer::of(policy.clone());
    let ran = Arc::new(AtomicUsize::new(0));

    let interrupt = Interrupt::new();
    interrupt.interrupt();
    let out = guard
        .apply_interruptible(counted(&ran, Signal::Success(1)), interrupt.clone())
        .await;
    assert_eq!(out, Outcome::Interrupted);
    assert_eq!(ran.load(Ordering::SeqCst), 0);

    // Flag was consumed; the same handle is usable again.
    let out = guard
        .apply_interruptible(counted(&ran, Signal::Success(2)), interrupt)
        .await;
    assert_eq!(out, Outcome::Success(2));
}

#[tokio::test]
async fn permission_is_checked_on_first_poll_only() {
    let policy = FixedPolicy::new(true);
    let guard: PolicyTransformer<u32> = PolicyTransformer::of(policy.clone());
    let ran = Arc::new(AtomicUsize::new(0));

    let pending = guard.apply(counted(&ran, Signal::Success(5)));
    assert_eq!(policy.calls(), 0);

    assert_eq!(pending.await, Outcome::Success(5));
    assert_eq!(policy.calls(), 1);

    // Each invocation asks once.
    let a = guard.apply(counted(&ran, Signal::Success(1)));
    let b = guard.apply(counted(&ran, Signal::Success(2)));
    let (a, b) = tokio::join!(a, b);
    assert!(a.is_success() && b.is_success());
    assert_eq!(policy.calls(), 3);
}

#[tokio::test]
async fn each_check_emits_one_event() {
    let policy = FixedPolicy::new(false);
    let mut rx = policy.event_stream();
    let guard: PolicyTransformer<u32> = PolicyTransformer::of(policy.clone());
    let ran = Arc::new(AtomicUsize::new(0));

    let _ = guard.apply(counted(&ran, Signal::Success(1))).await;
    let ev = rx.try_recv().unwrap();
    assert_eq!(ev.event_type(), EventType::FailedAcquire);
    assert!(rx.try_recv().is_err());
}

#[test]
fn outcome_into_result_mapping() {
    let ok: Outcome<u32, String> = Outcome::Success(1);
    assert_eq!(ok.into_result().unwrap(), Some(1));

    let done: Outcome<u32, String> = Outcome::Complete;
    assert_eq!(done.into_result().unwrap(), None);

    let up: Outcome<u32, String> = Outcome::Error("e".into());
    assert!(matches!(up.into_result(), Err(GuardError::Upstream(e)) if e == "e"));

    let denied: Outcome<u32, String> =
        Outcome::Denied(ratewatch_core::RequestNotPermitted::new("fixed"));
    match denied.into_result() {
        Err(GuardError::Policy(e)) => assert_eq!(e.client_code(), ClientCode::RateLimited),
        other => panic!("unexpected {other:?}"),
    }

    let interrupted: Outcome<u32, String> = Outcome::Interrupted;
    match interrupted.into_result() {
        Err(GuardError::Policy(e)) => assert_eq!(e.client_code(), ClientCode::Interrupted),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn app_state_transformer_reports_decisions() {
    let cfg = config::load_from_str(
        r#"
version: 1
rate_limiters:
  - name: "backendA"
    limit_for_period: 1
    limit_refresh_period_ms: 60000
"#,
    )
    .unwrap();
    let app = AppState::new(cfg).unwrap();

    let guard = app.transformer::<u32>("backendA").unwrap();
    assert_eq!(guard.policy_name(), "backendA");

    let first = guard.apply(async { Signal::<u32, String>::Success(1) }).await;
    let second = guard.apply(async { Signal::<u32, String>::Success(2) }).await;
    assert_eq!(first, Outcome::Success(1));
    assert!(matches!(second, Outcome::Denied(_)));

    let m = app.metrics();
    assert_eq!(
        m.permission_decisions
            .get(&[("policy", "backendA"), ("decision", "permitted")]),
        1
    );
    assert_eq!(
        m.permission_decisions
            .get(&[("policy", "backendA"), ("decision", "denied")]),
        1
    );

    let err = app.transformer::<u32>("missing").err().unwrap();
    assert_eq!(err.client_code(), ClientCode::NotFound);
}
