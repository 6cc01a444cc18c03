//! Server-Sent Events endpoints for live policy events.
//!
//! Record framing: `id` is the policy name, `event` the event type's canonical
//! name, `data` the JSON event DTO. A client disconnect drops the response
//! stream, which cancels the underlying subscription.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures_util::stream::{BoxStream, StreamExt};

use ratewatch_core::PolicyEvent;

use super::error::ApiError;
use super::events::rejected;
use crate::app_state::AppState;
use crate::events::EventStream;
use crate::obs::metrics::GatewayMetrics;
use crate::policy::check_name;

pub type SseStream = BoxStream<'static, Result<Event, Infallible>>;

/// One SSE record per event. A policy name that is not a valid SSE id
/// (only reachable through a misbehaving `NamedPolicy`) leaves `id` unset.
pub fn to_sse_event(e: &PolicyEvent) -> Event {
    let data = match e.to_dto().to_json() {
        Ok(data) => data,
        Err(err) => {
            tracing::warn!(policy = %e.policy_name(), error = %err, "dropping unencodable event");
            return Event::default().comment("serialization error");
        }
    };

    let record = match check_name(e.policy_name()) {
        Ok(()) => Event::default().id(e.policy_name()),
        Err(_) => {
            tracing::warn!(policy = ?e.policy_name(), "policy name unusable as SSE id");
            Event::default()
        }
    };
    record.event(e.event_type().as_str()).data(data)
}

/// Keeps the subscriber gauge accurate for as long as the response stream lives.
struct SubscriberGuard {
    metrics: Arc<GatewayMetrics>,
    scope: &'static str,
}

impl SubscriberGuard {
    fn new(metrics: Arc<GatewayMetrics>, scope: &'static str) -> Self {
        metrics.stream_subscribers.inc(&[("scope", scope)]);
        tracing::info!(scope, "live event subscriber connected");
        Self { metrics, scope }
    }
}

impl Drop for SubscriberGuard {
    fn drop(&mut self) {
        self.metrics.stream_subscribers.dec(&[("scope", self.scope)]);
        tracing::info!(scope = self.scope, "live event subscriber gone");
    }
}

fn into_sse(app: &AppState, scope: &'static str, events: EventStream) -> Sse<SseStream> {
    let guard = SubscriberGuard::new(app.metrics(), scope);
    let stream = events
        .map(move |e| {
            let _held = &guard;
            Ok::<_, Infallible>(to_sse_event(&e))
        })
        .boxed();

    let keep_alive = Duration::from_millis(app.cfg().events.keep_alive_ms);
    Sse::new(stream).keep_alive(KeepAlive::default().interval(keep_alive))
}

pub async fn stream_all(State(app): State<AppState>) -> Sse<SseStream> {
    into_sse(&app, "all", app.streams().stream_all())
}

pub async fn stream_for(
    State(app): State<AppState>,
    Path(name): Path<String>,
) -> Result<Sse<SseStream>, ApiError> {
    let events = app.streams().stream_for(&name).map_err(|e| rejected(&app, e))?;
    Ok(into_sse(&app, "policy", events))
}

pub async fn stream_for_type(
    State(app): State<AppState>,
    Path((name, event_type)): Path<(String, String)>,
) -> Result<Sse<SseStream>, ApiError> {
    let events = app
        .streams()
        .stream_for_type(&name, &event_type)
        .map_err(|e| rejected(&app, e))?;
    Ok(into_sse(&app, "policy_type", events))
}
