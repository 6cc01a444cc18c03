//! Axum router wiring.
//!
//! Event routes live under `/{prefix}` (default `rate-limiter`); ops routes
//! stay at the root.

use axum::{routing::get, Router};

use crate::{app_state::AppState, http, ops};

pub fn build_router(state: AppState) -> Router {
    let events = Router::new()
        .route("/events", get(http::events::all_events))
        .route("/events/:name", get(http::events::events_for))
        .route("/events/:name/:event_type", get(http::events::events_for_type))
        .route("/stream/events", get(http::stream::stream_all))
        .route("/stream/events/:name", get(http::stream::stream_for))
        .route("/stream/events/:name/:event_type", get(http::stream::stream_for_type));

    let prefix = format!("/{}", state.cfg().gateway.prefix);

    Router::new()
        .nest(&prefix, events)
        .route("/healthz", get(ops::healthz))
        .route("/metrics", get(ops::metrics))
        .with_state(state)
}
