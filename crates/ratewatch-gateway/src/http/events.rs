//! Snapshot endpoints: buffered events as JSON arrays.

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Json,
};

use ratewatch_core::error::{RateWatchError, Result};
use ratewatch_core::{EventDto, PolicyEvent};

use super::error::ApiError;
use crate::app_state::AppState;

fn render(events: &[PolicyEvent]) -> Response {
    let dtos: Vec<EventDto<'_>> = events.iter().map(EventDto::from).collect();
    Json(dtos).into_response()
}

fn respond(app: &AppState, result: Result<Vec<PolicyEvent>>) -> std::result::Result<Response, ApiError> {
    match result {
        Ok(events) => Ok(render(&events)),
        Err(e) => Err(rejected(app, e)),
    }
}

/// Count and log a client-addressable failure before rendering it.
pub(super) fn rejected(app: &AppState, e: RateWatchError) -> ApiError {
    let code = e.client_code().as_str();
    app.metrics().query_errors.inc(&[("code", code)]);
    tracing::debug!(code, error = %e, "event request rejected");
    ApiError(e)
}

pub async fn all_events(State(app): State<AppState>) -> Response {
    render(&app.queries().all_events())
}

pub async fn events_for(
    State(app): State<AppState>,
    Path(name): Path<String>,
) -> std::result::Result<Response, ApiError> {
    respond(&app, app.queries().events_for(&name))
}

pub async fn events_for_type(
    State(app): State<AppState>,
    Path((name, event_type)): Path<(String, String)>,
) -> std::result::Result<Response, ApiError> {
    respond(&app, app.queries().events_for_type(&name, &event_type))
}
