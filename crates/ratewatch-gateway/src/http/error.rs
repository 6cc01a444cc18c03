use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use ratewatch_core::error::{ClientCode, RateWatchError};

/// HTTP rendering of [`RateWatchError`]: status from the client code, body
/// `{ "code": ..., "msg": ... }`.
#[derive(Debug)]
pub struct ApiError(pub RateWatchError);

impl From<RateWatchError> for ApiError {
    fn from(e: RateWatchError) -> Self {
        Self(e)
    }
}

pub fn status_for(code: ClientCode) -> StatusCode {
    match code {
        ClientCode::NotFound => StatusCode::NOT_FOUND,
        ClientCode::InvalidType | ClientCode::BadRequest | ClientCode::UnsupportedVersion => {
            StatusCode::BAD_REQUEST
        }
        ClientCode::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        ClientCode::Interrupted => StatusCode::SERVICE_UNAVAILABLE,
        ClientCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.0.client_code();
        let body = json!({
            "code": code.as_str(),
            "msg": self.0.to_string(),
        });
        (status_for(code), Json(body)).into_response()
    }
}
