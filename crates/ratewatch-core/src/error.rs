//! Shared error type across ratewatch crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Referenced policy does not exist.
    NotFound,
    /// Event type string did not match any known type.
    InvalidType,
    /// Policy denied admission.
    RateLimited,
    /// Caller was interrupted while waiting on admission.
    Interrupted,
    /// Invalid input / malformed config.
    BadRequest,
    /// Unsupported config version.
    UnsupportedVersion,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::NotFound => "NOT_FOUND",
            ClientCode::InvalidType => "INVALID_TYPE",
            ClientCode::RateLimited => "RATE_LIMITED",
            ClientCode::Interrupted => "INTERRUPTED",
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Denial raised when a policy refuses admission for one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("rate limiter '{policy}' does not permit further calls")]
pub struct RequestNotPermitted {
    /// Name of the denying policy.
    pub policy: String,
}

impl RequestNotPermitted {
    pub fn new(policy: impl Into<String>) -> Self {
        Self {
            policy: policy.into(),
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, RateWatchError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Error)]
pub enum RateWatchError {
    #[error("rate limiter with name {0} not found")]
    NotFound(String),
    #[error("invalid event type: {0}")]
    InvalidType(String),
    #[error(transparent)]
    PermissionDenied(#[from] RequestNotPermitted),
    #[error("interrupted during permission wait")]
    InterruptedWait,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
}

impl RateWatchError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            RateWatchError::NotFound(_) => ClientCode::NotFound,
            RateWatchError::InvalidType(_) => ClientCode::InvalidType,
            RateWatchError::PermissionDenied(_) => ClientCode::RateLimited,
            RateWatchError::InterruptedWait => ClientCode::Interrupted,
            RateWatchError::BadRequest(_) => ClientCode::BadRequest,
            RateWatchError::UnsupportedVersion => ClientCode::UnsupportedVersion,
            RateWatchError::Internal(_) => ClientCode::Internal,
        }
    }
}
