//! Policy admission events and their wire representation.
//!
//! A [`PolicyEvent`] records one admission decision. It never changes after
//! construction; observers only ever see clones. [`EventDto`] is the JSON shape
//! served to snapshot and stream subscribers.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{RateWatchError, Result};

/// Outcome classification of one admission decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    SuccessfulAcquire,
    FailedAcquire,
}

impl EventType {
    /// Every variant, in declaration order.
    pub const ALL: [EventType; 2] = [EventType::SuccessfulAcquire, EventType::FailedAcquire];

    /// Canonical name (also the SSE `event` label).
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::SuccessfulAcquire => "SUCCESSFUL_ACQUIRE",
            EventType::FailedAcquire => "FAILED_ACQUIRE",
        }
    }

    /// Case-insensitive match against canonical names.
    pub fn parse(raw: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(raw))
            .ok_or_else(|| RateWatchError::InvalidType(raw.to_string()))
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = RateWatchError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Immutable record of one admission decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyEvent {
    policy_name: String,
    event_type: EventType,
    creation_time: DateTime<Utc>,
    number_of_permits: u32,
}

impl PolicyEvent {
    /// Event stamped with the current wall-clock time.
    pub fn now(policy_name: impl Into<String>, event_type: EventType, number_of_permits: u32) -> Self {
        Self::at(policy_name, event_type, Utc::now(), number_of_permits)
    }

    pub fn at(
        policy_name: impl Into<String>,
        event_type: EventType,
        creation_time: DateTime<Utc>,
        number_of_permits: u32,
    ) -> Self {
        Self {
            policy_name: policy_name.into(),
            event_type,
            creation_time,
            number_of_permits,
        }
    }

    pub fn policy_name(&self) -> &str {
        &self.policy_name
    }
    pub fn event_type(&self) -> EventType {
        self.event_type
    }
    pub fn creation_time(&self) -> DateTime<Utc> {
        self.creation_time
    }
    pub fn number_of_permits(&self) -> u32 {
        self.number_of_permits
    }

    pub fn to_dto(&self) -> EventDto<'_> {
        EventDto::from(self)
    }
}

/// JSON view of a [`PolicyEvent`].
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDto<'a> {
    pub rate_limiter_name: &'a str,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub creation_time: DateTime<Utc>,
    pub number_of_permits: u32,
}

impl<'a> From<&'a PolicyEvent> for EventDto<'a> {
    fn from(e: &'a PolicyEvent) -> Self {
        Self {
            rate_limiter_name: &e.policy_name,
            event_type: e.event_type,
            creation_time: e.creation_time,
            number_of_permits: e.number_of_permits,
        }
    }
}

impl EventDto<'_> {
    /// Serialize once for push delivery.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| RateWatchError::Internal(format!("event encode failed: {e}")))
    }
}
