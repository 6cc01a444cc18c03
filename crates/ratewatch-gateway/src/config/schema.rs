use std::collections::HashSet;

use serde::Deserialize;
use ratewatch_core::error::{Result, RateWatchError};

use crate::policy::check_name;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    pub version: u32,

    #[serde(default)]
    pub gateway: GatewaySection,

    #[serde(default)]
    pub events: EventsSection,

    #[serde(default)]
    pub rate_limiters: Vec<RateLimiterConfig>,
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(RateWatchError::UnsupportedVersion);
        }
        if self.rate_limiters.is_empty() {
            return Err(RateWatchError::BadRequest("rate_limiters must not be empty".into()));
        }

        self.gateway.validate()?;
        self.events.validate()?;

        let mut seen = HashSet::new();
        for rl in &self.rate_limiters {
            rl.validate()?;
            if !seen.insert(rl.name.as_str()) {
                return Err(RateWatchError::BadRequest(format!(
                    "duplicate rate limiter name: {}",
                    rl.name
                )));
            }
        }

        Ok(())
    }

    /// History length for one limiter (per-limiter override or the global default).
    pub fn buffer_size_for(&self, rl: &RateLimiterConfig) -> usize {
        rl.event_consumer_buffer_size.unwrap_or(self.events.buffer_size)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Path prefix the event routes are mounted under.
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            prefix: default_prefix(),
        }
    }
}

impl GatewaySection {
    pub fn validate(&self) -> Result<()> {
        if self.prefix.is_empty() || self.prefix.contains('/') {
            return Err(RateWatchError::BadRequest(
                "gateway.prefix must be a single non-empty path segment".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventsSection {
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Broadcast capacity of each limiter's live feed.
    #[serde(default = "default_stream_capacity")]
    pub stream_capacity: usize,

    #[serde(default = "default_keep_alive_ms")]
    pub keep_alive_ms: u64,
}

impl Default for EventsSection {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
            stream_capacity: default_stream_capacity(),
            keep_alive_ms: default_keep_alive_ms(),
        }
    }
}

impl EventsSection {
    pub fn validate(&self) -> Result<()> {
        if !(1..=100_000).contains(&self.buffer_size) {
            return Err(RateWatchError::BadRequest(
                "events.buffer_size must be between 1 and 100000".into(),
            ));
        }
        if !(1..=65_536).contains(&self.stream_capacity) {
            return Err(RateWatchError::BadRequest(
                "events.stream_capacity must be between 1 and 65536".into(),
            ));
        }
        if !(1000..=300_000).contains(&self.keep_alive_ms) {
            return Err(RateWatchError::BadRequest(
                "events.keep_alive_ms must be between 1000 and 300000".into(),
            ));
        }
        Ok(())
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}
fn default_prefix() -> String {
    "rate-limiter".into()
}
fn default_buffer_size() -> usize {
    100
}
fn default_stream_capacity() -> usize {
    256
}
fn default_keep_alive_ms() -> u64 {
    15000
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimiterConfig {
    pub name: String,
    pub limit_for_period: u32,
    pub limit_refresh_period_ms: u64,

    #[serde(default)]
    pub event_consumer_buffer_size: Option<usize>,

    #[serde(default = "default_true")]
    pub subscribe_for_events: bool,
}

impl RateLimiterConfig {
    pub fn validate(&self) -> Result<()> {
        check_name(&self.name)?;
        if self.limit_for_period == 0 {
            return Err(RateWatchError::BadRequest(format!(
                "rate_limiters[{}].limit_for_period must be >= 1",
                self.name
            )));
        }
        if self.limit_refresh_period_ms == 0 {
            return Err(RateWatchError::BadRequest(format!(
                "rate_limiters[{}].limit_refresh_period_ms must be >= 1",
                self.name
            )));
        }
        if self.event_consumer_buffer_size == Some(0) {
            return Err(RateWatchError::BadRequest(format!(
                "rate_limiters[{}].event_consumer_buffer_size must be >= 1",
                self.name
            )));
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}
