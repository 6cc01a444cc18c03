//! Gateway configuration: strict YAML, validated before anything is built.
//!
//! The binary takes its config path from `RATEWATCH_CONFIG`, falling back to
//! `ratewatch.yaml` in the working directory.

pub mod schema;

use std::path::{Path, PathBuf};

use ratewatch_core::error::{RateWatchError, Result};

pub use schema::{EventsSection, GatewayConfig, GatewaySection, RateLimiterConfig};

pub const CONFIG_ENV: &str = "RATEWATCH_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "ratewatch.yaml";

/// Config path from an optional override; blank overrides are ignored.
pub fn resolve_path(over: Option<String>) -> PathBuf {
    over.filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

pub fn load_from_file(path: impl AsRef<Path>) -> Result<GatewayConfig> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|e| {
        RateWatchError::Internal(format!("cannot read config {}: {e}", path.display()))
    })?;
    let cfg = load_from_str(&raw)?;
    tracing::info!(
        path = %path.display(),
        rate_limiters = cfg.rate_limiters.len(),
        "config loaded"
    );
    Ok(cfg)
}

/// Unknown keys and schema mismatches are `BadRequest`; range checks come from
/// [`GatewayConfig::validate`].
pub fn load_from_str(raw: &str) -> Result<GatewayConfig> {
    serde_yaml::from_str::<GatewayConfig>(raw)
        .map_err(|e| RateWatchError::BadRequest(format!("config: {e}")))
        .and_then(|cfg| cfg.validate().map(|()| cfg))
}
