//! In-process metrics for policy decisions, recorded events, and live
//! subscribers, rendered by `/metrics` in Prometheus text format.

pub mod metrics;
