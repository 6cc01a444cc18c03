//! ratewatch gateway library entry.
//!
//! Wires rate-limiter policies, their event history buffers, the query and
//! live-stream services, and the HTTP surface into one stack. It is consumed
//! by the binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod config;
pub mod events;
pub mod http;
pub mod obs;
pub mod ops;
pub mod policy;
pub mod router;
pub mod transformer;
