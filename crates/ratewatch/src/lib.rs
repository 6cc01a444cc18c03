//! Top-level facade crate for ratewatch.
//!
//! Re-exports core types and the gateway library so users can depend on a single crate.

pub mod core {
    pub use ratewatch_core::*;
}

pub mod gateway {
    pub use ratewatch_gateway::*;
}
