//! HTTP surface for event history and live streams.
//!
//! Routes are mounted under the configured prefix by [`crate::router`].

pub mod error;
pub mod events;
pub mod stream;

pub use error::ApiError;
