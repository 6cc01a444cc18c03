//! ratewatch core: policy events, their JSON shape, and the shared error surface.
//!
//! This crate carries no runtime or transport dependencies so the event model
//! can be reused by the gateway, by policy implementations, and by tooling.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths surface as `RateWatchError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod event;

pub use error::{RateWatchError, RequestNotPermitted, Result};
pub use event::{EventDto, EventType, PolicyEvent};
