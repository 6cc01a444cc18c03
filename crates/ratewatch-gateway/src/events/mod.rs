//! Event observability: per-policy history buffers, snapshot queries, and
//! live streams.

pub mod buffer;
pub mod query;
pub mod registry;
pub mod stream;

pub use buffer::{EventBuffer, Recorded, DEFAULT_BUFFER_SIZE};
pub use query::EventQueryService;
pub use registry::EventBufferRegistry;
pub use stream::{EventStream, EventStreamService, MergedEvents};
