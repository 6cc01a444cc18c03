use std::sync::Arc;

use ratewatch_core::error::{RateWatchError, Result};
use ratewatch_core::{EventType, PolicyEvent};

use super::buffer::Recorded;
use super::registry::EventBufferRegistry;

/// Point-in-time queries over buffered events.
///
/// Results are sorted by creation time; equal timestamps keep arrival order.
#[derive(Clone)]
pub struct EventQueryService {
    buffers: Arc<EventBufferRegistry>,
}

impl EventQueryService {
    pub fn new(buffers: Arc<EventBufferRegistry>) -> Self {
        Self { buffers }
    }

    pub fn all_events(&self) -> Vec<PolicyEvent> {
        let recorded = self
            .buffers
            .all()
            .into_iter()
            .flat_map(|(_, b)| b.snapshot())
            .collect();
        sorted(recorded)
    }

    pub fn events_for(&self, name: &str) -> Result<Vec<PolicyEvent>> {
        let buffer = self
            .buffers
            .get(name)
            .ok_or_else(|| RateWatchError::NotFound(name.to_string()))?;
        Ok(sorted(buffer.snapshot()))
    }

    pub fn events_for_type(&self, name: &str, event_type: &str) -> Result<Vec<PolicyEvent>> {
        let events = self.events_for(name)?;
        let wanted = EventType::parse(event_type)?;
        Ok(events
            .into_iter()
            .filter(|e| e.event_type() == wanted)
            .collect())
    }
}

fn sorted(mut recorded: Vec<Recorded>) -> Vec<PolicyEvent> {
    recorded.sort_by_key(|r| (r.event.creation_time(), r.seq));
    recorded.into_iter().map(|r| r.event).collect()
}
