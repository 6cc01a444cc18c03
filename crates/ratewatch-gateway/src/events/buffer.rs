use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use ratewatch_core::PolicyEvent;

/// Default per-policy history length.
pub const DEFAULT_BUFFER_SIZE: usize = 100;

/// Buffered event plus its registry-wide arrival sequence (tie-breaker for sorting).
#[derive(Debug, Clone)]
pub struct Recorded {
    pub seq: u64,
    pub event: PolicyEvent,
}

/// Bounded FIFO history for one policy. Oldest entry is evicted when full.
pub struct EventBuffer {
    entries: Mutex<VecDeque<Recorded>>,
    capacity: usize,
    evicted: AtomicU64,
}

impl EventBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
            evicted: AtomicU64::new(0),
        }
    }

    /// Append `event`, drawing its arrival number from `seq` under this
    /// buffer's lock so stored order and sequence order agree.
    pub(crate) fn push(&self, seq: &AtomicU64, event: PolicyEvent) {
        let mut q = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if q.len() >= self.capacity {
            q.pop_front();
            self.evicted.fetch_add(1, Ordering::Relaxed);
        }
        let seq = seq.fetch_add(1, Ordering::Relaxed);
        q.push_back(Recorded { seq, event });
    }

    /// Oldest-first copy of the current contents.
    pub fn snapshot(&self) -> Vec<Recorded> {
        let q = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        q.iter().cloned().collect()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Events dropped to make room since creation.
    pub fn evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }
}
