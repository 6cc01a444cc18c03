//! In-process token-bucket limiter.
//!
//! Grants `limit_for_period` permits per refresh period, refilled in proportion
//! to elapsed time. Every admission check publishes one [`PolicyEvent`] on a
//! broadcast channel; publishing with no subscribers is not an error.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;

use ratewatch_core::{EventType, PolicyEvent};

use super::NamedPolicy;

pub struct TokenBucketLimiter {
    name: String,
    bucket: Mutex<TokenBucket>,
    events: broadcast::Sender<PolicyEvent>,
}

impl TokenBucketLimiter {
    pub fn new(
        name: impl Into<String>,
        limit_for_period: u32,
        refresh_period_ms: u64,
        stream_capacity: usize,
    ) -> Self {
        let (events, _) = broadcast::channel(stream_capacity.max(1));
        Self {
            name: name.into(),
            bucket: Mutex::new(TokenBucket::new(limit_for_period, refresh_period_ms)),
            events,
        }
    }

    /// Live subscriptions currently attached to this limiter.
    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }

    fn take(&self) -> bool {
        // Poisoned mutex means logic bug; treat as "deny" instead of panic.
        if let Ok(mut b) = self.bucket.lock() {
            b.allow()
        } else {
            false
        }
    }
}

impl NamedPolicy for TokenBucketLimiter {
    fn name(&self) -> &str {
        &self.name
    }

    fn acquire_permission(&self) -> bool {
        let permitted = self.take();
        let event_type = if permitted {
            EventType::SuccessfulAcquire
        } else {
            EventType::FailedAcquire
        };
        // Err only means nobody is listening right now.
        let _ = self.events.send(PolicyEvent::now(&self.name, event_type, 1));
        tracing::debug!(policy = %self.name, permitted, "permission decided");
        permitted
    }

    fn event_stream(&self) -> broadcast::Receiver<PolicyEvent> {
        self.events.subscribe()
    }
}

#[derive(Debug)]
struct TokenBucket {
    limit: u32,
    period: Duration,
    tokens: u32,
    last: Instant,
}

impl TokenBucket {
    fn new(limit_for_period: u32, refresh_period_ms: u64) -> Self {
        let limit = limit_for_period.max(1);
        Self {
            limit,
            period: Duration::from_millis(refresh_period_ms.max(1)),
            tokens: limit,
            last: Instant::now(),
        }
    }

    fn allow(&mut self) -> bool {
        self.refill();

        if self.tokens == 0 {
            return false;
        }
        self.tokens -= 1;
        true
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last);

        let add = elapsed.as_nanos() * self.limit as u128 / self.period.as_nanos();
        if add > 0 {
            self.tokens = (self.tokens as u128 + add).min(self.limit as u128) as u32;
            self.last = now;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denies_once_period_budget_is_spent() {
        let lim = TokenBucketLimiter::new("backendA", 2, 60_000, 16);
        assert!(lim.acquire_permission());
        assert!(lim.acquire_permission());
        assert!(!lim.acquire_permission());
    }

    #[test]
    fn emits_one_event_per_call() {
        let lim = TokenBucketLimiter::new("backendA", 2, 60_000, 16);
        let mut rx = lim.event_stream();

        let decisions: Vec<bool> = (0..5).map(|_| lim.acquire_permission()).collect();

        let mut seen = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            assert_eq!(ev.policy_name(), "backendA");
            seen.push(ev.event_type() == EventType::SuccessfulAcquire);
        }
        assert_eq!(seen, decisions);
    }

    #[test]
    fn refills_after_period() {
        let lim = TokenBucketLimiter::new("fast", 1, 20, 4);
        assert!(lim.acquire_permission());
        assert!(!lim.acquire_permission());
        std::thread::sleep(Duration::from_millis(40));
        assert!(lim.acquire_permission());
    }

    #[test]
    fn no_subscribers_is_fine() {
        let lim = TokenBucketLimiter::new("quiet", 1, 1000, 4);
        assert_eq!(lim.subscriber_count(), 0);
        assert!(lim.acquire_permission());
    }
}
