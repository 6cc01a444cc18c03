//! Live event streams (single source, filtered, and merged fan-in).
//!
//! Every stream subscribes at call time and sees only events emitted after
//! that point. History is served by [`super::EventQueryService`].
//!
//! Merging runs one forwarding task per source into a shared bounded channel.
//! Dropping the merged stream raises a shutdown signal that every forwarder
//! observes; each one then drops its source subscription and its channel
//! sender, and the channel closes once the last forwarder has exited.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::future;
use futures_util::stream::{self, BoxStream, Stream, StreamExt};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::{mpsc, watch};

use ratewatch_core::error::Result;
use ratewatch_core::{EventType, PolicyEvent};

use crate::policy::PolicyRegistry;

/// Merge queue depth shared by all forwarders of one subscription.
const MERGE_QUEUE: usize = 256;

pub type EventStream = BoxStream<'static, PolicyEvent>;

#[derive(Clone)]
pub struct EventStreamService {
    policies: Arc<PolicyRegistry>,
}

impl EventStreamService {
    pub fn new(policies: Arc<PolicyRegistry>) -> Self {
        Self { policies }
    }

    /// Interleaved live events of every registered policy, in arrival order.
    pub fn stream_all(&self) -> EventStream {
        let sources = self
            .policies
            .all()
            .iter()
            .map(|p| p.event_stream())
            .collect();
        MergedEvents::spawn(sources).boxed()
    }

    pub fn stream_for(&self, name: &str) -> Result<EventStream> {
        let policy = self.policies.find(name)?;
        Ok(live(policy.event_stream()).boxed())
    }

    /// Events of other types are dropped, not queued.
    pub fn stream_for_type(&self, name: &str, event_type: &str) -> Result<EventStream> {
        let policy = self.policies.find(name)?;
        let wanted = EventType::parse(event_type)?;
        Ok(live(policy.event_stream())
            .filter(move |e| future::ready(e.event_type() == wanted))
            .boxed())
    }
}

/// Broadcast subscription as a stream. Lag skips ahead; close ends the stream.
pub fn live(rx: broadcast::Receiver<PolicyEvent>) -> impl Stream<Item = PolicyEvent> + Send + 'static {
    stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => return Some((event, rx)),
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!(lagged = n, "live stream lagged, some events were skipped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    })
}

/// Fan-in of several live sources. Cancelled on drop.
pub struct MergedEvents {
    rx: mpsc::Receiver<PolicyEvent>,
    shutdown: watch::Sender<bool>,
}

impl MergedEvents {
    /// Must be called inside a tokio runtime.
    pub fn spawn(sources: Vec<broadcast::Receiver<PolicyEvent>>) -> Self {
        let (tx, rx) = mpsc::channel(MERGE_QUEUE);
        let (shutdown, _) = watch::channel(false);

        tracing::debug!(sources = sources.len(), "merging live event streams");
        for src in sources {
            tokio::spawn(forward(src, tx.clone(), shutdown.subscribe()));
        }
        // Only forwarders hold senders from here on.
        drop(tx);

        Self { rx, shutdown }
    }

    /// Stop every forwarder. Already-queued events are discarded on drop.
    pub fn cancel(&self) {
        let _ = self.shutdown.send(true);
    }
}

impl Drop for MergedEvents {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl Stream for MergedEvents {
    type Item = PolicyEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<PolicyEvent>> {
        self.rx.poll_recv(cx)
    }
}

async fn forward(
    mut src: broadcast::Receiver<PolicyEvent>,
    tx: mpsc::Sender<PolicyEvent>,
    mut stop: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            biased;
            _ = stop.changed() => break,
            _ = tx.closed() => break,
            msg = src.recv() => match msg {
                Ok(event) => {
                    tokio::select! {
                        biased;
                        _ = stop.changed() => break,
                        sent = tx.send(event) => if sent.is_err() { break },
                    }
                }
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!(lagged = n, "merge source lagged, some events were skipped");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
}
