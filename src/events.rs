//! Queue change notifications.
//!
//! Every change the [`FileQueue`](crate::queue::FileQueue) applies is
//! published on an [`EventBus`]. The command-line front end turns these into
//! progress lines; other front ends can subscribe the same way.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tunesmith_common::{AudioFormat, RecordId};
use uuid::Uuid;

/// What changed in the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueueEvent {
    // -- Membership ----------------------------------------------------------
    RecordsAdded {
        record_ids: Vec<RecordId>,
    },
    RecordRemoved {
        record_id: RecordId,
    },
    QueueReset {
        discarded: usize,
    },

    // -- Conversion ----------------------------------------------------------
    ConversionStarted {
        record_id: RecordId,
        format: AudioFormat,
        bitrate_kbps: Option<u32>,
    },
    ConversionProgress {
        record_id: RecordId,
        /// Percent, `0.0..=100.0`.
        progress: f32,
    },
    ConversionCompleted {
        record_id: RecordId,
        output_name: String,
        size_bytes: u64,
    },
    ConversionFailed {
        record_id: RecordId,
        error: String,
    },
}

/// A published queue change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub payload: QueueEvent,
}

impl Event {
    pub fn new(payload: QueueEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            payload,
        }
    }
}

/// Fan-out of queue changes to any number of subscribers.
///
/// Slow subscribers lose the oldest events (see
/// [`broadcast::error::RecvError::Lagged`]); the queue never waits for them.
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    /// `capacity` is the number of events buffered per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Publish a change. Having no subscribers is fine.
    pub fn broadcast(&self, payload: QueueEvent) {
        let _ = self.tx.send(Event::new(payload));
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
