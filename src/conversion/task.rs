use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tunesmith_common::RecordId;

/// Failure reason recorded for a task cancelled before it reached the engine.
pub const CANCELLED_REASON: &str = "cancelled";

/// Handle to one outstanding conversion.
///
/// Cloning shares the same cancellation token. Cancelling takes effect only
/// while the task still waits for a concurrency slot; engine work that has
/// already started runs to completion.
#[derive(Debug, Clone)]
pub struct ConversionTask {
    record_id: RecordId,
    cancel: CancellationToken,
    started_at: DateTime<Utc>,
}

impl ConversionTask {
    pub(crate) fn new(record_id: RecordId) -> Self {
        Self {
            record_id,
            cancel: CancellationToken::new(),
            started_at: Utc::now(),
        }
    }

    pub fn record_id(&self) -> RecordId {
        self.record_id
    }

    /// When the dispatcher started the task.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub(crate) fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}
