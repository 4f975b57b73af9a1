//! The file queue: ordered records and the only place their state changes.
//!
//! Records move along `Idle -> Converting -> {Done, Error}`. All changes go
//! through one mutex, so transitions for the same record are serialized and
//! a terminal record stays terminal. Each applied change is published on the
//! queue's [`EventBus`].

mod record;

pub use record::*;

use std::sync::Arc;

use parking_lot::Mutex;
use tunesmith_common::{Error, RecordId, Result};

use crate::events::{EventBus, QueueEvent};

/// A state change requested by the conversion dispatcher.
#[derive(Debug, Clone)]
pub(crate) enum Transition {
    Start(ConversionParams),
    /// Percent; clamped to `0.0..=100.0`.
    Progress(f32),
    Completed(OutputArtifact),
    Failed(String),
}

impl Transition {
    fn action(&self) -> &'static str {
        match self {
            Self::Start(_) => "start",
            Self::Progress(_) => "report progress",
            Self::Completed(_) => "complete",
            Self::Failed(_) => "fail",
        }
    }
}

/// Number of records per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub idle: usize,
    pub converting: usize,
    pub done: usize,
    pub error: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.idle + self.converting + self.done + self.error
    }
}

/// Ordered collection of [`FileRecord`]s.
#[derive(Debug)]
pub struct FileQueue {
    records: Mutex<Vec<FileRecord>>,
    events: Arc<EventBus>,
}

impl Default for FileQueue {
    fn default() -> Self {
        Self::new(Arc::new(EventBus::default()))
    }
}

impl FileQueue {
    pub fn new(events: Arc<EventBus>) -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            events,
        }
    }

    /// The bus this queue publishes on.
    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Append one `Idle` record per file, in order, and return their ids.
    ///
    /// Names are not deduplicated; every file gets a fresh id.
    pub fn ingest(&self, files: impl IntoIterator<Item = SourceFile>) -> Vec<RecordId> {
        let mut records = self.records.lock();
        let ids: Vec<RecordId> = files
            .into_iter()
            .map(|source| {
                let record = FileRecord::new(source);
                let id = record.id;
                tracing::debug!("Queued {} as {}", record.name(), id);
                records.push(record);
                id
            })
            .collect();

        if !ids.is_empty() {
            self.events.broadcast(QueueEvent::RecordsAdded {
                record_ids: ids.clone(),
            });
        }
        ids
    }

    /// Remove an `Idle` record.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] for an unknown id, [`Error::InvalidTransition`]
    /// when the record is not `Idle` (the record is left untouched).
    pub fn remove(&self, id: RecordId) -> Result<FileRecord> {
        let mut records = self.records.lock();
        let index = records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| Error::not_found("record", id))?;

        let status = records[index].status();
        if status != RecordStatus::Idle {
            return Err(Error::invalid_transition(id, status, "remove"));
        }

        let record = records.remove(index);
        self.events
            .broadcast(QueueEvent::RecordRemoved { record_id: id });
        Ok(record)
    }

    /// Discard every record regardless of status. Returns how many were
    /// discarded.
    ///
    /// Later transitions for the discarded ids are ignored.
    pub fn reset_all(&self) -> usize {
        let mut records = self.records.lock();
        let discarded = records.len();
        records.clear();
        self.events.broadcast(QueueEvent::QueueReset { discarded });
        tracing::info!("Queue reset, {} records discarded", discarded);
        discarded
    }

    /// Apply one transition to the record with the given id.
    ///
    /// Returns `Ok(true)` when the record changed and `Ok(false)` when the
    /// transition was ignored: unknown id, terminal record, or progress not
    /// above the current value.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidTransition`] for `Start` on a record that is not
    /// `Idle`, or any other transition on an `Idle` record.
    pub(crate) fn apply_transition(&self, id: RecordId, transition: Transition) -> Result<bool> {
        let mut records = self.records.lock();
        let Some(record) = records.iter_mut().find(|r| r.id == id) else {
            tracing::debug!("Ignoring {} for unknown record {}", transition.action(), id);
            return Ok(false);
        };

        match apply(record, transition)? {
            Some(event) => {
                // Published under the lock so subscribers see applied order.
                self.events.broadcast(event);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Move every `Idle` record to `Converting` with the given parameters.
    ///
    /// Returns the started records in queue order. The scan and the
    /// transitions happen under one lock, so a record is started at most once
    /// even when called concurrently.
    pub(crate) fn start_idle(&self, params: ConversionParams) -> Vec<(RecordId, Arc<SourceFile>)> {
        let mut records = self.records.lock();
        let mut started = Vec::new();

        for record in records
            .iter_mut()
            .filter(|r| r.status() == RecordStatus::Idle)
        {
            match apply(record, Transition::Start(params)) {
                Ok(Some(event)) => {
                    self.events.broadcast(event);
                    started.push((record.id, Arc::clone(&record.source)));
                }
                Ok(None) => {}
                Err(e) => tracing::warn!("Could not start {}: {}", record.id, e),
            }
        }

        started
    }

    /// Ordered copy of all records.
    pub fn snapshot(&self) -> Vec<FileRecord> {
        self.records.lock().clone()
    }

    pub fn get(&self, id: RecordId) -> Option<FileRecord> {
        self.records.lock().iter().find(|r| r.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Whether every record is `Done`. True for an empty queue.
    pub fn all_done(&self) -> bool {
        self.records
            .lock()
            .iter()
            .all(|r| r.status() == RecordStatus::Done)
    }

    /// Whether no record is `Converting`.
    pub fn is_settled(&self) -> bool {
        self.records
            .lock()
            .iter()
            .all(|r| r.status() != RecordStatus::Converting)
    }

    pub fn counts(&self) -> StatusCounts {
        let records = self.records.lock();
        let mut counts = StatusCounts::default();
        for record in records.iter() {
            match record.status() {
                RecordStatus::Idle => counts.idle += 1,
                RecordStatus::Converting => counts.converting += 1,
                RecordStatus::Done => counts.done += 1,
                RecordStatus::Error => counts.error += 1,
            }
        }
        counts
    }
}

/// The state machine. Returns the event to publish, or `None` when ignored.
fn apply(record: &mut FileRecord, transition: Transition) -> Result<Option<QueueEvent>> {
    let id = record.id;
    let status = record.status();

    match transition {
        Transition::Start(params) => {
            if status != RecordStatus::Idle {
                return Err(Error::invalid_transition(id, status, "start"));
            }
            record.state = RecordState::Converting { progress: 0.0 };
            record.params = Some(params);
            Ok(Some(QueueEvent::ConversionStarted {
                record_id: id,
                format: params.format,
                bitrate_kbps: params.bitrate_kbps,
            }))
        }
        other if status == RecordStatus::Idle => {
            Err(Error::invalid_transition(id, status, other.action()))
        }
        other if status.is_terminal() => {
            tracing::debug!("Ignoring {} for {} record {}", other.action(), status, id);
            Ok(None)
        }
        Transition::Progress(value) => {
            let RecordState::Converting { progress } = &mut record.state else {
                return Ok(None);
            };
            let value = if value.is_finite() {
                value.clamp(0.0, 100.0)
            } else {
                return Ok(None);
            };
            if value <= *progress {
                return Ok(None);
            }
            *progress = value;
            Ok(Some(QueueEvent::ConversionProgress {
                record_id: id,
                progress: value,
            }))
        }
        Transition::Completed(output) => {
            let event = QueueEvent::ConversionCompleted {
                record_id: id,
                output_name: output.name.clone(),
                size_bytes: output.bytes.len() as u64,
            };
            record.state = RecordState::Done { output };
            Ok(Some(event))
        }
        Transition::Failed(reason) => {
            let event = QueueEvent::ConversionFailed {
                record_id: id,
                error: reason.clone(),
            };
            record.state = RecordState::Error { reason };
            Ok(Some(event))
        }
    }
}
