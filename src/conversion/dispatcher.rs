//! Conversion dispatcher.
//!
//! Starts one independent task per idle record and routes the engine's
//! progress and outcome back to that record by id.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Notify, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tunesmith_av::{ProgressSender, SharedEngine, TranscodeRequest};
use tunesmith_common::paths::output_name;
use tunesmith_common::{RecordId, Result};

use super::task::{ConversionTask, CANCELLED_REASON};
use crate::queue::{ConversionParams, FileQueue, OutputArtifact, SourceFile, Transition};

struct Shared {
    queue: Arc<FileQueue>,
    engine: Arc<SharedEngine>,
    limit: Semaphore,
    tasks: Mutex<HashMap<RecordId, ConversionTask>>,
    idle: Notify,
}

impl Shared {
    fn finish(&self, id: RecordId) {
        let mut tasks = self.tasks.lock();
        tasks.remove(&id);
        if tasks.is_empty() {
            self.idle.notify_waiters();
        }
    }
}

/// Runs conversions for the records of one [`FileQueue`].
///
/// At most `max_concurrent` engine invocations run at a time. Records beyond
/// that are already `Converting` at progress 0 and wait for a slot.
#[derive(Clone)]
pub struct ConversionDispatcher {
    shared: Arc<Shared>,
    max_concurrent: usize,
}

impl ConversionDispatcher {
    /// Create a dispatcher. A `max_concurrent` of 0 is treated as 1.
    pub fn new(queue: Arc<FileQueue>, engine: Arc<SharedEngine>, max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            shared: Arc::new(Shared {
                queue,
                engine,
                limit: Semaphore::new(max_concurrent),
                tasks: Mutex::new(HashMap::new()),
                idle: Notify::new(),
            }),
            max_concurrent,
        }
    }

    pub fn queue(&self) -> &Arc<FileQueue> {
        &self.shared.queue
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Start a conversion for every `Idle` record and return their ids.
    ///
    /// Each record moves to `Converting` with `params` captured before its
    /// task is spawned. Returns immediately; use [`wait_all`](Self::wait_all)
    /// to await the outcomes. Must be called inside a tokio runtime.
    pub fn dispatch_idle(&self, params: ConversionParams) -> Vec<RecordId> {
        let started = self.shared.queue.start_idle(params);
        let mut ids = Vec::with_capacity(started.len());

        for (id, source) in started {
            let task = ConversionTask::new(id);
            let token = task.token();
            self.shared.tasks.lock().insert(id, task);

            info!(
                "Dispatching {} to {} ({})",
                source.name,
                params.format,
                params
                    .bitrate_kbps
                    .map(|b| format!("{b} kbps"))
                    .unwrap_or_else(|| "default bitrate".to_string())
            );

            let shared = Arc::clone(&self.shared);
            tokio::spawn(run_task(shared, id, source, params, token));
            ids.push(id);
        }

        ids
    }

    /// Resolve once no task is outstanding.
    pub async fn wait_all(&self) {
        loop {
            let notified = self.shared.idle.notified();
            if self.shared.tasks.lock().is_empty() {
                return;
            }
            notified.await;
        }
    }

    /// Number of outstanding tasks, waiting or running.
    pub fn in_flight(&self) -> usize {
        self.shared.tasks.lock().len()
    }

    /// Handle to the task of a record, if one is outstanding.
    pub fn task(&self, id: RecordId) -> Option<ConversionTask> {
        self.shared.tasks.lock().get(&id).cloned()
    }

    /// Cancel the task of a record. Returns whether a task was found.
    pub fn cancel(&self, id: RecordId) -> bool {
        match self.shared.tasks.lock().get(&id) {
            Some(task) => {
                task.cancel();
                true
            }
            None => false,
        }
    }

    /// Discard all records and cancel every outstanding task.
    ///
    /// Tasks still waiting for a slot never reach the engine. Engine work
    /// already running finishes, but its result finds no record and is
    /// dropped.
    pub fn reset_all(&self) -> usize {
        let discarded = {
            let mut tasks = self.shared.tasks.lock();
            for task in tasks.values() {
                task.cancel();
            }
            tasks.clear();
            self.shared.queue.reset_all()
        };
        self.shared.idle.notify_waiters();
        discarded
    }
}

impl std::fmt::Debug for ConversionDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversionDispatcher")
            .field("max_concurrent", &self.max_concurrent)
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

async fn run_task(
    shared: Arc<Shared>,
    id: RecordId,
    source: Arc<SourceFile>,
    params: ConversionParams,
    cancel: CancellationToken,
) {
    let permit = tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        permit = shared.limit.acquire() => Some(permit),
    };

    let result = match permit {
        None => Err(CANCELLED_REASON.to_string()),
        Some(Err(e)) => Err(format!("conversion limiter closed: {e}")),
        Some(Ok(permit)) => {
            let result = if cancel.is_cancelled() {
                Err(CANCELLED_REASON.to_string())
            } else {
                convert(&shared, id, &source, params)
                    .await
                    .map_err(|e| e.to_string())
            };
            drop(permit);
            result
        }
    };

    let transition = match result {
        Ok(output) => {
            info!("Converted {} to {}", source.name, output.name);
            Transition::Completed(output)
        }
        Err(reason) => {
            warn!("Conversion of {} failed: {}", source.name, reason);
            Transition::Failed(reason)
        }
    };

    match shared.queue.apply_transition(id, transition) {
        Ok(true) => {}
        Ok(false) => debug!("Result for {} dropped; record no longer queued", id),
        Err(e) => warn!("Could not record result for {}: {}", id, e),
    }

    shared.finish(id);
}

async fn convert(
    shared: &Shared,
    id: RecordId,
    source: &SourceFile,
    params: ConversionParams,
) -> Result<OutputArtifact> {
    let engine = shared.engine.get().await?;

    let queue = Arc::clone(&shared.queue);
    let progress = ProgressSender::new(move |ratio| {
        if let Err(e) = queue.apply_transition(id, Transition::Progress(ratio * 100.0)) {
            debug!("Progress for {} rejected: {}", id, e);
        }
    });

    let request = TranscodeRequest {
        source_name: source.name.clone(),
        input: source.bytes.clone(),
        format: params.format,
        bitrate_kbps: params.bitrate_kbps,
    };

    let bytes = engine.transcode(request, &progress).await?;

    Ok(OutputArtifact {
        name: output_name(&source.name, params.format),
        mime: params.format.container().to_string(),
        bytes,
    })
}
