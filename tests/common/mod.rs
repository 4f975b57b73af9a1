//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which wires a [`FileQueue`], an [`EventBus`] and
//! a [`ConversionDispatcher`] to a scripted in-process engine
//! ([`FakeTranscoder`]) so conversions run without ffmpeg.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use tunesmith::conversion::ConversionDispatcher;
use tunesmith::events::EventBus;
use tunesmith::queue::{FileQueue, SourceFile};
use tunesmith::{Error, RecordId, Result};
use tunesmith_av::{EngineLoader, ProgressSender, SharedEngine, TranscodeRequest, Transcoder};

/// Engine that converts by echoing a description of the request.
///
/// Per source name it can be told to fail or to hold until released.
#[derive(Default)]
pub struct FakeTranscoder {
    failures: Mutex<HashMap<String, String>>,
    gates: Mutex<HashMap<String, Arc<Semaphore>>>,
    hold_all: Mutex<Option<Arc<Semaphore>>>,
    seen: Mutex<Vec<TranscodeRequest>>,
    started: Mutex<HashSet<String>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
    calls: AtomicUsize,
}

impl FakeTranscoder {
    /// Make conversions of `name` fail with `reason`.
    pub fn fail_on(&self, name: &str, reason: &str) {
        self.failures.lock().insert(name.into(), reason.into());
    }

    /// Hold conversions of `name` until [`release`](Self::release).
    pub fn hold(&self, name: &str) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.gates.lock().insert(name.into(), Arc::clone(&gate));
        gate
    }

    /// Hold every conversion; returns the shared gate.
    pub fn hold_all(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.hold_all.lock() = Some(Arc::clone(&gate));
        gate
    }

    /// Release one held conversion of `name`.
    pub fn release(&self, name: &str) {
        if let Some(gate) = self.gates.lock().get(name) {
            gate.add_permits(1);
        }
    }

    /// Requests received so far, in arrival order.
    pub fn requests(&self) -> Vec<TranscodeRequest> {
        self.seen.lock().clone()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of conversions observed inside the engine at once.
    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Whether the engine has started converting `name`.
    pub fn has_started(&self, name: &str) -> bool {
        self.started.lock().contains(name)
    }

    /// Poll until `n` conversions are inside the engine.
    pub async fn wait_active(&self, n: usize) {
        for _ in 0..500 {
            if self.active() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("expected {n} active conversions, saw {}", self.active());
    }
}

/// Output bytes the fake engine produces for a request.
pub fn fake_output(request: &TranscodeRequest) -> Bytes {
    Bytes::from(format!(
        "{}|{}|{:?}",
        request.source_name,
        request.container(),
        request.effective_bitrate()
    ))
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    fn name(&self) -> &str {
        "fake"
    }

    async fn transcode(
        &self,
        request: TranscodeRequest,
        progress: &ProgressSender,
    ) -> Result<Bytes> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().push(request.clone());
        self.started.lock().insert(request.source_name.clone());

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);

        let gate = self
            .gates
            .lock()
            .get(&request.source_name)
            .cloned()
            .or_else(|| self.hold_all.lock().clone());

        progress.send(0.25);
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        tokio::task::yield_now().await;
        progress.send(0.5);
        progress.send(0.4);
        progress.send(1.0);

        self.active.fetch_sub(1, Ordering::SeqCst);

        match self.failures.lock().get(&request.source_name) {
            Some(reason) => Err(Error::transcode(reason.clone())),
            None => Ok(fake_output(&request)),
        }
    }
}

/// Loader handing out one [`FakeTranscoder`], counting loads.
pub struct FakeLoader {
    transcoder: Arc<FakeTranscoder>,
    loads: Arc<AtomicUsize>,
    failure: Option<String>,
}

#[async_trait]
impl EngineLoader for FakeLoader {
    async fn load(&self) -> Result<Arc<dyn Transcoder>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(10)).await;
        match &self.failure {
            Some(reason) => Err(Error::tool("fake", reason.clone())),
            None => Ok(Arc::clone(&self.transcoder) as Arc<dyn Transcoder>),
        }
    }
}

/// Queue, dispatcher and fake engine wired together.
pub struct TestHarness {
    pub events: Arc<EventBus>,
    pub queue: Arc<FileQueue>,
    pub engine: Arc<SharedEngine>,
    pub transcoder: Arc<FakeTranscoder>,
    pub loads: Arc<AtomicUsize>,
    pub dispatcher: ConversionDispatcher,
}

impl TestHarness {
    /// Harness allowing four concurrent conversions.
    pub fn new() -> Self {
        Self::build(4, None)
    }

    /// Harness with a custom concurrency bound.
    pub fn with_limit(max_concurrent: usize) -> Self {
        Self::build(max_concurrent, None)
    }

    /// Harness whose engine fails to initialize.
    pub fn failing_init(reason: &str) -> Self {
        Self::build(4, Some(reason.to_string()))
    }

    fn build(max_concurrent: usize, failure: Option<String>) -> Self {
        let events = Arc::new(EventBus::default());
        let queue = Arc::new(FileQueue::new(Arc::clone(&events)));
        let transcoder = Arc::new(FakeTranscoder::default());
        let loads = Arc::new(AtomicUsize::new(0));
        let engine = Arc::new(SharedEngine::new(FakeLoader {
            transcoder: Arc::clone(&transcoder),
            loads: Arc::clone(&loads),
            failure,
        }));
        let dispatcher =
            ConversionDispatcher::new(Arc::clone(&queue), Arc::clone(&engine), max_concurrent);

        Self {
            events,
            queue,
            engine,
            transcoder,
            loads,
            dispatcher,
        }
    }

    /// Queue one file per name.
    pub fn add(&self, names: &[&str]) -> Vec<RecordId> {
        self.queue.ingest(names.iter().map(|n| source(n)))
    }

    /// Wait for every task, failing the test after a few seconds.
    pub async fn settle(&self) {
        tokio::time::timeout(Duration::from_secs(5), self.dispatcher.wait_all())
            .await
            .expect("conversions did not settle");
    }
}

/// A source file whose MIME type follows its extension.
pub fn source(name: &str) -> SourceFile {
    let mime = tunesmith_common::paths::mime_for_path(std::path::Path::new(name));
    SourceFile::new(
        name,
        mime.map(str::to_string),
        Bytes::from(format!("input of {name}")),
    )
}
