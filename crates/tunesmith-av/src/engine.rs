//! The transcoding engine boundary.
//!
//! The conversion core never talks to ffmpeg directly. It asks a
//! [`SharedEngine`] for a [`Transcoder`]; the first request runs the
//! [`EngineLoader`], every later request reuses the same instance, and there
//! is no teardown.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::OnceCell;
use tunesmith_common::{AudioFormat, Error, Result};

/// One conversion handed to a [`Transcoder`].
#[derive(Debug, Clone)]
pub struct TranscodeRequest {
    /// Original file name, used as a format hint for the input.
    pub source_name: String,
    /// Input bytes.
    pub input: Bytes,
    /// Target format.
    pub format: AudioFormat,
    /// Requested bitrate in kbps, forwarded verbatim for lossy formats.
    pub bitrate_kbps: Option<u32>,
}

impl TranscodeRequest {
    /// Container identifier of the requested output.
    pub fn container(&self) -> &'static str {
        self.format.container()
    }

    /// Bitrate to apply, or `None` when the target is lossless.
    pub fn effective_bitrate(&self) -> Option<u32> {
        if self.format.is_lossy() {
            self.bitrate_kbps
        } else {
            None
        }
    }
}

/// Sink for progress ratios reported by a transcoder.
///
/// Ratios are clamped to `[0, 1]`; non-finite values are dropped.
pub struct ProgressSender {
    callback: Box<dyn Fn(f32) + Send + Sync>,
}

impl ProgressSender {
    /// Create a new sender from the given callback.
    pub fn new(callback: impl Fn(f32) + Send + Sync + 'static) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Create a no-op sender that discards all progress reports.
    pub fn noop() -> Self {
        Self {
            callback: Box::new(|_| {}),
        }
    }

    /// Report progress as a fraction of the whole conversion.
    pub fn send(&self, ratio: f32) {
        if ratio.is_finite() {
            (self.callback)(ratio.clamp(0.0, 1.0));
        }
    }
}

impl std::fmt::Debug for ProgressSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressSender").finish_non_exhaustive()
    }
}

/// An initialized engine able to run conversions.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Convert one input, reporting progress as it goes.
    ///
    /// Reported ratios must be non-decreasing.
    async fn transcode(
        &self,
        request: TranscodeRequest,
        progress: &ProgressSender,
    ) -> Result<Bytes>;
}

/// One-time initialization of a [`Transcoder`].
#[async_trait]
pub trait EngineLoader: Send + Sync {
    /// Load the engine. Called at most once per [`SharedEngine`].
    async fn load(&self) -> Result<Arc<dyn Transcoder>>;
}

/// Lazily initialized, shared transcoding engine.
///
/// The outcome of the first initialization is kept for the lifetime of the
/// value, including failure: every caller after a failed load receives
/// [`Error::EngineInit`] without retrying.
pub struct SharedEngine {
    loader: Box<dyn EngineLoader>,
    cell: OnceCell<std::result::Result<Arc<dyn Transcoder>, String>>,
}

impl SharedEngine {
    /// Wrap a loader. Nothing is loaded until the first [`get`](Self::get).
    pub fn new(loader: impl EngineLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            cell: OnceCell::new(),
        }
    }

    /// Get the engine, initializing it on first use.
    ///
    /// Concurrent first callers all await the same initialization.
    pub async fn get(&self) -> Result<Arc<dyn Transcoder>> {
        let outcome = self
            .cell
            .get_or_init(|| async {
                tracing::info!("Initializing transcoding engine");
                match self.loader.load().await {
                    Ok(engine) => {
                        tracing::info!("Transcoding engine ready: {}", engine.name());
                        Ok(engine)
                    }
                    Err(e) => {
                        tracing::error!("Transcoding engine failed to initialize: {e}");
                        Err(e.to_string())
                    }
                }
            })
            .await;

        match outcome {
            Ok(engine) => Ok(Arc::clone(engine)),
            Err(reason) => Err(Error::EngineInit(reason.clone())),
        }
    }

    /// Whether initialization has completed (successfully or not).
    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }
}

impl std::fmt::Debug for SharedEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedEngine")
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}
