//! Record types held by the [`FileQueue`](super::FileQueue).

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tunesmith_common::paths::mime_for_path;
use tunesmith_common::{AudioFormat, RecordId, Result};

/// An input file as handed over by the picker or drop layer.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// File name as the user sees it (no directory).
    pub name: String,
    /// Declared MIME type, if the source layer knows one.
    pub mime: Option<String>,
    /// Raw file contents.
    pub bytes: Bytes,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, mime: Option<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime,
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk. The MIME type is derived from the extension.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());

        Ok(Self {
            name,
            mime: mime_for_path(path).map(str::to_string),
            bytes: Bytes::from(bytes),
        })
    }

    /// Size of the contents in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Conversion parameters captured when a record starts converting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionParams {
    pub format: AudioFormat,
    /// Bitrate in kbps. Lossless formats ignore it.
    pub bitrate_kbps: Option<u32>,
}

impl ConversionParams {
    pub fn new(format: AudioFormat, bitrate_kbps: Option<u32>) -> Self {
        Self {
            format,
            bitrate_kbps,
        }
    }
}

/// A finished conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputArtifact {
    /// `<basename>.<extension>`.
    pub name: String,
    /// Container identifier, e.g. `audio/mpeg`.
    pub mime: String,
    pub bytes: Bytes,
}

/// Coarse status of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Idle,
    Converting,
    Done,
    Error,
}

impl RecordStatus {
    /// `Done` and `Error` never change again.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Converting => "converting",
            Self::Done => "done",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Status together with the data that only exists in that status.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordState {
    Idle,
    /// Progress in percent, `0.0..=100.0`.
    Converting { progress: f32 },
    Done { output: OutputArtifact },
    Error { reason: String },
}

impl RecordState {
    pub fn status(&self) -> RecordStatus {
        match self {
            Self::Idle => RecordStatus::Idle,
            Self::Converting { .. } => RecordStatus::Converting,
            Self::Done { .. } => RecordStatus::Done,
            Self::Error { .. } => RecordStatus::Error,
        }
    }
}

/// One file in the queue.
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub id: RecordId,
    pub source: Arc<SourceFile>,
    pub state: RecordState,
    /// Set when conversion starts; never re-read from settings afterwards.
    pub params: Option<ConversionParams>,
    pub added_at: DateTime<Utc>,
}

impl FileRecord {
    pub(crate) fn new(source: SourceFile) -> Self {
        Self {
            id: RecordId::new(),
            source: Arc::new(source),
            state: RecordState::Idle,
            params: None,
            added_at: Utc::now(),
        }
    }

    pub fn name(&self) -> &str {
        &self.source.name
    }

    pub fn status(&self) -> RecordStatus {
        self.state.status()
    }

    /// Progress in percent while converting.
    pub fn progress(&self) -> Option<f32> {
        match self.state {
            RecordState::Converting { progress } => Some(progress),
            _ => None,
        }
    }

    pub fn output(&self) -> Option<&OutputArtifact> {
        match &self.state {
            RecordState::Done { output } => Some(output),
            _ => None,
        }
    }

    /// Failure reason when the conversion failed.
    pub fn error(&self) -> Option<&str> {
        match &self.state {
            RecordState::Error { reason } => Some(reason),
            _ => None,
        }
    }
}
