//! Workspace management for a single conversion.
//!
//! A [`Workspace`] owns a temporary directory holding the input written from
//! memory and the output produced by the transcoder. Everything is removed
//! when the workspace is dropped.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tunesmith_common::{Error, Result};

/// Temporary directory for one conversion.
///
/// # Example
///
/// ```no_run
/// use tunesmith_av::Workspace;
///
/// # async fn example() -> tunesmith_common::Result<()> {
/// let ws = Workspace::new()?;
/// let input = ws.write_input("wav", b"RIFF....").await?;
/// let output = ws.output("mp3");
/// // ... run the transcoder from `input` to `output` ...
/// let bytes = ws.read_output("mp3").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Workspace {
    temp_dir: TempDir,
}

impl Workspace {
    /// Create a new workspace under the system temp directory.
    pub fn new() -> Result<Self> {
        let temp_dir = tempfile::Builder::new()
            .prefix("tunesmith-")
            .tempdir()
            .map_err(|e| Error::tool("workspace", format!("failed to create temp dir: {e}")))?;

        Ok(Self { temp_dir })
    }

    /// Path to the temporary directory.
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Input file path for the given extension.
    pub fn input(&self, extension: &str) -> PathBuf {
        self.temp_dir.path().join(format!("input.{extension}"))
    }

    /// Output file path for the given extension.
    pub fn output(&self, extension: &str) -> PathBuf {
        self.temp_dir.path().join(format!("output.{extension}"))
    }

    /// Write the input bytes and return their path.
    pub async fn write_input(&self, extension: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.input(extension);
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }

    /// Read the produced output.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Tool`] if the transcoder did not produce the file.
    pub async fn read_output(&self, extension: &str) -> Result<Vec<u8>> {
        let path = self.output(extension);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::tool(
                "workspace",
                format!("output file does not exist: {}", path.display()),
            )),
            Err(e) => Err(e.into()),
        }
    }
}
