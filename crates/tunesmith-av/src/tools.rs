//! Locating the ffmpeg executable.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tunesmith_common::{Error, Result};

const FFMPEG: &str = "ffmpeg";

/// `[tools]` configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Explicit ffmpeg executable. `PATH` is searched when unset or missing.
    pub ffmpeg_path: Option<PathBuf>,
    /// Wall-clock limit for a single conversion, in seconds.
    pub timeout_secs: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            timeout_secs: 60 * 60,
        }
    }
}

impl ToolsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Availability report for one tool, as printed by `tunesmith check-tools`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub available: bool,
    /// First line of `-version` output.
    pub version: Option<String>,
    pub path: Option<PathBuf>,
}

/// Result of looking for the external tools tunesmith drives.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    ffmpeg: Option<PathBuf>,
}

impl ToolRegistry {
    /// Resolve ffmpeg: the configured path if it exists, else a `PATH` lookup.
    ///
    /// Blocking; async callers should go through `spawn_blocking`.
    pub fn discover(config: &ToolsConfig) -> Self {
        let ffmpeg = match config.ffmpeg_path.as_deref() {
            Some(path) if path.exists() => Some(path.to_path_buf()),
            Some(path) => {
                tracing::warn!(
                    "Configured ffmpeg path {} does not exist; searching PATH",
                    path.display()
                );
                which::which(FFMPEG).ok()
            }
            None => which::which(FFMPEG).ok(),
        };

        if let Some(path) = &ffmpeg {
            tracing::debug!("Using ffmpeg at {}", path.display());
        }

        Self { ffmpeg }
    }

    /// Path to ffmpeg, or [`Error::Tool`] when discovery found nothing.
    pub fn ffmpeg(&self) -> Result<&Path> {
        self.ffmpeg.as_deref().ok_or_else(|| {
            Error::tool(FFMPEG, "ffmpeg not found; is it installed and in PATH?")
        })
    }

    /// Check every tool and report what was found.
    pub fn check_all(&self) -> Vec<ToolInfo> {
        vec![ToolInfo {
            name: FFMPEG.to_string(),
            available: self.ffmpeg.is_some(),
            version: self.ffmpeg.as_deref().and_then(version_line),
            path: self.ffmpeg.clone(),
        }]
    }
}

fn version_line(path: &Path) -> Option<String> {
    let output = std::process::Command::new(path)
        .args(["-hide_banner", "-version"])
        .output()
        .ok()
        .filter(|o| o.status.success())?;

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(str::to_string)
}
