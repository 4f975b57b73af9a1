use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tunesmith_av::ToolsConfig;
use tunesmith_common::AudioFormat;

use crate::archive::SUGGESTED_ARCHIVE_NAME;
use crate::queue::ConversionParams;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub conversion: ConversionConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConversionConfig {
    /// Target format token (default: "mp3")
    #[serde(default = "default_format")]
    pub format: AudioFormat,

    /// Bitrate in kbps for lossy formats (default: 128)
    #[serde(default = "default_bitrate")]
    pub bitrate: u32,

    /// Conversions running at once (default: available parallelism)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

fn default_format() -> AudioFormat {
    AudioFormat::Mp3
}

fn default_bitrate() -> u32 {
    128
}

fn default_max_concurrent() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            bitrate: default_bitrate(),
            max_concurrent: default_max_concurrent(),
        }
    }
}

impl ConversionConfig {
    /// Parameters captured by records when they start converting.
    pub fn params(&self) -> ConversionParams {
        ConversionParams::new(self.format, Some(self.bitrate))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    /// File name of the archive (default: "converted.zip")
    #[serde(default = "default_archive_name")]
    pub archive_name: String,

    /// Directory for the archive, and for individual outputs when some
    /// conversions fail (default: current directory)
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

fn default_archive_name() -> String {
    SUGGESTED_ARCHIVE_NAME.to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            archive_name: default_archive_name(),
            dir: default_output_dir(),
        }
    }
}

impl OutputConfig {
    /// Full path of the archive.
    pub fn archive_path(&self) -> PathBuf {
        self.dir.join(&self.archive_name)
    }
}
