//! ffmpeg-backed [`Transcoder`].
//!
//! Each conversion writes the input into a fresh [`Workspace`], runs
//! `ffmpeg -progress pipe:2` on it and reads the output file back. Progress
//! is the ratio of the `out_time_us` reports to the input `Duration:` line.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tunesmith_common::{AudioFormat, Error, Result};

use crate::command::ToolCommand;
use crate::engine::{EngineLoader, ProgressSender, TranscodeRequest, Transcoder};
use crate::tools::{ToolRegistry, ToolsConfig};
use crate::workspace::Workspace;

const VERSION_TIMEOUT: Duration = Duration::from_secs(10);

/// Loads the ffmpeg engine: locates the executable and checks it runs.
#[derive(Debug, Clone, Default)]
pub struct FfmpegLoader {
    tools: ToolsConfig,
}

impl FfmpegLoader {
    pub fn new(tools: ToolsConfig) -> Self {
        Self { tools }
    }
}

#[async_trait]
impl EngineLoader for FfmpegLoader {
    async fn load(&self) -> Result<Arc<dyn Transcoder>> {
        let config = self.tools.clone();
        let registry = tokio::task::spawn_blocking(move || ToolRegistry::discover(&config))
            .await
            .map_err(|e| Error::internal(format!("tool discovery panicked: {e}")))?;
        let path = registry.ffmpeg()?.to_path_buf();

        let output = ToolCommand::new(path.clone())
            .args(["-hide_banner", "-version"])
            .timeout(VERSION_TIMEOUT)
            .execute()
            .await?;
        let version = output
            .stdout
            .lines()
            .next()
            .unwrap_or("ffmpeg")
            .to_string();

        tracing::info!("Using {} at {}", version, path.display());

        Ok(Arc::new(FfmpegTranscoder::new(path, self.tools.timeout())))
    }
}

/// Runs conversions through an ffmpeg executable.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    path: PathBuf,
    timeout: Duration,
}

impl FfmpegTranscoder {
    pub fn new(path: PathBuf, timeout: Duration) -> Self {
        Self { path, timeout }
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn transcode(
        &self,
        request: TranscodeRequest,
        progress: &ProgressSender,
    ) -> Result<Bytes> {
        let workspace = Workspace::new()?;
        let input = workspace
            .write_input(&input_extension(&request.source_name), &request.input)
            .await?;
        let output = workspace.output(request.format.extension());

        let mut cmd = ToolCommand::new(self.path.clone());
        cmd.timeout(self.timeout).args(build_args(
            &input,
            &output,
            request.format,
            request.effective_bitrate(),
        ));

        tracing::debug!(
            "Transcoding {} to {} ({:?})",
            request.source_name,
            request.format,
            cmd.get_args()
        );

        let mut tracker = ProgressTracker::default();
        cmd.execute_with_stderr_callback(
            |line| {
                if let Some(ratio) = tracker.observe(line) {
                    progress.send(ratio);
                }
                !is_progress_line(line)
            },
            None,
        )
        .await
        .map_err(|e| Error::transcode(e.to_string()))?;

        let bytes = workspace.read_output(request.format.extension()).await?;
        Ok(Bytes::from(bytes))
    }
}

/// Audio codec ffmpeg should use for each output format.
fn codec(format: AudioFormat) -> &'static str {
    match format {
        AudioFormat::Mp3 => "libmp3lame",
        AudioFormat::Wav => "pcm_s16le",
        AudioFormat::Flac => "flac",
        AudioFormat::Ogg => "libvorbis",
        AudioFormat::M4a => "aac",
    }
}

fn build_args(
    input: &Path,
    output: &Path,
    format: AudioFormat,
    bitrate_kbps: Option<u32>,
) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-hide_banner".into(),
        "-y".into(),
        "-nostats".into(),
        "-progress".into(),
        "pipe:2".into(),
        "-i".into(),
        input.to_string_lossy().to_string(),
        "-vn".into(),
        "-c:a".into(),
        codec(format).into(),
    ];

    if let Some(kbps) = bitrate_kbps {
        args.push("-b:a".into());
        args.push(format!("{kbps}k"));
    }

    args.push(output.to_string_lossy().to_string());
    args
}

/// Extension of the source name, used as ffmpeg's input hint.
fn input_extension(source_name: &str) -> String {
    Path::new(source_name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| "bin".to_string())
}

/// Turns ffmpeg stderr lines into monotonic progress ratios.
#[derive(Debug, Default)]
struct ProgressTracker {
    duration_secs: Option<f64>,
    out_time_secs: f64,
    last: f32,
}

impl ProgressTracker {
    /// Feed one stderr line; returns a ratio when it advances.
    fn observe(&mut self, line: &str) -> Option<f32> {
        let line = line.trim();

        if self.duration_secs.is_none() {
            if let Some(rest) = line.strip_prefix("Duration:") {
                let stamp = rest.split(',').next().unwrap_or("").trim();
                self.duration_secs = parse_timestamp(stamp).filter(|d| *d > 0.0);
                return None;
            }
        }

        if let Some(us) = line.strip_prefix("out_time_us=") {
            if let Ok(us) = us.trim().parse::<i64>() {
                self.out_time_secs = us.max(0) as f64 / 1_000_000.0;
            }
            return None;
        }

        let ratio = match line {
            "progress=end" => 1.0,
            "progress=continue" => {
                let total = self.duration_secs?;
                (self.out_time_secs / total).min(1.0) as f32
            }
            _ => return None,
        };

        if ratio > self.last {
            self.last = ratio;
            Some(ratio)
        } else {
            None
        }
    }
}

/// Whether `line` is a `-progress` report (`key=value`, lowercase key).
fn is_progress_line(line: &str) -> bool {
    match line.trim().split_once('=') {
        Some((key, _)) => {
            !key.is_empty()
                && key
                    .bytes()
                    .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
        }
        None => false,
    }
}

/// Parse `HH:MM:SS.ss` into seconds.
fn parse_timestamp(stamp: &str) -> Option<f64> {
    let mut parts = stamp.split(':');
    let hours: f64 = parts.next()?.parse().ok()?;
    let minutes: f64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lossy_args_carry_bitrate() {
        let args = build_args(
            Path::new("/tmp/in.wav"),
            Path::new("/tmp/out.mp3"),
            AudioFormat::Mp3,
            Some(192),
        );
        let joined = args.join(" ");
        assert!(joined.contains("-progress pipe:2"));
        assert!(joined.contains("-i /tmp/in.wav"));
        assert!(joined.contains("-c:a libmp3lame -b:a 192k"));
        assert_eq!(args.last().unwrap(), "/tmp/out.mp3");
    }

    #[test]
    fn lossless_args_have_no_bitrate() {
        let args = build_args(
            Path::new("in.mp3"),
            Path::new("out.flac"),
            AudioFormat::Flac,
            None,
        );
        assert!(!args.iter().any(|a| a == "-b:a"));
        assert!(args.windows(2).any(|w| w == ["-c:a", "flac"]));
    }

    #[test]
    fn codec_table() {
        assert_eq!(codec(AudioFormat::Wav), "pcm_s16le");
        assert_eq!(codec(AudioFormat::Ogg), "libvorbis");
        assert_eq!(codec(AudioFormat::M4a), "aac");
    }

    #[test]
    fn input_extension_falls_back() {
        assert_eq!(input_extension("Song.MP3"), "mp3");
        assert_eq!(input_extension("clip.mp4"), "mp4");
        assert_eq!(input_extension("noext"), "bin");
    }

    #[test]
    fn timestamps() {
        assert_eq!(parse_timestamp("00:00:05.00"), Some(5.0));
        assert_eq!(parse_timestamp("01:02:03.5"), Some(3723.5));
        assert_eq!(parse_timestamp("N/A"), None);
        assert_eq!(parse_timestamp("1:2:3:4"), None);
    }

    #[test]
    fn tracker_reports_monotonic_ratios() {
        let mut t = ProgressTracker::default();
        assert_eq!(
            t.observe("  Duration: 00:00:10.00, start: 0.000000, bitrate: 1411 kb/s"),
            None
        );
        assert_eq!(t.observe("out_time_us=2500000"), None);
        assert_eq!(t.observe("progress=continue"), Some(0.25));
        // No advance, nothing reported.
        assert_eq!(t.observe("progress=continue"), None);
        assert_eq!(t.observe("out_time_us=1000000"), None);
        assert_eq!(t.observe("progress=continue"), None);
        assert_eq!(t.observe("out_time_us=7500000"), None);
        assert_eq!(t.observe("progress=continue"), Some(0.75));
        assert_eq!(t.observe("progress=end"), Some(1.0));
    }

    #[test]
    fn tracker_without_duration_only_reports_end() {
        let mut t = ProgressTracker::default();
        assert_eq!(t.observe("out_time_us=2500000"), None);
        assert_eq!(t.observe("progress=continue"), None);
        assert_eq!(t.observe("progress=end"), Some(1.0));
    }

    #[test]
    fn progress_lines_are_recognized() {
        assert!(is_progress_line("out_time_us=5000000"));
        assert!(is_progress_line("progress=continue"));
        assert!(is_progress_line("stream_0_0_q=-0.0"));
        assert!(!is_progress_line("Error opening input: Invalid data found"));
        assert!(!is_progress_line("[mp3 @ 0x55] Estimating duration from bitrate"));
        assert!(!is_progress_line("  Duration: 00:00:10.00, start: 0.000000"));
        assert!(!is_progress_line("=oops"));
    }

    #[test]
    fn negative_out_time_is_clamped() {
        let mut t = ProgressTracker::default();
        t.observe("Duration: 00:00:04.00, start: 0");
        t.observe("out_time_us=-4000");
        assert_eq!(t.observe("progress=continue"), None);
    }
}
