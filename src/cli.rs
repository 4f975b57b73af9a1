use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tunesmith::AudioFormat;

#[derive(Parser)]
#[command(name = "tunesmith")]
#[command(author, version, about = "Batch audio conversion with zip export")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert files and bundle the results into a zip archive
    Convert(ConvertArgs),

    /// List supported output formats
    Formats,

    /// Check that ffmpeg is available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}

#[derive(Args)]
pub struct ConvertArgs {
    /// Input files (mp3, wav, flac, ogg, m4a, mp4)
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output format
    #[arg(short, long, value_parser = parse_format)]
    pub format: Option<AudioFormat>,

    /// Bitrate in kbps (ignored by lossless formats)
    #[arg(short, long)]
    pub bitrate: Option<u32>,

    /// Archive path (default: `archive_name` inside the output directory)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output directory. Holds the archive unless `-o` names another
    /// directory; successful files are written here individually when some
    /// conversions fail
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Conversions running at once
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

fn parse_format(s: &str) -> Result<AudioFormat, String> {
    s.to_lowercase().parse().map_err(|e: tunesmith::Error| e.to_string())
}
