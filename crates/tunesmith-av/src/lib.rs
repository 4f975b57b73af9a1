//! # tunesmith-av
//!
//! Transcoding engine abstraction and the ffmpeg backend for tunesmith.
//!
//! This crate provides:
//!
//! - **Engine traits** ([`EngineLoader`], [`Transcoder`]) -- the boundary the
//!   conversion core talks to. A loader initializes an engine once; the
//!   resulting transcoder converts one input per call and reports progress.
//! - **Shared engine** ([`SharedEngine`]) -- process-wide, lazily initialized
//!   handle. Concurrent first users await a single initialization.
//! - **ffmpeg backend** ([`FfmpegLoader`], [`FfmpegTranscoder`]) -- drives the
//!   `ffmpeg` executable and parses its `-progress` output.
//! - **Tool discovery** ([`ToolRegistry`]) -- locate ffmpeg with an optional
//!   configured override.
//! - **Command execution** ([`ToolCommand`]) -- async builder with timeout,
//!   stderr streaming, and cancellation.
//! - **Workspace management** ([`Workspace`]) -- temporary directory holding
//!   one conversion's input and output files.

pub mod command;
pub mod engine;
pub mod ffmpeg;
pub mod tools;
pub mod workspace;

// ---- Re-exports for convenience ----

pub use command::{ToolCommand, ToolOutput};
pub use engine::{EngineLoader, ProgressSender, SharedEngine, TranscodeRequest, Transcoder};
pub use ffmpeg::{FfmpegLoader, FfmpegTranscoder};
pub use tools::{ToolInfo, ToolRegistry, ToolsConfig};
pub use workspace::Workspace;
