//! Tunesmith - batch audio conversion
//!
//! Files are queued, converted concurrently through the shared transcoding
//! engine with per-file progress, and exported together as one zip archive.
//! This library crate exposes the core for the binary and integration tests.

pub mod archive;
pub mod config;
pub mod conversion;
pub mod events;
pub mod ingest;
pub mod queue;

pub use tunesmith_common::{AudioFormat, Error, FormatRegistry, RecordId, Result};
