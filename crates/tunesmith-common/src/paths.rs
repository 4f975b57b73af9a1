//! Path utilities for input acceptance and output naming.
//!
//! Files may enter a batch two ways: picked (checked by extension) or dropped
//! (checked by declared MIME type). Both tables live here so the front end and
//! the queue agree on what is convertible.

use std::path::Path;

use crate::AudioFormat;

/// File extensions accepted for conversion.
const ACCEPTED_EXTENSIONS: &[&str] = &["mp3", "wav", "flac", "ogg", "m4a", "mp4"];

/// MIME types accepted for conversion.
const ACCEPTED_MIME_TYPES: &[&str] = &[
    "audio/mpeg",
    "audio/wav",
    "audio/flac",
    "audio/ogg",
    "audio/aac",
    "video/mp4",
];

/// Check if a path has an accepted input extension.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use tunesmith_common::paths::is_accepted_file;
///
/// assert!(is_accepted_file(Path::new("song.flac")));
/// assert!(is_accepted_file(Path::new("/path/to/clip.MP4")));
/// assert!(!is_accepted_file(Path::new("notes.txt")));
/// ```
pub fn is_accepted_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ACCEPTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Check if a MIME type is accepted for conversion.
///
/// The comparison is exact; browsers and file managers report these in
/// lowercase.
pub fn is_accepted_mime(mime: &str) -> bool {
    ACCEPTED_MIME_TYPES.contains(&mime)
}

/// Derive the MIME type of an input from its file extension.
///
/// Returns `None` for extensions outside the accepted set.
pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    let mime = match ext.as_str() {
        "mp4" => "video/mp4",
        other => other.parse::<AudioFormat>().ok()?.container(),
    };
    Some(mime)
}

/// Base name used for converted outputs: everything before the first dot.
///
/// Falls back to `"output"` when that prefix is empty (e.g. `.wav`).
pub fn output_stem(name: &str) -> &str {
    let file_name = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(name);
    match file_name.split('.').next() {
        Some(stem) if !stem.is_empty() => stem,
        _ => "output",
    }
}

/// Name of the converted output for a source file name.
///
/// # Examples
///
/// ```
/// use tunesmith_common::{paths::output_name, AudioFormat};
///
/// assert_eq!(output_name("take 1.wav", AudioFormat::Mp3), "take 1.mp3");
/// ```
pub fn output_name(source_name: &str, format: AudioFormat) -> String {
    format!("{}.{}", output_stem(source_name), format.extension())
}

/// Get the list of accepted input extensions.
#[must_use]
pub fn accepted_extensions() -> &'static [&'static str] {
    ACCEPTED_EXTENSIONS
}

/// Get the list of accepted input MIME types.
#[must_use]
pub fn accepted_mime_types() -> &'static [&'static str] {
    ACCEPTED_MIME_TYPES
}
