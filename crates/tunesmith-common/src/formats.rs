//! Target audio formats and the token/extension/container mapping.
//!
//! A format token (`mp3`, `wav`, ...) is the short name shown to users. Each
//! token maps to exactly one file extension and one container identifier
//! (a MIME type), and the mapping is invertible.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A supported target audio format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    /// MPEG-1 Layer III.
    Mp3,
    /// RIFF WAVE (PCM).
    Wav,
    /// Free Lossless Audio Codec.
    Flac,
    /// Ogg Vorbis.
    Ogg,
    /// AAC in an MPEG-4 audio container.
    M4a,
}

impl AudioFormat {
    /// Every supported format, in the order presented to users.
    pub const ALL: [AudioFormat; 5] = [
        AudioFormat::Mp3,
        AudioFormat::Wav,
        AudioFormat::Flac,
        AudioFormat::Ogg,
        AudioFormat::M4a,
    ];

    /// The canonical token.
    pub fn token(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
            AudioFormat::Flac => "flac",
            AudioFormat::Ogg => "ogg",
            AudioFormat::M4a => "m4a",
        }
    }

    /// File extension of converted outputs (without the dot).
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
            AudioFormat::Flac => "flac",
            AudioFormat::Ogg => "ogg",
            AudioFormat::M4a => "m4a",
        }
    }

    /// Container identifier (MIME type) of converted outputs.
    pub fn container(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Flac => "audio/flac",
            AudioFormat::Ogg => "audio/ogg",
            AudioFormat::M4a => "audio/aac",
        }
    }

    /// Whether a bitrate applies to this format.
    ///
    /// Lossless formats ignore any bitrate supplied.
    pub fn is_lossy(&self) -> bool {
        matches!(self, AudioFormat::Mp3 | AudioFormat::Ogg | AudioFormat::M4a)
    }

    /// Look up a format by container identifier.
    pub fn from_container(container: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.container() == container)
            .ok_or_else(|| Error::unsupported_format(container))
    }
}

impl FromStr for AudioFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.token() == s)
            .ok_or_else(|| Error::unsupported_format(s))
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Token-level facade over [`AudioFormat`].
///
/// Stateless and process-wide; every call either resolves or fails with
/// [`Error::UnsupportedFormat`].
pub struct FormatRegistry;

impl FormatRegistry {
    /// Extension for a format token.
    pub fn to_extension(token: &str) -> Result<&'static str> {
        Ok(token.parse::<AudioFormat>()?.extension())
    }

    /// Container identifier for a format token.
    pub fn to_container(token: &str) -> Result<&'static str> {
        Ok(token.parse::<AudioFormat>()?.container())
    }

    /// Format token for a container identifier.
    pub fn from_container(container: &str) -> Result<AudioFormat> {
        AudioFormat::from_container(container)
    }

    /// All supported format tokens.
    pub fn tokens() -> impl Iterator<Item = &'static str> {
        AudioFormat::ALL.into_iter().map(|f| f.token())
    }
}
