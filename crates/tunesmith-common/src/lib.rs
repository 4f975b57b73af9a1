//! Tunesmith-Common: Shared types, constants, and utilities.
//!
//! This crate provides common functionality used across tunesmith:
//!
//! - **Typed IDs**: UUID wrapper identifying queued file records
//! - **Formats**: The [`AudioFormat`] tokens and the [`FormatRegistry`] mapping
//!   between tokens, file extensions, and container identifiers
//! - **Path Utilities**: Input acceptance by extension and MIME type
//! - **Error Handling**: Common error type and result alias
//!
//! # Examples
//!
//! ```
//! use tunesmith_common::{AudioFormat, FormatRegistry, RecordId, Error, Result};
//! use tunesmith_common::paths::is_accepted_file;
//! use std::path::Path;
//!
//! let id = RecordId::new();
//!
//! assert_eq!(FormatRegistry::to_extension("m4a").unwrap(), "m4a");
//! assert_eq!(FormatRegistry::from_container("audio/aac").unwrap(), AudioFormat::M4a);
//!
//! assert!(is_accepted_file(Path::new("voice memo.wav")));
//!
//! fn example() -> Result<()> {
//!     Err(Error::unsupported_format("opus"))
//! }
//! # let _ = id;
//! ```

pub mod error;
pub mod formats;
pub mod ids;
pub mod paths;

pub use error::{Error, Result};
pub use formats::{AudioFormat, FormatRegistry};
pub use ids::*;
