//! Zip export of a completed batch.
//!
//! [`ArchiveBuilder::build`] refuses to run unless every record is `Done`.
//! Members are written in queue order under the output names; repeated
//! names become `name (1).ext`, `name (2).ext`, and so on.

use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::path::Path;

use bytes::Bytes;
use tunesmith_common::{Error, Result};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::queue::{FileRecord, RecordStatus};

/// Name suggested for the downloaded archive.
pub const SUGGESTED_ARCHIVE_NAME: &str = "converted.zip";

/// A built archive.
#[derive(Debug, Clone)]
pub struct Archive {
    /// Zip file contents.
    pub bytes: Bytes,
    /// Member names in write order.
    pub members: Vec<String>,
}

impl Archive {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Write the archive to `path`, creating parent directories.
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, &self.bytes).await?;
        Ok(())
    }
}

/// Builds zip archives from queue records.
#[derive(Debug, Clone)]
pub struct ArchiveBuilder {
    compression: CompressionMethod,
}

impl Default for ArchiveBuilder {
    fn default() -> Self {
        Self {
            compression: CompressionMethod::Deflated,
        }
    }
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an archive holding the output of every record.
    ///
    /// An empty slice yields an empty archive.
    ///
    /// # Errors
    ///
    /// [`Error::IncompleteArchive`] when any record is not `Done`;
    /// [`Error::Archive`] when the zip writer fails.
    pub fn build(&self, records: &[FileRecord]) -> Result<Archive> {
        let pending = records
            .iter()
            .filter(|r| r.status() != RecordStatus::Done)
            .count();
        if pending > 0 {
            return Err(Error::IncompleteArchive {
                pending,
                total: records.len(),
            });
        }

        let options = SimpleFileOptions::default().compression_method(self.compression);
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let mut names = UniqueNames::default();
        let mut members = Vec::with_capacity(records.len());

        for record in records {
            let output = record.output().ok_or_else(|| {
                Error::internal(format!("record {} is done without output", record.id))
            })?;

            let name = names.claim(&output.name);
            writer
                .start_file(name.clone(), options)
                .map_err(|e| Error::Archive(format!("failed to add {name}: {e}")))?;
            writer.write_all(&output.bytes)?;
            members.push(name);
        }

        let cursor = writer
            .finish()
            .map_err(|e| Error::Archive(format!("failed to finish archive: {e}")))?;

        tracing::info!("Built archive with {} members", members.len());

        Ok(Archive {
            bytes: Bytes::from(cursor.into_inner()),
            members,
        })
    }
}

/// Hands out names that were not handed out before.
#[derive(Debug, Default)]
pub struct UniqueNames {
    used: HashSet<String>,
}

impl UniqueNames {
    /// Return `name`, or `stem (n).ext` with the smallest free `n`.
    pub fn claim(&mut self, name: &str) -> String {
        if self.used.insert(name.to_string()) {
            return name.to_string();
        }

        let (stem, ext) = match name.rfind('.') {
            Some(dot) if dot > 0 => name.split_at(dot),
            _ => (name, ""),
        };

        let mut n = 1;
        loop {
            let candidate = format!("{stem} ({n}){ext}");
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}
