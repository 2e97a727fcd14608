use log::{debug, error, warn};
use std::fs::{self, File};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::{RecordSink, StorageError};
use crate::items::BeadRecord;

/// Output the streaming sink can cut back to a known length after a failed
/// write.
pub trait Truncate: Write + Send {
    fn truncate_to(&mut self, len: u64) -> io::Result<()>;
}

impl Truncate for File {
    fn truncate_to(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)?;
        self.seek(SeekFrom::Start(len))?;
        Ok(())
    }
}

/// Writes records into a JSON array one at a time, flushing after each so a
/// crashed crawl still leaves every finished record on disk.
///
/// Each record goes out as a single `separator + record` chunk. If that write
/// fails the output is truncated back to the last complete record, so the
/// failed record never shows up later and the array stays well formed.
///
/// If the process is killed outright the file ends without its closing `]`.
pub struct StreamingJsonSink<F: Truncate = File> {
    path: PathBuf,
    out: F,
    committed: u64,
    written: usize,
    closed: bool,
    poisoned: bool,
}

impl StreamingJsonSink<File> {
    /// Truncates any existing file at `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StorageError::Open {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let file = File::create(&path).map_err(|source| StorageError::Open {
            path: path.clone(),
            source,
        })?;
        debug!("Streaming records to {}", path.display());

        Ok(Self::with_output(path, file))
    }
}

impl<F: Truncate> StreamingJsonSink<F> {
    fn with_output(path: PathBuf, out: F) -> Self {
        Self {
            path,
            out,
            committed: 0,
            written: 0,
            closed: false,
            poisoned: false,
        }
    }

    fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), StorageError> {
        if let Err(e) = self.out.write_all(chunk).and_then(|()| self.out.flush()) {
            match self.out.truncate_to(self.committed) {
                Ok(()) => warn!(
                    "Rolled {} back to {} records after a failed write",
                    self.path.display(),
                    self.written
                ),
                Err(rollback) => {
                    error!("Cannot roll back {}: {}", self.path.display(), rollback);
                    self.poisoned = true;
                }
            }
            return Err(e.into());
        }
        self.committed += chunk.len() as u64;
        Ok(())
    }

    fn poisoned_error(&self) -> StorageError {
        StorageError::Poisoned {
            path: self.path.clone(),
        }
    }
}

impl<F: Truncate> RecordSink for StreamingJsonSink<F> {
    fn append(&mut self, record: &BeadRecord) -> Result<(), StorageError> {
        if self.closed {
            return Err(StorageError::SinkClosed);
        }
        if self.poisoned {
            return Err(self.poisoned_error());
        }

        let mut chunk = Vec::with_capacity(512);
        chunk.extend_from_slice(if self.written == 0 { b"[\n" } else { b",\n" });
        serde_json::to_writer_pretty(&mut chunk, record)?;

        self.write_chunk(&chunk)?;
        self.written += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<usize, StorageError> {
        if self.closed {
            return Ok(self.written);
        }
        self.closed = true;
        if self.poisoned {
            return Err(self.poisoned_error());
        }

        let tail: &[u8] = if self.written == 0 { b"[]" } else { b"\n]" };
        self.write_chunk(tail)?;
        debug!(
            "Closed {} after {} records",
            self.path.display(),
            self.written
        );
        Ok(self.written)
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl<F: Truncate> Drop for StreamingJsonSink<F> {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.close() {
                error!("Failed to close {}: {}", self.path.display(), e);
            }
        }
    }
}
