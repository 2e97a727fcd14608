use std::path::PathBuf;
use thiserror::Error;

use crate::items::BeadRecord;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Sink already closed")]
    SinkClosed,

    #[error("{} holds a partial write that could not be rolled back", .path.display())]
    Poisoned { path: PathBuf },
}

/// Destination for finalized records. Owned by a single writer.
pub trait RecordSink: Send {
    fn append(&mut self, record: &BeadRecord) -> Result<(), StorageError>;

    /// Finishes the output and returns the number of records written.
    /// A second call is a no-op returning the same count.
    fn close(&mut self) -> Result<usize, StorageError>;

    fn path(&self) -> &std::path::Path;
}
