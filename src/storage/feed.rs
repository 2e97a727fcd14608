use chrono::{DateTime, Utc};
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::{RecordSink, StorageError};
use crate::items::BeadRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedMetadata {
    pub spider: String,
    pub scraped_at: DateTime<Utc>,
    pub total_results: usize,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedDocument {
    pub metadata: FeedMetadata,
    pub beads: Vec<BeadRecord>,
}

/// Buffers records and writes them as a single feed document on close.
///
/// The document goes to a uniquely named sibling first and is renamed over
/// `path`, so readers never see a half-written feed.
pub struct FeedSink {
    path: PathBuf,
    spider: String,
    source: String,
    started_at: DateTime<Utc>,
    beads: Vec<BeadRecord>,
    closed: Option<usize>,
}

impl FeedSink {
    pub fn new<P: AsRef<Path>>(path: P, spider: &str, source: &str) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            spider: spider.to_string(),
            source: source.to_string(),
            started_at: Utc::now(),
            beads: Vec::new(),
            closed: None,
        }
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    fn write_document(&mut self) -> Result<usize, StorageError> {
        let beads = std::mem::take(&mut self.beads);
        let document = FeedDocument {
            metadata: FeedMetadata {
                spider: self.spider.clone(),
                scraped_at: self.started_at,
                total_results: beads.len(),
                source: self.source.clone(),
            },
            beads,
        };
        let json = serde_json::to_string_pretty(&document)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "feed.json".to_string());
        let tmp = self
            .path
            .with_file_name(format!(".{}.{}.tmp", file_name, Uuid::now_v7()));

        fs::write(&tmp, json)?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }

        debug!("Wrote feed document to {}", self.path.display());
        Ok(document.metadata.total_results)
    }
}

impl RecordSink for FeedSink {
    fn append(&mut self, record: &BeadRecord) -> Result<(), StorageError> {
        if self.closed.is_some() {
            return Err(StorageError::SinkClosed);
        }
        self.beads.push(record.clone());
        Ok(())
    }

    fn close(&mut self) -> Result<usize, StorageError> {
        if let Some(count) = self.closed {
            return Ok(count);
        }
        let count = self.write_document()?;
        self.closed = Some(count);
        info!("Saved {} beads to {}", count, self.path.display());
        Ok(count)
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FeedSink {
    fn drop(&mut self) {
        if self.closed.is_none() {
            if let Err(e) = self.close() {
                error!("Failed to write feed {}: {}", self.path.display(), e);
            }
        }
    }
}
