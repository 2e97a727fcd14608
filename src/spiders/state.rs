use log::{debug, error, info};
use std::path::Path;

use crate::core::Paginator;
use crate::items::BeadRecord;
use crate::stats::CrawlStats;
use crate::storage::{RecordSink, StorageError};

/// Per-crawl mutable state: counters, the pagination cap and the output sink.
pub struct CrawlState {
    pub stats: CrawlStats,
    pub paginator: Paginator,
    sink: Box<dyn RecordSink>,
    closed: bool,
}

impl CrawlState {
    pub fn new(sink: Box<dyn RecordSink>, max_pages: Option<usize>) -> Self {
        Self {
            stats: CrawlStats::default(),
            paginator: Paginator::new(max_pages),
            sink,
            closed: false,
        }
    }

    pub fn output_path(&self) -> &Path {
        self.sink.path()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Writes a finished record. Counters move only when the write succeeds;
    /// a failed write is logged and the crawl carries on.
    pub fn finalize(&mut self, record: BeadRecord) {
        match self.sink.append(&record) {
            Ok(()) => {
                self.stats.record_emitted(&record.size);
                info!(
                    "Found bead #{}: {} ({}) - Size: {}",
                    self.stats.records_emitted, record.name, record.product_code, record.size
                );
            }
            Err(e) => {
                self.stats.write_failures += 1;
                error!("Error writing bead {}: {}", record.product_code, e);
            }
        }
    }

    /// Closes the sink and logs the crawl summary. Later calls do nothing.
    pub fn close(&mut self, spider: &str) -> Result<(), StorageError> {
        if self.closed {
            debug!("Crawl state for {} already closed", spider);
            return Ok(());
        }
        self.closed = true;
        self.stats.pages_visited = self.paginator.pages_visited();

        let result = self.sink.close();
        self.stats.print_summary(spider);
        let written = result?;
        info!(
            "Spider completed: {} beads saved to {}",
            written,
            self.sink.path().display()
        );
        Ok(())
    }
}
