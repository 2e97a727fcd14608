use chrono::{DateTime, Duration, Utc};
use log::info;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub struct RequestStats {
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub total_requests: usize,
    pub successful_requests: usize,
    pub failed_requests: usize,
    pub offsite_filtered: usize,
    pub responses_received: usize,
    pub bytes_downloaded: usize,
    pub status_codes: HashMap<u16, usize>,
    pub average_response_time: f64, // in milliseconds
}

/// Request-level statistics shared between the crawl loop and its fetch tasks.
#[derive(Debug, Clone)]
pub struct StatsTracker {
    stats: Arc<RwLock<RequestStats>>,
}

impl StatsTracker {
    pub fn new() -> Self {
        Self {
            stats: Arc::new(RwLock::new(RequestStats {
                start_time: Utc::now(),
                end_time: None,
                total_requests: 0,
                successful_requests: 0,
                failed_requests: 0,
                offsite_filtered: 0,
                responses_received: 0,
                bytes_downloaded: 0,
                status_codes: HashMap::new(),
                average_response_time: 0.0,
            })),
        }
    }

    pub fn record_request(&self, status: u16, size: usize, duration: Duration) {
        let mut stats = self.stats.write();
        stats.total_requests += 1;
        stats.responses_received += 1;

        if (200..400).contains(&status) {
            stats.successful_requests += 1;
        } else {
            stats.failed_requests += 1;
        }

        *stats.status_codes.entry(status).or_insert(0) += 1;
        stats.bytes_downloaded += size;

        let received = stats.responses_received as f64;
        let current_total = stats.average_response_time * (received - 1.0);
        let new_duration = duration.num_milliseconds() as f64;
        stats.average_response_time = (current_total + new_duration) / received;
    }

    /// A fetch that never produced a response (connection refused, timeout, ...).
    pub fn record_failure(&self) {
        let mut stats = self.stats.write();
        stats.total_requests += 1;
        stats.failed_requests += 1;
    }

    pub fn record_offsite(&self) {
        self.stats.write().offsite_filtered += 1;
    }

    pub fn finish(&self) {
        self.stats.write().end_time = Some(Utc::now());
    }

    pub fn get_stats(&self) -> RequestStats {
        self.stats.read().clone()
    }

    pub fn print_summary(&self) {
        let stats = self.stats.read();
        let duration = stats
            .end_time
            .unwrap_or_else(Utc::now)
            .signed_duration_since(stats.start_time);

        info!("Request statistics:");
        info!("  Duration: {} seconds", duration.num_seconds());
        info!("  Total requests: {}", stats.total_requests);
        info!("  Successful requests: {}", stats.successful_requests);
        info!("  Failed requests: {}", stats.failed_requests);
        info!("  Offsite requests filtered: {}", stats.offsite_filtered);
        info!(
            "  Data downloaded: {:.2} MB",
            stats.bytes_downloaded as f64 / 1_000_000.0
        );
        info!(
            "  Average response time: {:.2}ms",
            stats.average_response_time
        );
        for (code, count) in &stats.status_codes {
            info!("  Status {}: {}", code, count);
        }
    }
}

impl Default for StatsTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Record-level counters for one crawl run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CrawlStats {
    pub records_emitted: usize,
    pub duplicates_skipped: usize,
    pub unmatched_skipped: usize,
    pub missing_links: usize,
    pub write_failures: usize,
    pub pages_visited: usize,
    /// Ordered so the summary prints sizes deterministically.
    pub size_counts: BTreeMap<String, usize>,
}

impl CrawlStats {
    pub fn record_emitted(&mut self, size: &str) {
        self.records_emitted += 1;
        *self.size_counts.entry(size.to_string()).or_insert(0) += 1;
    }

    pub fn print_summary(&self, spider: &str) {
        info!("SUMMARY [{}]: Found {} beads", spider, self.records_emitted);
        info!("Skipped {} duplicate products", self.duplicates_skipped);
        info!("Skipped {} names without a product code", self.unmatched_skipped);
        if self.missing_links > 0 {
            info!("Skipped {} tiles without a product link", self.missing_links);
        }
        if self.write_failures > 0 {
            info!("Lost {} beads to write failures", self.write_failures);
        }
        info!("Listing pages visited: {}", self.pages_visited);
        for (size, count) in &self.size_counts {
            info!("Size {}: {} beads", size, count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_splits_success_and_failure() {
        let tracker = StatsTracker::new();
        tracker.record_request(200, 100, Duration::milliseconds(10));
        tracker.record_request(404, 20, Duration::milliseconds(30));
        tracker.record_failure();

        let stats = tracker.get_stats();
        assert_eq!(stats.total_requests, 3);
        assert_eq!(stats.successful_requests, 1);
        assert_eq!(stats.failed_requests, 2);
        assert_eq!(stats.bytes_downloaded, 120);
        assert_eq!(stats.status_codes.get(&404), Some(&1));
    }

    #[test]
    fn size_tally_accumulates_per_label() {
        let mut stats = CrawlStats::default();
        stats.record_emitted("11/0");
        stats.record_emitted("11/0");
        stats.record_emitted("15/0");

        assert_eq!(stats.records_emitted, 3);
        assert_eq!(stats.size_counts.get("11/0"), Some(&2));
        assert_eq!(stats.size_counts.get("15/0"), Some(&1));
    }
}
