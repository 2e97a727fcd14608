use chrono::Duration;
use futures::stream::{FuturesUnordered, StreamExt};
use log::{debug, error, info, warn};
use parking_lot::RwLock;
use std::collections::{HashSet, VecDeque};
use tokio::spawn;
use tokio::task::JoinHandle;
use url::Url;

use super::spider::{ParseResult, SpiderConfig, SpiderResponse};
use crate::stats::StatsTracker;
use crate::{HttpRequest, HttpResponse, Scraper, ScraperResult, Spider};

type FetchHandle = JoinHandle<(Url, ScraperResult<HttpResponse>)>;

/// Drives a spider: fetches run as spawned tasks, while every response is
/// handed to the spider one at a time on this loop.
pub struct Crawler {
    scraper: Box<dyn Scraper>,
    visited_urls: RwLock<HashSet<String>>,
    stats: StatsTracker,
}

impl Crawler {
    pub fn new(scraper: Box<dyn Scraper>) -> Self {
        info!("Initializing crawler");
        Self {
            scraper,
            visited_urls: RwLock::new(HashSet::new()),
            stats: StatsTracker::new(),
        }
    }

    pub fn stats(&self) -> &StatsTracker {
        &self.stats
    }

    /// Runs the spider to completion and hands it back. `Spider::close` is
    /// called exactly once, including when the spider asks to stop early.
    pub async fn run<S: Spider>(&self, mut spider: S) -> ScraperResult<S> {
        let config = spider.config().clone();
        info!("Starting spider: {}", spider.name());
        debug!(
            "Max depth: {}, max concurrency: {}",
            config.max_depth, config.max_concurrency
        );

        let mut queue = VecDeque::new();
        self.enqueue(spider.start_requests(), &config, &mut queue);

        let mut in_flight = FuturesUnordered::new();
        let reason = self
            .drive(&mut spider, &config, &mut queue, &mut in_flight)
            .await;

        for handle in in_flight.iter() {
            handle.abort();
        }

        let closed = spider.close(reason).await;
        self.stats.finish();
        info!(
            "Spider {} {}. Total URLs processed: {}",
            spider.name(),
            reason,
            self.visited_urls.read().len()
        );
        self.stats.print_summary();

        closed?;
        Ok(spider)
    }

    async fn drive<S: Spider>(
        &self,
        spider: &mut S,
        config: &SpiderConfig,
        queue: &mut VecDeque<HttpRequest>,
        in_flight: &mut FuturesUnordered<FetchHandle>,
    ) -> &'static str {
        loop {
            while in_flight.len() < config.max_concurrency {
                let Some(request) = queue.pop_front() else {
                    break;
                };
                in_flight.push(self.spawn_fetch(request, config));
            }

            let Some(joined) = in_flight.next().await else {
                return "finished";
            };

            let (url, result) = match joined {
                Ok(done) => done,
                Err(e) => {
                    warn!("Task error: {}", e);
                    self.stats.record_failure();
                    continue;
                }
            };

            let response = match result {
                Ok(response) => response,
                Err(e) => {
                    warn!("Request failed for {}: {}", url, e);
                    self.stats.record_failure();
                    continue;
                }
            };

            self.stats.record_request(
                response.status,
                response.body.len(),
                Duration::milliseconds(response.elapsed_ms),
            );

            if !response.is_success() {
                warn!("Skipping {} - HTTP status {}", url, response.status);
                continue;
            }

            let spider_response = SpiderResponse {
                callback: response.from_request.callback.clone(),
                response,
            };

            match spider.parse(spider_response).await {
                Ok(ParseResult::Continue(requests)) => self.enqueue(requests, config, queue),
                Ok(ParseResult::Skip) => debug!("Skipping {}", url),
                Ok(ParseResult::Stop) => {
                    info!("Spider requested stop");
                    return "stopped";
                }
                Err(e) => error!("Failed to parse {}: {}", url, e),
            }
        }
    }

    fn enqueue(
        &self,
        requests: Vec<HttpRequest>,
        config: &SpiderConfig,
        queue: &mut VecDeque<HttpRequest>,
    ) {
        for request in requests {
            if request.depth >= config.max_depth {
                debug!("Skipping URL {} - max depth reached", request.url);
                continue;
            }

            if !config.is_allowed(&request.url) {
                debug!("Filtered offsite request to {}", request.url);
                self.stats.record_offsite();
                continue;
            }

            let url_str = request.url.to_string();
            if !self.visited_urls.write().insert(url_str.clone()) {
                debug!("Skipping URL {} - already visited", url_str);
                continue;
            }

            debug!("Queued URL: {} at depth {}", url_str, request.depth);
            queue.push_back(request);
        }
    }

    fn spawn_fetch(&self, request: HttpRequest, config: &SpiderConfig) -> FetchHandle {
        let scraper = self.scraper.box_clone();
        let config = config.clone();

        spawn(async move {
            let url = request.url.clone();
            let result = scraper.fetch(request, &config).await;
            (url, result)
        })
    }
}
