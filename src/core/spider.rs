use async_trait::async_trait;
use std::time::Duration;

use crate::http::{HttpRequest, HttpResponse};
use crate::items::PartialBead;
use crate::ScraperResult;

/// Routes a fetched response back to the spider method that asked for it.
///
/// `ParseDetail` carries the partially built record, so a detail response is
/// always merged into the bead that scheduled it, whatever the arrival order.
#[derive(Debug, Clone)]
pub enum SpiderCallback {
    Bootstrap,
    ParsePagination,
    ParseDetail(Box<PartialBead>),
}

#[derive(Debug)]
pub enum ParseResult {
    Continue(Vec<HttpRequest>),
    Skip,
    Stop,
}

#[derive(Debug, Clone)]
pub struct SpiderResponse {
    pub response: HttpResponse,
    pub callback: SpiderCallback,
}

#[derive(Debug, Clone)]
pub struct SpiderConfig {
    pub max_depth: usize,
    pub max_concurrency: usize,
    pub allowed_domains: Vec<String>,
    pub request_timeout: Duration,
}

impl Default for SpiderConfig {
    fn default() -> Self {
        Self {
            max_depth: usize::MAX,
            max_concurrency: 16,
            allowed_domains: Vec::new(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl SpiderConfig {
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.max_concurrency = concurrency.max(1);
        self
    }

    pub fn with_allowed_domains<S: Into<String>>(mut self, domains: Vec<S>) -> Self {
        self.allowed_domains = domains.into_iter().map(Into::into).collect();
        self
    }

    /// Offsite check: a host is allowed when it equals one of the configured
    /// domains or is a subdomain of one. An empty list allows everything.
    pub fn is_allowed(&self, url: &url::Url) -> bool {
        if self.allowed_domains.is_empty() {
            return true;
        }
        let Some(host) = url.host_str() else {
            return false;
        };
        self.allowed_domains.iter().any(|domain| {
            host == domain
                || host
                    .strip_suffix(domain.as_str())
                    .is_some_and(|rest| rest.ends_with('.'))
        })
    }
}

/// A spider is driven by a single crawl loop: `parse` and `close` take
/// `&mut self` and are never called concurrently, so spider state (counters,
/// open output files) needs no locking.
#[async_trait]
pub trait Spider: Send {
    fn name(&self) -> String;
    fn start_requests(&self) -> Vec<HttpRequest>;
    fn config(&self) -> &SpiderConfig;

    async fn parse(&mut self, response: SpiderResponse) -> ScraperResult<ParseResult>;

    /// Called exactly once when the crawl ends, whatever the reason.
    async fn close(&mut self, reason: &str) -> ScraperResult<()> {
        let _ = reason;
        Ok(())
    }
}
