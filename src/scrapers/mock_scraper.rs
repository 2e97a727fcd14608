use crate::core::SpiderConfig;
use crate::{HttpRequest, HttpResponse, ScraperResult};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::sleep;

use super::Scraper;

#[derive(Clone, Debug)]
pub struct MockResponse {
    pub status: u16,
    pub body: String,
    pub delay: Option<std::time::Duration>,
}

impl MockResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// Serves canned pages keyed by absolute URL; unknown URLs get a 404.
/// Every fetch is logged so tests can assert on what was requested.
#[derive(Clone, Default)]
pub struct MockScraper {
    responses: Arc<HashMap<String, MockResponse>>,
    fetched: Arc<RwLock<Vec<String>>>,
}

impl MockScraper {
    pub fn new(responses: Vec<(&str, MockResponse)>) -> Self {
        Self {
            responses: Arc::new(
                responses
                    .into_iter()
                    .map(|(url, response)| (url.to_string(), response))
                    .collect(),
            ),
            fetched: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn fetched_urls(&self) -> Vec<String> {
        self.fetched.read().clone()
    }

    pub fn fetch_count(&self, url: &str) -> usize {
        self.fetched.read().iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl Scraper for MockScraper {
    async fn fetch(
        &self,
        request: HttpRequest,
        _config: &SpiderConfig,
    ) -> ScraperResult<HttpResponse> {
        let key = request.url.to_string();
        self.fetched.write().push(key.clone());

        let response = self.responses.get(&key).cloned().unwrap_or(MockResponse {
            status: 404,
            body: "Not Found".to_string(),
            delay: None,
        });

        if let Some(delay) = response.delay {
            sleep(delay).await;
        }

        Ok(HttpResponse {
            url: request.url.clone(),
            status: response.status,
            headers: HashMap::new(),
            body: response.body,
            timestamp: Utc::now(),
            elapsed_ms: 0,
            from_request: Box::new(request),
        })
    }

    fn box_clone(&self) -> Box<dyn Scraper> {
        Box::new(self.clone())
    }
}
