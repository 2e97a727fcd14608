use crate::core::SpiderConfig;
use crate::{HttpRequest, HttpResponse, ScraperResult};
use async_trait::async_trait;

/// Fetches one request. Implementations are cloned into every in-flight task,
/// so they must be cheap to clone (a shared client, an `Arc`'d table, ...).
#[async_trait]
pub trait Scraper: Send + Sync {
    async fn fetch(&self, request: HttpRequest, config: &SpiderConfig)
        -> ScraperResult<HttpResponse>;

    fn box_clone(&self) -> Box<dyn Scraper>;
}
