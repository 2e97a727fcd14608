use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use reqwest::{Client, ClientBuilder};
use std::collections::HashMap;

use super::Scraper;
use crate::core::SpiderConfig;
use crate::{HttpRequest, HttpResponse, ScraperResult};

pub const DEFAULT_USER_AGENT: &str = "PatternMaker/1.0 (+https://kohana-beads.com)";

#[derive(Clone)]
pub struct HttpScraper {
    client: Client,
    user_agent: String,
}

impl HttpScraper {
    pub fn new() -> ScraperResult<Self> {
        Self::with_user_agent(DEFAULT_USER_AGENT)
    }

    pub fn with_user_agent(user_agent: &str) -> ScraperResult<Self> {
        let client = ClientBuilder::new()
            .user_agent(user_agent.to_string())
            .build()?;
        Ok(Self {
            client,
            user_agent: user_agent.to_string(),
        })
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    fn extract_headers(response: &reqwest::Response) -> HashMap<String, String> {
        response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|val| (k.to_string(), val.to_string())))
            .collect()
    }
}

#[async_trait]
impl Scraper for HttpScraper {
    async fn fetch(
        &self,
        request: HttpRequest,
        config: &SpiderConfig,
    ) -> ScraperResult<HttpResponse> {
        let start_time = Utc::now();
        let response = self
            .client
            .get(request.url.clone())
            .timeout(config.request_timeout)
            .send()
            .await?;

        let status = response.status().as_u16();
        let url = response.url().clone();
        let headers = Self::extract_headers(&response);
        let body = response.text().await?;
        let elapsed_ms = (Utc::now() - start_time).num_milliseconds();

        debug!(
            "Received response: url={}, status={}, body_length={}, elapsed={}ms",
            url,
            status,
            body.len(),
            elapsed_ms
        );

        Ok(HttpResponse {
            url,
            status,
            headers,
            body,
            timestamp: start_time,
            elapsed_ms,
            from_request: Box::new(request),
        })
    }

    fn box_clone(&self) -> Box<dyn Scraper> {
        Box::new(self.clone())
    }
}
