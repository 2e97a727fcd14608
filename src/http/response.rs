use super::HttpRequest;
use chrono::prelude::*;
use std::collections::HashMap;
use url::Url;

#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Final URL after redirects; relative links resolve against this.
    pub url: Url,
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
    pub timestamp: DateTime<Utc>,
    pub elapsed_ms: i64,
    pub from_request: Box<HttpRequest>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
