mod crawler;
mod errors;
pub mod pagination;
pub mod spider;

#[cfg(test)]
mod tests;

pub use crawler::Crawler;
pub use errors::{ScraperError, ScraperResult};
pub use pagination::Paginator;
pub use spider::{ParseResult, Spider, SpiderCallback, SpiderConfig, SpiderResponse};
