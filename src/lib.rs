pub mod config;
pub mod core;
pub mod extract;
pub mod http;
pub mod import;
pub mod items;
pub mod parser;
pub mod publish;
pub mod scrapers;
pub mod spiders;
pub mod stats;
pub mod storage;

pub use core::Crawler;
pub use core::{ScraperError, ScraperResult, Spider};
pub use http::{HttpRequest, HttpResponse};
pub use items::BeadRecord;
pub use scrapers::Scraper;
pub use spiders::BeadSpider;
pub use stats::StatsTracker;
