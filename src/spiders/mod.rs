mod bead_spider;
mod state;

pub use bead_spider::BeadSpider;
pub use state::CrawlState;
