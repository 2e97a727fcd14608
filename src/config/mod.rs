pub mod settings;
pub mod site;

use std::path::PathBuf;
use thiserror::Error;

pub use settings::{build_settings, load_settings, Settings};
pub use site::{CodePatternConfig, OutputFormat, SiteConfig};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("unknown site preset: {0}")]
    UnknownSite(String),

    #[error("failed to read site config {path}: {source}")]
    SiteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse site config {path}: {source}")]
    SiteParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Scraper(#[from] crate::ScraperError),
}
