use crate::storage::StorageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Invalid selector `{selector}`: {reason}")]
    SelectorError { selector: String, reason: String },

    #[error("Invalid code pattern `{pattern}`: {source}")]
    PatternError {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Extraction error: {0}")]
    ExtractionError(String),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),
}

pub type ScraperResult<T> = Result<T, ScraperError>;
