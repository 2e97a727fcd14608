//! Best-effort upload of a finished output file to object storage.
//!
//! [`RemoteStore`] backs the [`ObjectStore`] contract with an `object_store`
//! client (S3 in production). Upload problems are logged and never fail the
//! crawl.

mod remote;

pub use remote::RemoteStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use std::env::VarError;
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;

const DEFAULT_REGION: &str = "us-east-1";

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("object store error: {0}")]
    Store(#[from] object_store::Error),
}

#[derive(Clone, PartialEq, Eq)]
pub struct S3Settings {
    pub bucket: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
}

impl S3Settings {
    /// `None` unless bucket, key id and secret are all set.
    pub fn from_lookup<F>(lookup: &F) -> Option<Self>
    where
        F: Fn(&str) -> Result<String, VarError>,
    {
        let get = |var: &str| lookup(var).ok().filter(|v| !v.trim().is_empty());
        Some(Self {
            bucket: get("AWS_S3_BUCKET")?,
            access_key_id: get("AWS_ACCESS_KEY_ID")?,
            secret_access_key: get("AWS_SECRET_ACCESS_KEY")?,
            region: get("AWS_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
        })
    }
}

impl fmt::Debug for S3Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Settings")
            .field("bucket", &self.bucket)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("region", &self.region)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutObject {
    pub key: String,
    pub body: Vec<u8>,
    pub content_type: String,
    pub metadata: Vec<(String, String)>,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    fn bucket(&self) -> &str;

    async fn put_object(&self, object: PutObject) -> Result<(), PublishError>;
}

/// `beads/{site}/feed-{YYYYmmdd_HHMMSS}.json`
pub fn feed_key(site: &str, at: DateTime<Utc>) -> String {
    format!("beads/{}/feed-{}.json", site, at.format("%Y%m%d_%H%M%S"))
}

pub struct FeedPublisher {
    store: Box<dyn ObjectStore>,
}

impl FeedPublisher {
    pub fn new(store: Box<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Returns the object key on success. Failures are logged, not returned.
    pub async fn publish(&self, path: &Path, spider: &str, scraped_at: DateTime<Utc>) -> Option<String> {
        match self.try_publish(path, spider, scraped_at).await {
            Ok(key) => {
                info!("Uploaded {} to s3://{}/{}", path.display(), self.store.bucket(), key);
                Some(key)
            }
            Err(e) => {
                error!("Upload of {} failed: {}", path.display(), e);
                None
            }
        }
    }

    async fn try_publish(
        &self,
        path: &Path,
        spider: &str,
        scraped_at: DateTime<Utc>,
    ) -> Result<String, PublishError> {
        let body = fs::read(path).map_err(|source| PublishError::Read {
            path: path.display().to_string(),
            source,
        })?;
        if body.is_empty() {
            warn!("Uploading empty file {}", path.display());
        }

        let key = feed_key(spider, scraped_at);
        self.store
            .put_object(PutObject {
                key: key.clone(),
                body,
                content_type: "application/json".to_string(),
                metadata: vec![
                    ("spider".to_string(), spider.to_string()),
                    ("scraped_at".to_string(), scraped_at.to_rfc3339()),
                ],
            })
            .await?;
        Ok(key)
    }
}
