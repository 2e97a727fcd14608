use async_trait::async_trait;
use log::debug;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::{Attribute, AttributeValue, Attributes, PutOptions, PutPayload};
use std::sync::Arc;

use super::{ObjectStore, PublishError, PutObject, S3Settings};

/// [`ObjectStore`] over any `object_store` backend.
pub struct RemoteStore {
    bucket: String,
    inner: Arc<dyn object_store::ObjectStore>,
}

impl RemoteStore {
    pub fn new(bucket: &str, inner: Arc<dyn object_store::ObjectStore>) -> Self {
        Self {
            bucket: bucket.to_string(),
            inner,
        }
    }

    pub fn s3(settings: &S3Settings) -> Result<Self, PublishError> {
        let client = AmazonS3Builder::new()
            .with_bucket_name(&settings.bucket)
            .with_region(&settings.region)
            .with_access_key_id(&settings.access_key_id)
            .with_secret_access_key(&settings.secret_access_key)
            .build()?;
        Ok(Self::new(&settings.bucket, Arc::new(client)))
    }
}

#[async_trait]
impl ObjectStore for RemoteStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put_object(&self, object: PutObject) -> Result<(), PublishError> {
        let mut attributes = Attributes::new();
        attributes.insert(
            Attribute::ContentType,
            AttributeValue::from(object.content_type),
        );
        for (key, value) in object.metadata {
            attributes.insert(Attribute::Metadata(key.into()), AttributeValue::from(value));
        }

        let path = ObjectPath::from(object.key.as_str());
        let options = PutOptions {
            attributes,
            ..PutOptions::default()
        };
        self.inner
            .put_opts(&path, PutPayload::from(object.body), options)
            .await?;
        debug!("Stored {} in {}", path, self.bucket);
        Ok(())
    }
}
