use std::sync::Arc;

use async_trait::async_trait;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::path::Path;
use object_store::ObjectStore;
use tracing::debug;

use super::{Provider, ProviderKind};
use crate::error::ProviderError;
use crate::io::{from_bytes, ByteStream};

/// Serves objects from a Google Cloud Storage bucket.
///
/// Credentials come from the standard `GOOGLE_*` environment variables.
pub struct GcsProvider {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl GcsProvider {
    /// Connect to `bucket` using credentials from the environment.
    pub fn from_env(bucket: &str) -> Result<Self, object_store::Error> {
        let store = GoogleCloudStorageBuilder::from_env()
            .with_bucket_name(bucket)
            .build()?;
        Ok(Self::with_store(bucket, Arc::new(store)))
    }

    /// Serve from an already configured store.
    pub fn with_store(bucket: impl Into<String>, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl Provider for GcsProvider {
    async fn provide(&self, filename: &str) -> Result<ByteStream, ProviderError> {
        let key = filename.trim_start_matches('/');
        let location = format!("gs://{}/{}", self.bucket, key);
        let path = Path::parse(key)
            .map_err(|e| ProviderError::BadFilename(format!("{}: {}", filename, e)))?;
        debug!(location = %location, "Fetching object");

        let result = self.store.get(&path).await.map_err(|e| match e {
            object_store::Error::NotFound { .. } => ProviderError::NotFound(location.clone()),
            other => ProviderError::Internal(format!("cannot get {}: {}", location, other)),
        })?;

        let data = result
            .bytes()
            .await
            .map_err(|e| ProviderError::Internal(format!("cannot read {}: {}", location, e)))?;

        Ok(from_bytes(data))
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Gcs
    }
}
