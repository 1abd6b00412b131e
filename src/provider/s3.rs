use async_trait::async_trait;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::Client;
use tracing::debug;

use super::{Provider, ProviderKind};
use crate::error::ProviderError;
use crate::io::{from_bytes, ByteStream};

/// Default AWS region when none is configured.
pub const DEFAULT_S3_REGION: &str = "us-east-1";

/// S3 connection settings, read from the environment.
///
/// - `S3_ENDPOINT`: custom endpoint for S3-compatible services (MinIO, etc.)
/// - `S3_ACCESS_KEY_ID` / `S3_ACCESS_KEY_SECRET`: static credentials; when
///   either is missing the default AWS credential chain is used
/// - `S3_DONT_USE_SSL=TRUE`: talk plain HTTP to a scheme-less endpoint
/// - `AWS_REGION`: region (default `us-east-1`)
#[derive(Debug, Clone, Default)]
pub struct S3Settings {
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub use_ssl: bool,
    pub region: Option<String>,
}

impl S3Settings {
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            endpoint: var("S3_ENDPOINT"),
            access_key_id: var("S3_ACCESS_KEY_ID"),
            secret_access_key: var("S3_ACCESS_KEY_SECRET"),
            use_ssl: var("S3_DONT_USE_SSL").as_deref() != Some("TRUE"),
            region: var("AWS_REGION"),
        }
    }

    /// The endpoint URL to hand to the SDK, with a scheme.
    pub fn endpoint_url(&self) -> Option<String> {
        let endpoint = self.endpoint.as_deref()?;
        if endpoint.contains("://") {
            return Some(endpoint.to_string());
        }
        let scheme = if self.use_ssl { "https" } else { "http" };
        Some(format!("{}://{}", scheme, endpoint))
    }
}

/// Create an S3 client from the given settings.
///
/// Custom endpoints use path-style addressing, which most S3-compatible
/// services require.
pub async fn create_s3_client(settings: &S3Settings) -> Client {
    let region = settings
        .region
        .clone()
        .unwrap_or_else(|| DEFAULT_S3_REGION.to_string());
    let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(region))
        .load()
        .await;

    let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);

    if let Some(endpoint) = settings.endpoint_url() {
        builder = builder.endpoint_url(endpoint).force_path_style(true);
    }

    if let (Some(key), Some(secret)) = (&settings.access_key_id, &settings.secret_access_key) {
        builder = builder.credentials_provider(Credentials::new(
            key.clone(),
            secret.clone(),
            None,
            None,
            "ims-environment",
        ));
    }

    Client::from_conf(builder.build())
}

/// Serves objects from a single S3 bucket.
#[derive(Clone)]
pub struct S3Provider {
    client: Client,
    bucket: String,
}

impl S3Provider {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl Provider for S3Provider {
    async fn provide(&self, filename: &str) -> Result<ByteStream, ProviderError> {
        let key = filename.trim_start_matches('/');
        let location = format!("s3://{}/{}", self.bucket, key);
        debug!(location = %location, "Fetching object");

        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let is_not_found = e
                    .as_service_error()
                    .map(|se| se.is_no_such_key())
                    .unwrap_or(false);

                // Some S3-compatible services answer a bare 404
                let status_is_404 = e
                    .raw_response()
                    .map(|r| r.status().as_u16() == 404)
                    .unwrap_or(false);

                if is_not_found || status_is_404 {
                    ProviderError::NotFound(location.clone())
                } else {
                    ProviderError::Internal(format!(
                        "cannot get {}: {}",
                        location,
                        DisplayErrorContext(&e)
                    ))
                }
            })?;

        let data = resp
            .body
            .collect()
            .await
            .map_err(|e| ProviderError::Internal(format!("cannot read {}: {}", location, e)))?
            .into_bytes();

        Ok(from_bytes(data))
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::S3
    }
}
