use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use super::fetch::fetch_url;
use super::{Provider, ProviderKind};
use crate::error::ProviderError;
use crate::io::ByteStream;
use crate::transport::Transport;

/// Fetches whatever absolute `http(s)` URL the request names.
///
/// The destination is chosen by the caller, so the registry only builds this
/// provider when every request must carry a path-bound signature.
pub struct ProxyProvider {
    transport: Arc<dyn Transport>,
}

impl ProxyProvider {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Parse the requested upstream URL.
    pub fn resolve(&self, filename: &str) -> Result<Url, ProviderError> {
        let url = Url::parse(filename)
            .map_err(|e| ProviderError::BadFilename(format!("{}: {}", filename, e)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(ProviderError::BadFilename(format!(
                "{}: unsupported scheme {}",
                filename, scheme
            ))),
        }
    }
}

#[async_trait]
impl Provider for ProxyProvider {
    async fn provide(&self, filename: &str) -> Result<ByteStream, ProviderError> {
        let url = self.resolve(filename)?;
        fetch_url(self.transport.as_ref(), &url).await
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Proxy
    }
}
