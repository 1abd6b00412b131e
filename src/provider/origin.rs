use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use super::fetch::fetch_url;
use super::{Provider, ProviderKind};
use crate::error::ProviderError;
use crate::io::ByteStream;
use crate::transport::Transport;

/// Fetches files relative to a single base URL.
///
/// Relative filenames are appended to the base path and filenames starting
/// with `/` replace it, but the scheme and authority always stay those of the
/// base: names carrying their own scheme or authority are rejected.
pub struct OriginProvider {
    base: Url,
    transport: Arc<dyn Transport>,
}

impl OriginProvider {
    pub fn new(mut base: Url, transport: Arc<dyn Transport>) -> Self {
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Self { base, transport }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Resolve `filename` against the base URL.
    pub fn resolve(&self, filename: &str) -> Result<Url, ProviderError> {
        let bad = || ProviderError::BadFilename(filename.to_string());

        // A colon in the first segment is either a scheme or an invalid
        // relative reference.
        let first_segment = filename.split(['/', '?', '#']).next().unwrap_or("");
        if first_segment.contains(':') {
            return Err(bad());
        }

        let mut leading = filename.chars().take(2);
        let is_separator = |c: Option<char>| matches!(c, Some('/') | Some('\\'));
        if is_separator(leading.next()) && is_separator(leading.next()) {
            return Err(bad());
        }

        let url = self.base.join(filename).map_err(|_| bad())?;
        if url.origin() != self.base.origin() {
            return Err(bad());
        }
        Ok(url)
    }
}

#[async_trait]
impl Provider for OriginProvider {
    async fn provide(&self, filename: &str) -> Result<ByteStream, ProviderError> {
        let url = self.resolve(filename)?;
        fetch_url(self.transport.as_ref(), &url).await
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Origin
    }
}
