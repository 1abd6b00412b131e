use http::{HeaderMap, StatusCode};
use tracing::debug;
use url::Url;

use crate::error::ProviderError;
use crate::io::ByteStream;
use crate::transport::Transport;

/// Fetch `url` and classify the upstream answer.
///
/// 404 is `NotFound`, any other non-200 is `BadGateway` and a transport
/// failure is `Internal`.
pub(super) async fn fetch_url(
    transport: &dyn Transport,
    url: &Url,
) -> Result<ByteStream, ProviderError> {
    debug!(url = %url, "Fetching from upstream");

    let response = transport
        .get(url, HeaderMap::new())
        .await
        .map_err(|e| ProviderError::Internal(format!("cannot get file from provider: {}", e)))?;

    match response.status {
        StatusCode::OK => Ok(response.body),
        StatusCode::NOT_FOUND => Err(ProviderError::NotFound(url.to_string())),
        status => Err(ProviderError::BadGateway {
            status: status.as_u16(),
            url: url.to_string(),
        }),
    }
}
