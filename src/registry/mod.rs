//! Host-to-provider registry.
//!
//! Built once at startup from `[host,]origin` declarations and read-only
//! afterwards, so lookups need no locking.
//!
//! # Origins
//!
//! ```text
//! /srv/images                 → FilesystemProvider
//! https://cdn.example.com/img → OriginProvider  (through the origin cache)
//! :proxy:                     → ProxyProvider   (through the origin cache,
//!                                                signing with path required)
//! s3://bucket                 → S3Provider
//! gs://bucket                 → GcsProvider
//! ```

mod backend;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use crate::error::RegistryError;
use crate::provider::{
    create_s3_client, FilesystemProvider, GcsProvider, OriginProvider, Provider, ProxyProvider,
    S3Provider, S3Settings,
};
use crate::transport::{HttpTransport, OriginCache, Transport};

pub use backend::{parse_backend, OriginSpec, PROXY_ORIGIN};

/// Signing settings the registry needs to decide whether a proxy is allowed.
#[derive(Debug, Clone, Copy, Default)]
pub struct SigningPolicy<'a> {
    pub secret: Option<&'a str>,
    pub with_path: bool,
}

impl SigningPolicy<'_> {
    fn allows_proxy(&self) -> bool {
        self.secret.is_some_and(|s| !s.is_empty()) && self.with_path
    }
}

/// Immutable mapping from request host to provider.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    providers: HashMap<String, Arc<dyn Provider>>,
}

impl BackendRegistry {
    /// An empty registry; add providers with [`BackendRegistry::with_provider`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry from backend declarations.
    ///
    /// Every declaration must resolve to a distinct host. Remote origins get
    /// their own cache-wrapped transport; S3 backends share one client.
    pub async fn build(
        default_host: &str,
        declarations: &[String],
        origin_cache: &str,
        signing: SigningPolicy<'_>,
    ) -> Result<Self, RegistryError> {
        if declarations.is_empty() {
            return Err(RegistryError::NoBackends);
        }

        let cache = OriginCache::parse(origin_cache);
        let mut transport: Option<Arc<dyn Transport>> = None;
        let mut s3_client: Option<aws_sdk_s3::Client> = None;
        let mut registry = Self::new();

        for declaration in declarations {
            let (host, origin) = parse_backend(default_host, declaration)?;
            if registry.providers.contains_key(&host) {
                return Err(RegistryError::DuplicateHost(host));
            }

            let provider: Arc<dyn Provider> = match OriginSpec::parse(&origin)? {
                OriginSpec::Filesystem(root) => Arc::new(FilesystemProvider::new(root)),
                OriginSpec::Proxy => {
                    if !signing.allows_proxy() {
                        return Err(RegistryError::ProxyRequiresSigning);
                    }
                    let inner = shared_transport(&mut transport, &origin)?;
                    Arc::new(ProxyProvider::new(cache.wrap(inner)))
                }
                OriginSpec::Http(base) => {
                    let inner = shared_transport(&mut transport, &origin)?;
                    Arc::new(OriginProvider::new(base, cache.wrap(inner)))
                }
                OriginSpec::S3 { bucket } => {
                    let client = match &s3_client {
                        Some(client) => client.clone(),
                        None => {
                            let client = create_s3_client(&S3Settings::from_env()).await;
                            s3_client = Some(client.clone());
                            client
                        }
                    };
                    Arc::new(S3Provider::new(client, bucket))
                }
                OriginSpec::Gcs { bucket } => {
                    let provider =
                        GcsProvider::from_env(&bucket).map_err(|e| RegistryError::Provider {
                            origin: origin.clone(),
                            reason: e.to_string(),
                        })?;
                    Arc::new(provider)
                }
            };

            info!(host = %host, kind = %provider.kind(), origin = %origin, "Registered backend");
            registry = registry.with_provider(host, provider);
        }

        Ok(registry)
    }

    /// Attach `provider` to `host`, replacing any previous one.
    pub fn with_provider(mut self, host: impl Into<String>, provider: Arc<dyn Provider>) -> Self {
        self.providers.insert(host.into(), provider);
        self
    }

    /// Look up the provider for a request host.
    pub fn get(&self, host: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(host).cloned()
    }

    /// Registered hosts, sorted.
    pub fn hosts(&self) -> Vec<&str> {
        let mut hosts: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        hosts.sort_unstable();
        hosts
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

/// The raw network transport, created on first use and shared by every
/// remote provider before cache wrapping.
fn shared_transport(
    slot: &mut Option<Arc<dyn Transport>>,
    origin: &str,
) -> Result<Arc<dyn Transport>, RegistryError> {
    if let Some(transport) = slot {
        return Ok(Arc::clone(transport));
    }
    let transport: Arc<dyn Transport> =
        Arc::new(HttpTransport::new().map_err(|e| RegistryError::Provider {
            origin: origin.to_string(),
            reason: e.to_string(),
        })?);
    *slot = Some(Arc::clone(&transport));
    Ok(transport)
}
