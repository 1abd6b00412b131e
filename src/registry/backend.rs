use std::path::PathBuf;

use url::Url;

use crate::error::RegistryError;

/// Sentinel origin selecting the transparent proxy provider.
pub const PROXY_ORIGIN: &str = ":proxy:";

/// Separator between host and origin in a declaration.
const FIELD_SEPARATOR: char = ',';

/// Split a backend declaration into `(host, origin)`.
///
/// `origin` alone binds to `default_host`; `host,origin` binds to `host`.
/// Empty fields and any other field count are rejected.
pub fn parse_backend(
    default_host: &str,
    declaration: &str,
) -> Result<(String, String), RegistryError> {
    let invalid = || RegistryError::InvalidDeclaration(declaration.to_string());

    let fields: Vec<&str> = declaration.split(FIELD_SEPARATOR).collect();
    if fields.iter().any(|field| field.trim().is_empty()) {
        return Err(invalid());
    }

    match fields.as_slice() {
        [origin] => Ok((default_host.to_string(), origin.to_string())),
        [host, origin] => Ok((host.to_string(), origin.to_string())),
        _ => Err(invalid()),
    }
}

/// What an origin string asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginSpec {
    /// A local directory
    Filesystem(PathBuf),

    /// The transparent proxy
    Proxy,

    /// An `http`/`https` base URL
    Http(Url),

    /// An S3 bucket (`s3://bucket`)
    S3 { bucket: String },

    /// A GCS bucket (`gs://bucket`)
    Gcs { bucket: String },
}

impl OriginSpec {
    /// Classify an origin string.
    pub fn parse(origin: &str) -> Result<Self, RegistryError> {
        if origin == PROXY_ORIGIN {
            return Ok(OriginSpec::Proxy);
        }
        if !origin.contains("://") {
            return Ok(OriginSpec::Filesystem(PathBuf::from(origin)));
        }

        let url = Url::parse(origin).map_err(|e| RegistryError::InvalidOrigin {
            origin: origin.to_string(),
            reason: e.to_string(),
        })?;

        let bucket = || {
            url.host_str()
                .filter(|host| !host.is_empty())
                .map(str::to_string)
                .ok_or_else(|| RegistryError::InvalidOrigin {
                    origin: origin.to_string(),
                    reason: "missing bucket name".to_string(),
                })
        };

        match url.scheme() {
            "http" | "https" => Ok(OriginSpec::Http(url)),
            "s3" => Ok(OriginSpec::S3 { bucket: bucket()? }),
            "gs" => Ok(OriginSpec::Gcs { bucket: bucket()? }),
            scheme => Err(RegistryError::UnsupportedScheme {
                scheme: scheme.to_string(),
                origin: origin.to_string(),
            }),
        }
    }
}
