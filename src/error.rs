use thiserror::Error;

/// Errors a byte-source provider can return for a single request.
///
/// Each variant maps to exactly one HTTP status in the server layer.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// The requested object does not exist (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// The filename could not be interpreted for this provider (400)
    #[error("Bad filename: {0}")]
    BadFilename(String),

    /// The upstream answered with an unexpected status (502)
    #[error("Bad gateway: upstream returned {status} for {url}")]
    BadGateway { status: u16, url: String },

    /// Any other failure (500)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors from the outbound HTTP transport and its response cache.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The request could not be sent or the connection failed
    #[error("Request failed: {0}")]
    Request(String),

    /// The response body could not be read
    #[error("Body read failed: {0}")]
    Body(String),
}

/// Startup errors raised while building the backend registry.
///
/// These are fatal: the process refuses to serve a partial registry.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// No backend declarations were supplied
    #[error("No backend configured")]
    NoBackends,

    /// A declaration did not have the `[host,]origin` shape
    #[error("Invalid backend declaration {0:?}: expected <origin> or <host>,<origin>")]
    InvalidDeclaration(String),

    /// Two declarations resolved to the same host
    #[error("Host {0} already has a provider attached to it")]
    DuplicateHost(String),

    /// A remote origin used a scheme without a provider
    #[error("Unsupported origin scheme {scheme:?} in {origin}")]
    UnsupportedScheme { scheme: String, origin: String },

    /// A remote origin could not be parsed as a URL
    #[error("Invalid origin {origin}: {reason}")]
    InvalidOrigin { origin: String, reason: String },

    /// The proxy provider was requested without signing bound to the path
    #[error("The proxy backend requires a signing secret and signing with path enabled")]
    ProxyRequiresSigning,

    /// A provider client could not be constructed
    #[error("Failed to create provider for {origin}: {reason}")]
    Provider { origin: String, reason: String },
}

/// Errors raised while decoding, transforming or encoding an image.
#[derive(Debug, Clone, Error)]
pub enum ImageError {
    /// The source bytes could not be decoded
    #[error("Failed to decode image: {0}")]
    Decode(String),

    /// A transform step failed
    #[error("Failed to transform image: {0}")]
    Transform(String),

    /// The output could not be encoded
    #[error("Failed to encode image: {0}")]
    Encode(String),

    /// The request was abandoned before processing finished
    #[error("Image processing cancelled")]
    Cancelled,
}
