use thiserror::Error;

/// Errors surfaced while setting up the proxy.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Listen on {0} failed with {1}")]
    Listen(String, std::io::Error),
    #[error("Invalid Spanner endpoint {0}: {1}")]
    InvalidSpannerEndpoint(String, tonic::transport::Error),
    #[error("Invalid database uri {0:?}: not usable as a metadata value")]
    InvalidDatabaseUri(String),
    #[error("Could not create initial adapter session: {0}")]
    CreateSession(tonic::Status),
}
