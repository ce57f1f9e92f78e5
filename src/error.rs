//! Error types for the fakebro crate.

use std::io;
use std::time::Duration;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while rolling identities or making requests through them.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No baseline headers are registered for the generated client.
    #[error("no header set fulfills client {client:?}")]
    UnfulfilledHeaderCondition { client: Option<String> },

    /// No ClientHello spec is registered for the generated client/version.
    #[error("no TLS fingerprint fulfills client {client:?} version {version:?}")]
    UnfulfilledTlsCondition {
        client: Option<String>,
        version: Option<String>,
    },

    /// The server negotiated an application protocol with no dispatch path.
    #[error("unsupported ALPN: {0:?}")]
    UnsupportedProtocol(String),

    /// The pool was closed.
    #[error("agent pool is closed")]
    PoolClosed,

    /// No agent became available in time.
    #[error("pool acquire timeout after {0:?} - no agents available")]
    PoolAcquireTimeout(Duration),

    /// The agent was stopped and can no longer dial.
    #[error("agent has been stopped")]
    AgentStopped,

    /// HTTP protocol error.
    #[error("HTTP protocol error: {0}")]
    HttpProtocol(String),

    /// Request could not be expressed on the wire.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid builder or catalog configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Decompression error.
    #[error("Decompression error: {0}")]
    Decompression(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Connect timeout (TCP dial or TLS handshake).
    #[error("Connect timeout after {0:?}")]
    ConnectTimeout(Duration),

    /// Total request deadline exceeded.
    #[error("Total request deadline exceeded after {0:?}")]
    TotalTimeout(Duration),

    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// TLS/SSL error.
    #[error("TLS error: {0}")]
    Tls(String),
}

impl Error {
    /// Create an HTTP protocol error.
    pub fn http_protocol(message: impl Into<String>) -> Self {
        Self::HttpProtocol(message.into())
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a TLS error.
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls(message.into())
    }

    /// Whether the generated identity had no catalog entry.
    pub fn is_catalog_miss(&self) -> bool {
        matches!(
            self,
            Self::UnfulfilledHeaderCondition { .. } | Self::UnfulfilledTlsCondition { .. }
        )
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ConnectTimeout(_)
                | Self::TotalTimeout(_)
                | Self::PoolAcquireTimeout(_)
        )
    }

    /// Whether the error points at the agent's TLS identity rather than the
    /// network: a failed or stalled handshake.
    pub fn is_handshake_failure(&self) -> bool {
        matches!(self, Self::Tls(_) | Self::ConnectTimeout(_))
    }
}
