//! Application error types.
//!
//! All errors use `thiserror` for automatic Error trait derivation and provide
//! clear error messages with context. Tools never let these escape: every
//! variant is rendered into an error envelope at the tool boundary.

use thiserror::Error;

/// Application result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error enum for the healthcare tool server.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or malformed caller input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Unknown tool, route or resource.
    #[error("not found: {0}")]
    NotFound(String),

    /// Upstream answered with a non-2xx status.
    #[error("HTTP {status}: {reason}")]
    Upstream { status: u16, reason: String },

    /// DNS, connect, reset or timeout while talking to an upstream.
    #[error("{0}")]
    Network(String),

    /// Upstream body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// Local binary format could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// Internal errors.
    #[error("internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Convert to a JSON-RPC error code for the stdio transport.
    pub fn to_rpc_code(&self) -> i64 {
        match self {
            Error::Validation(_) => -32602,
            Error::NotFound(_) => -32601,
            Error::Serialization(_) => -32700,
            Error::Upstream { .. }
            | Error::Network(_)
            | Error::Decode(_)
            | Error::Parse(_)
            | Error::Internal(_)
            | Error::Io(_) => -32603,
        }
    }
}

// Convenience constructors
impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn upstream(status: u16, reason: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            reason: reason.into(),
        }
    }

    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Error::Decode(err.to_string())
        } else {
            Error::Network(err.to_string())
        }
    }
}
