//! Upstream request helper.
//!
//! Tools talk to external APIs only through the [`Upstream`] trait so that the
//! network can be replaced in tests. [`HttpUpstream`] is the reqwest-backed
//! implementation used in production.

mod http;
mod url;

pub use self::http::HttpUpstream;
pub use self::url::{build_url, join_path, QueryParams};

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::types::{Error, Result};

/// HTTP method for an upstream request.
pub use reqwest::Method;

/// Per-request overrides. Every field left unset keeps the client default;
/// headers are merged by name rather than replacing the default set.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: Option<Method>,
    pub headers: Vec<(String, String)>,
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Body of a JSON-family content type.
    Json(Value),
    /// Any other content type, undecoded.
    Text(String),
}

impl Payload {
    /// Structured view of the body. Text bodies are parsed as a fallback for
    /// upstreams that mislabel their content type.
    pub fn into_json(self) -> Result<Value> {
        match self {
            Payload::Json(value) => Ok(value),
            Payload::Text(text) => serde_json::from_str(&text)
                .map_err(|e| Error::decode(format!("expected JSON response: {e}"))),
        }
    }
}

/// Single-attempt request seam used by every network-backed tool.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Perform one request. Non-2xx statuses fail with [`Error::Upstream`];
    /// transport failures fail with [`Error::Network`]. Never retries.
    async fn request(&self, url: &str, options: RequestOptions) -> Result<Payload>;
}
