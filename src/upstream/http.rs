//! reqwest-backed [`Upstream`].

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT};
use reqwest::Method;
use std::time::Duration;

use super::{Payload, RequestOptions, Upstream};
use crate::types::{Error, Result, UpstreamConfig};

/// Shared HTTP client with fixed identifying headers and timeout.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
    user_agent: String,
    timeout: Duration,
}

impl HttpUpstream {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            user_agent: config.user_agent.clone(),
            timeout: config.timeout,
        })
    }

    fn headers(&self, overrides: &[(String, String)]) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, header_value(&self.user_agent)?);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        for (name, value) in overrides {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::validation(format!("invalid header name {name:?}: {e}")))?;
            headers.insert(name, header_value(value)?);
        }
        Ok(headers)
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn request(&self, url: &str, options: RequestOptions) -> Result<Payload> {
        let method = options.method.unwrap_or(Method::GET);
        let timeout = options.timeout.unwrap_or(self.timeout);
        let headers = self.headers(&options.headers)?;

        tracing::debug!(%method, url, "upstream_request");
        let response = self
            .client
            .request(method, url)
            .headers(headers)
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), url, "upstream_error_status");
            tracing::debug!(body = %body, "upstream_error_body");
            return Err(Error::upstream(
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown Status"),
            ));
        }

        let json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(is_json_content_type);

        let text = response.text().await?;
        if json {
            let value = serde_json::from_str(&text)
                .map_err(|e| Error::decode(format!("invalid JSON from upstream: {e}")))?;
            Ok(Payload::Json(value))
        } else {
            Ok(Payload::Text(text))
        }
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| Error::validation(format!("invalid header value {value:?}: {e}")))
}

/// `application/json`, `application/problem+json`, `text/json; charset=...`.
fn is_json_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence.ends_with("/json") || essence.ends_with("+json")
}
