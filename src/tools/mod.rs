//! Healthcare tools.
//!
//! Every network-backed tool runs the same sequence: validate required input,
//! normalise optional input, derive a cache key, serve a hit unchanged, or
//! fetch once, transform, wrap, store and return. Failures past validation
//! become error envelopes and are never cached.

pub mod args;
mod bookshelf;
mod calculator;
mod catalog;
mod eutils;
pub mod dicom;
mod fda;
mod health_topics;
mod medrxiv;
mod pubmed;
mod terminology;
mod trials;
mod usage_stats;

pub use args::{Args, ToolArgs};
pub use bookshelf::NcbiBookshelfSearch;
pub use calculator::BmiCalculator;
pub use catalog::{ParamDef, ParamType, ToolSpec};
pub use dicom::DicomMetadata;
pub use fda::FdaDrugLookup;
pub use health_topics::HealthTopics;
pub use medrxiv::MedrxivSearch;
pub use pubmed::{PubmedQuery, PubmedSearch};
pub use terminology::IcdCodeLookup;
pub use trials::ClinicalTrialsSearch;
pub use usage_stats::{AllUsageStats, SessionUsageStats};

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheKey, EnvelopeCache};
use crate::envelope::Envelope;
use crate::types::{ApiKeys, Config, Endpoints, Result};
use crate::upstream::{RequestOptions, Upstream};

/// Literature and preprint searches.
pub const TTL_12_HOURS: Duration = Duration::from_secs(43_200);

/// Drug, trial, topic, terminology and document searches.
pub const TTL_24_HOURS: Duration = Duration::from_secs(86_400);

/// One named capability with a declared argument schema.
#[async_trait]
pub trait Tool: Send + Sync {
    fn spec(&self) -> &ToolSpec;

    /// Run the tool. Never fails: every problem is reported inside the
    /// returned envelope.
    async fn call(&self, args: &ToolArgs) -> Arc<Envelope>;
}

/// Shared collaborators handed to every tool at construction.
#[derive(Clone)]
pub struct ToolContext {
    pub cache: Arc<EnvelopeCache>,
    pub upstream: Arc<dyn Upstream>,
    pub endpoints: Endpoints,
    pub api_keys: ApiKeys,
}

impl fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolContext")
            .field("cache_keys", &self.cache.len())
            .field("endpoints", &self.endpoints)
            .finish_non_exhaustive()
    }
}

impl ToolContext {
    pub fn new(cache: Arc<EnvelopeCache>, upstream: Arc<dyn Upstream>, config: &Config) -> Self {
        Self {
            cache,
            upstream,
            endpoints: config.endpoints.clone(),
            api_keys: config.api_keys.clone(),
        }
    }

    /// One GET, decoded as JSON.
    pub async fn fetch_json(&self, url: &str) -> Result<Value> {
        self.upstream
            .request(url, RequestOptions::default())
            .await?
            .into_json()
    }

    /// Serve `key` from the cache, or run `fetch` and store its success
    /// envelope for `ttl`. Errors become `"{error_prefix}: {err}"` envelopes.
    pub async fn cached<F, Fut>(
        &self,
        tool: &'static str,
        key: CacheKey,
        ttl: Duration,
        error_prefix: &str,
        fetch: F,
    ) -> Arc<Envelope>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Envelope>>,
    {
        if let Some(hit) = self.cache.get(&key) {
            tracing::debug!(tool, "cache_hit");
            return hit;
        }
        tracing::debug!(tool, "cache_miss");

        match fetch().await {
            Ok(envelope) => self.cache.set(key, envelope, Some(ttl)),
            Err(err) => {
                tracing::warn!(tool, error = %err, "tool_call_failed");
                Arc::new(Envelope::error(format!("{error_prefix}: {err}")))
            }
        }
    }
}

/// Shortcut for validation failures.
pub(crate) fn invalid(message: &str) -> Arc<Envelope> {
    Arc::new(Envelope::error(message))
}

// =============================================================================
// Upstream JSON helpers
// =============================================================================

/// String at `pointer`, or `""` when absent, empty or not a string.
pub(crate) fn str_at(value: &Value, pointer: &str) -> String {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Array at `pointer`, or an empty slice.
pub(crate) fn array_at<'a>(value: &'a Value, pointer: &str) -> &'a [Value] {
    value
        .pointer(pointer)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// The value at `pointer` when truthy, or `fallback`.
pub(crate) fn value_or(value: &Value, pointer: &str, fallback: Value) -> Value {
    match value.pointer(pointer) {
        None | Some(Value::Null) => fallback,
        Some(Value::String(s)) if s.is_empty() => fallback,
        Some(found) => found.clone(),
    }
}

/// Sanitised free text; empty stays empty.
pub(crate) fn clean_text(text: &str) -> String {
    if text.is_empty() {
        String::new()
    } else {
        crate::sanitize::sanitize_one(text)
    }
}

/// Integer count from a number or numeric string (E-utilities sends strings).
pub(crate) fn count_at(value: &Value, pointer: &str) -> u64 {
    match value.pointer(pointer) {
        Some(Value::Number(n)) => n.as_u64().unwrap_or_default(),
        Some(Value::String(s)) => s.trim().parse().unwrap_or_default(),
        _ => 0,
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::upstream::{MockUpstream, Payload};

    /// Context over a mock upstream with the public endpoints and no keys.
    pub fn context(upstream: MockUpstream) -> ToolContext {
        context_with(upstream, &Config::default())
    }

    pub fn context_with(upstream: MockUpstream, config: &Config) -> ToolContext {
        ToolContext::new(
            Arc::new(EnvelopeCache::new(config.cache.default_ttl_secs)),
            Arc::new(upstream),
            config,
        )
    }

    pub fn json_reply(body: Value) -> crate::types::Result<Payload> {
        Ok(Payload::Json(body))
    }

    pub fn args(value: Value) -> ToolArgs {
        match value {
            Value::Object(map) => map,
            _ => ToolArgs::new(),
        }
    }
}
