//! Configuration structures.
//!
//! Configuration is loaded from environment variables on top of defaults.
//! Unparsable values fall back to the default rather than failing startup.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Global server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP listener configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Response cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Upstream HTTP client configuration.
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Upstream base URLs.
    #[serde(default)]
    pub endpoints: Endpoints,

    /// Optional per-upstream API keys.
    #[serde(default)]
    pub api_keys: ApiKeys,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(port) = lookup("PORT").and_then(|v| v.trim().parse::<u16>().ok()) {
            config.server.port = port;
        }
        if let Some(host) = non_empty(lookup("HOST")) {
            config.server.host = host;
        }
        if let Some(ttl) = lookup("CACHE_TTL")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|ttl| *ttl > 0)
        {
            config.cache.default_ttl_secs = ttl;
        }
        if let Some(interval) = lookup("CACHE_SWEEP_INTERVAL")
            .and_then(|v| humantime::parse_duration(v.trim()).ok())
            .filter(|d| !d.is_zero())
        {
            config.cache.sweep_interval = interval;
        }

        config.api_keys.fda = non_empty(lookup("FDA_API_KEY"));
        config.api_keys.pubmed = non_empty(lookup("PUBMED_API_KEY"));
        config.api_keys.ncbi = non_empty(lookup("NCBI_API_KEY"));

        config
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind host.
    pub host: String,

    /// Bind port.
    pub port: u16,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

/// Response cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Store-wide default TTL in seconds (0 = never expires).
    pub default_ttl_secs: u64,

    /// How often the background sweep reclaims expired entries.
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: 86_400,
            sweep_interval: Duration::from_secs(600),
        }
    }
}

/// Upstream HTTP client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Per-request timeout.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Identifying User-Agent header.
    pub user_agent: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: concat!("healthcare-mcp/", env!("CARGO_PKG_VERSION"), " (Rust)").to_string(),
        }
    }
}

/// Upstream base URLs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoints {
    pub fda: String,
    pub eutils: String,
    pub medrxiv: String,
    pub health_finder: String,
    pub clinical_trials: String,
    pub icd10: String,
}

impl Endpoints {
    /// Point every upstream at one base URL (test servers).
    pub fn all_at(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            fda: format!("{base}/drug"),
            eutils: format!("{base}/eutils/"),
            medrxiv: format!("{base}/medrxiv/"),
            health_finder: format!("{base}/myhealthfinder"),
            clinical_trials: format!("{base}/studies"),
            icd10: format!("{base}/icd10cm/search"),
        }
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            fda: "https://api.fda.gov/drug".to_string(),
            eutils: "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/".to_string(),
            medrxiv: "https://api.medrxiv.org/".to_string(),
            health_finder: "https://odphp.health.gov/myhealthfinder/api/v4".to_string(),
            clinical_trials: "https://clinicaltrials.gov/api/v2/studies".to_string(),
            icd10: "https://clinicaltables.nlm.nih.gov/api/icd10cm/v3/search".to_string(),
        }
    }
}

/// Optional API keys. Absent keys omit the query parameter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiKeys {
    pub fda: Option<String>,
    pub pubmed: Option<String>,
    pub ncbi: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.cache.default_ttl_secs, 86_400);
        assert_eq!(config.cache.sweep_interval, Duration::from_secs(600));
        assert_eq!(config.upstream.timeout, Duration::from_secs(30));
        assert!(config.api_keys.fda.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("PORT", "8081"),
            ("CACHE_TTL", "120"),
            ("CACHE_SWEEP_INTERVAL", "30s"),
            ("FDA_API_KEY", "abc"),
            ("NCBI_API_KEY", ""),
        ]));
        assert_eq!(config.server.port, 8081);
        assert_eq!(config.cache.default_ttl_secs, 120);
        assert_eq!(config.cache.sweep_interval, Duration::from_secs(30));
        assert_eq!(config.api_keys.fda.as_deref(), Some("abc"));
        assert!(config.api_keys.ncbi.is_none());
    }

    #[test]
    fn test_unparsable_values_fall_back() {
        let config = Config::from_lookup(lookup_from(&[("PORT", "http"), ("CACHE_TTL", "soon")]));
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.cache.default_ttl_secs, 86_400);
    }

    #[test]
    fn test_endpoints_all_at() {
        let endpoints = Endpoints::all_at("http://127.0.0.1:9999/");
        assert_eq!(endpoints.fda, "http://127.0.0.1:9999/drug");
        assert_eq!(endpoints.eutils, "http://127.0.0.1:9999/eutils/");
    }
}
