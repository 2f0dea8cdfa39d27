//! Tracing initialisation.
//!
//! Everything goes to stderr without ANSI colours: stdout carries the stdio
//! protocol and stderr is usually captured by the MCP host.

use std::str::FromStr;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Filter used when `RUST_LOG` is unset. Keeps the HTTP client stack quiet.
pub const DEFAULT_FILTER: &str = "info,hyper=warn,hyper_util=warn,reqwest=warn";

/// Environment variable selecting the [`LogFormat`].
pub const LOG_FORMAT_ENV: &str = "HEALTHCARE_MCP_LOG_FORMAT";

static TRACING_INIT: OnceLock<()> = OnceLock::new();

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "compact" | "text" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

impl LogFormat {
    /// Read [`LOG_FORMAT_ENV`]; unset or unknown values fall back to compact.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        lookup(LOG_FORMAT_ENV)
            .and_then(|value| value.parse().ok())
            .unwrap_or_default()
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Initialize the tracing subscriber once for the process.
pub fn init_tracing() {
    TRACING_INIT.get_or_init(|| {
        let format = LogFormat::from_env();
        let base = fmt::layer().with_writer(std::io::stderr).with_ansi(false);
        let registry = tracing_subscriber::registry().with(env_filter());

        let result = match format {
            LogFormat::Compact => registry.with(base.compact()).try_init(),
            LogFormat::Pretty => registry.with(base.pretty()).try_init(),
            LogFormat::Json => registry
                .with(base.json().with_current_span(false))
                .try_init(),
        };

        match result {
            Ok(()) => tracing::debug!(?format, "tracing_initialised"),
            Err(err) => eprintln!("tracing init skipped: {err}"),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!("json".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!(" JSON ".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("pretty".parse::<LogFormat>(), Ok(LogFormat::Pretty));
        assert_eq!("text".parse::<LogFormat>(), Ok(LogFormat::Compact));
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_log_format_from_lookup() {
        assert_eq!(LogFormat::from_lookup(lookup(&[])), LogFormat::Compact);
        assert_eq!(
            LogFormat::from_lookup(lookup(&[(LOG_FORMAT_ENV, "json")])),
            LogFormat::Json
        );
        assert_eq!(
            LogFormat::from_lookup(lookup(&[(LOG_FORMAT_ENV, "bogus")])),
            LogFormat::Compact
        );
    }

    #[test]
    fn test_default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }

    #[test]
    fn init_tracing_is_idempotent() {
        init_tracing();
        init_tracing();
    }
}
