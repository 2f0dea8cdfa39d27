//! URL construction helpers.

use url::Url;

use crate::types::{Error, Result};

/// Ordered query parameters. Empty values are never added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `name=value` unless the stringified value is empty.
    pub fn push(mut self, name: &str, value: impl ToString) -> Self {
        let value = value.to_string();
        if !value.is_empty() {
            self.0.push((name.to_string(), value));
        }
        self
    }

    /// Append only when present (and non-empty).
    pub fn push_opt<T: ToString>(self, name: &str, value: Option<T>) -> Self {
        match value {
            Some(value) => self.push(name, value),
            None => self,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Append `params` to `base` in insertion order, form-encoded.
pub fn build_url(base: &str, params: &QueryParams) -> Result<String> {
    let mut url = parse(base)?;
    if !params.is_empty() {
        url.query_pairs_mut().extend_pairs(params.iter());
    }
    Ok(url.into())
}

/// Append percent-encoded path segments to `base`.
pub fn join_path(base: &str, segments: &[&str]) -> Result<String> {
    let mut url = parse(base)?;
    url.path_segments_mut()
        .map_err(|_| Error::internal(format!("cannot append path to {base}")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url.into())
}

fn parse(base: &str) -> Result<Url> {
    Url::parse(base).map_err(|e| Error::internal(format!("invalid upstream URL {base}: {e}")))
}
