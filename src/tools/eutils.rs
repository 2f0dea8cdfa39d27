//! NCBI E-utilities: `esearch` for ids, then `esummary` for records.

use serde_json::Value;

use super::{array_at, count_at, ToolContext};
use crate::types::Result;
use crate::upstream::{build_url, QueryParams};

/// Ids on the first page plus the total hit count.
#[derive(Debug, Default)]
pub(crate) struct SearchPage {
    pub ids: Vec<String>,
    pub total: u64,
}

pub(crate) async fn esearch(
    ctx: &ToolContext,
    db: &str,
    term: &str,
    retmax: u32,
    api_key: Option<&str>,
) -> Result<SearchPage> {
    let params = QueryParams::new()
        .push("db", db)
        .push("term", term)
        .push("retmax", retmax)
        .push("format", "json")
        .push_opt("api_key", api_key);
    let url = build_url(&format!("{}esearch.fcgi", ctx.endpoints.eutils), &params)?;
    let data = ctx.fetch_json(&url).await?;

    let ids = array_at(&data, "/esearchresult/idlist")
        .iter()
        .filter_map(|id| match id {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .collect();
    Ok(SearchPage {
        ids,
        total: count_at(&data, "/esearchresult/count"),
    })
}

/// The `result` object of an esummary call, keyed by id.
pub(crate) async fn esummary(
    ctx: &ToolContext,
    db: &str,
    ids: &[String],
    api_key: Option<&str>,
) -> Result<Value> {
    let params = QueryParams::new()
        .push("db", db)
        .push("id", ids.join(","))
        .push("retmode", "json")
        .push_opt("api_key", api_key);
    let url = build_url(&format!("{}esummary.fcgi", ctx.endpoints.eutils), &params)?;
    let mut data = ctx.fetch_json(&url).await?;
    Ok(data.get_mut("result").map(Value::take).unwrap_or(Value::Null))
}

/// `authors[].name`, skipping unnamed entries.
pub(crate) fn author_names(record: &Value) -> Vec<String> {
    array_at(record, "/authors")
        .iter()
        .filter_map(|a| a.get("name").and_then(Value::as_str))
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
