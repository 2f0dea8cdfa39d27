//! medRxiv preprint search.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{
    clean_text, invalid, str_at, value_or, Args, ParamDef, Tool, ToolArgs, ToolContext, ToolSpec,
    TTL_12_HOURS,
};
use crate::cache::CacheKey;
use crate::envelope::Envelope;
use crate::types::{Error, Result};
use crate::upstream::join_path;

const NAME: &str = "medrxiv_search";
const DEFAULT_MAX: u32 = 10;
const MAX_RESULTS: u32 = 100;

#[derive(Debug)]
pub struct MedrxivSearch {
    ctx: ToolContext,
    spec: ToolSpec,
}

impl MedrxivSearch {
    pub fn new(ctx: ToolContext) -> Self {
        let spec = ToolSpec::new(NAME, "Search for pre-print articles on medRxiv")
            .param(ParamDef::string("query", "Search query for medRxiv articles").required())
            .param(
                ParamDef::number("max_results", "Maximum number of results to return")
                    .default_value(DEFAULT_MAX)
                    .range(1, MAX_RESULTS),
            );
        Self { ctx, spec }
    }

    pub async fn search(&self, query: &str, max_results: u32) -> Arc<Envelope> {
        let key = CacheKey::derive("medrxiv_search", &[&query, &max_results]);
        self.ctx
            .cached(NAME, key, TTL_12_HOURS, "Error searching medRxiv", || {
                self.fetch(query, max_results)
            })
            .await
    }

    async fn fetch(&self, query: &str, max_results: u32) -> Result<Envelope> {
        tracing::info!(query, max_results, "medrxiv_search");
        // Last 180 days of medRxiv postings.
        let url = join_path(
            &self.ctx.endpoints.medrxiv,
            &["details", "medrxiv", query, "0", "180", "json"],
        )?;
        let data = self.ctx.fetch_json(&url).await?;
        let collection = data
            .get("collection")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::decode("response has no collection"))?;

        let articles: Vec<Value> = collection
            .iter()
            .take(max_results as usize)
            .map(|article| {
                let doi = str_at(article, "/rel_doi");
                let abstract_url = format!("https://www.medrxiv.org/content/{doi}");
                json!({
                    "title": clean_text(&str_at(article, "/rel_title")),
                    "authors": value_or(article, "/rel_authors", json!("")),
                    "doi": doi,
                    "abstract_url": abstract_url,
                    "publication_date": str_at(article, "/rel_date"),
                })
            })
            .collect();

        Envelope::success(json!({
            "query": query,
            "total_results": collection.len(),
            "articles": articles,
        }))
    }
}

#[async_trait]
impl Tool for MedrxivSearch {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn call(&self, args: &ToolArgs) -> Arc<Envelope> {
        let args = Args::new(args);
        let Some(query) = args.text("query") else {
            return invalid("Search query is required");
        };
        let max_results = args.count("max_results", DEFAULT_MAX, MAX_RESULTS);
        self.search(&query, max_results).await
    }
}
