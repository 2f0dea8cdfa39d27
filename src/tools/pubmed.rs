//! PubMed literature search.

use async_trait::async_trait;
use chrono::Datelike;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use super::args::leading_integer;
use super::eutils::{author_names, esearch, esummary};
use super::{
    array_at, clean_text, invalid, str_at, Args, ParamDef, Tool, ToolArgs, ToolContext, ToolSpec,
    TTL_12_HOURS,
};
use crate::cache::CacheKey;
use crate::envelope::Envelope;
use crate::types::Result;

const NAME: &str = "pubmed_search";
const DEFAULT_MAX: u32 = 5;
const MAX_RESULTS: u32 = 100;

#[derive(Debug, Clone, Serialize)]
struct Article {
    id: String,
    title: String,
    authors: Vec<String>,
    journal: String,
    publication_date: String,
    abstract_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    doi: Option<String>,
}

#[derive(Debug, Serialize)]
struct SearchResult<'a> {
    query: &'a str,
    total_results: u64,
    date_range: &'a str,
    open_access: bool,
    articles: Vec<Article>,
}

/// Normalised search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PubmedQuery {
    pub query: String,
    pub max_results: u32,
    /// Years back from the current year, as sent (`""` for none).
    pub date_range: String,
    pub open_access: bool,
}

#[derive(Debug)]
pub struct PubmedSearch {
    ctx: ToolContext,
    spec: ToolSpec,
}

impl PubmedSearch {
    pub fn new(ctx: ToolContext) -> Self {
        let spec = ToolSpec::new(NAME, "Search for medical literature in PubMed database")
            .param(ParamDef::string("query", "Search query for medical literature").required())
            .param(
                ParamDef::number("max_results", "Maximum number of results to return")
                    .default_value(DEFAULT_MAX)
                    .range(1, MAX_RESULTS),
            )
            .param(
                ParamDef::string(
                    "date_range",
                    "Limit to articles published within years (e.g. '5' for last 5 years)",
                )
                .default_value(""),
            )
            .param(
                ParamDef::boolean("open_access", "Filter for open access articles")
                    .default_value(false),
            );
        Self { ctx, spec }
    }

    pub async fn search(&self, query: &PubmedQuery) -> Arc<Envelope> {
        let key = CacheKey::derive(
            "pubmed_search",
            &[&query.query, &query.max_results, &query.date_range, &query.open_access],
        );
        self.ctx
            .cached(NAME, key, TTL_12_HOURS, "Error searching PubMed", || self.fetch(query))
            .await
    }

    async fn fetch(&self, query: &PubmedQuery) -> Result<Envelope> {
        let term = search_term(query, chrono::Utc::now().year());
        tracing::info!(term = %term, max_results = query.max_results, "pubmed_search");

        let api_key = self.ctx.api_keys.pubmed.as_deref();
        let page = esearch(&self.ctx, "pubmed", &term, query.max_results, api_key).await?;

        let articles = if page.ids.is_empty() {
            Vec::new()
        } else {
            let summaries = esummary(&self.ctx, "pubmed", &page.ids, api_key).await?;
            page.ids
                .iter()
                .filter_map(|id| summaries.get(id).map(|record| article(id, record)))
                .collect()
        };

        Envelope::success(SearchResult {
            query: &query.query,
            total_results: page.total,
            date_range: &query.date_range,
            open_access: query.open_access,
            articles,
        })
    }
}

/// Query text plus the open-access and publication-date filters.
/// A `date_range` without a positive leading integer adds no filter.
fn search_term(query: &PubmedQuery, current_year: i32) -> String {
    let mut term = query.query.clone();
    if query.open_access {
        term.push_str(" AND open access[filter]");
    }
    if !query.date_range.is_empty() {
        match leading_integer(&query.date_range) {
            Some(years) if years < 1 => {
                tracing::debug!(date_range = %query.date_range, "ignoring non-positive date range")
            }
            Some(years) => {
                let min_year = i64::from(current_year) - years;
                term.push_str(&format!(" AND {min_year}:{current_year}[pdat]"));
            }
            None => tracing::debug!(date_range = %query.date_range, "ignoring invalid date range"),
        }
    }
    term
}

fn article(id: &str, record: &Value) -> Article {
    let doi = array_at(record, "/articleids")
        .iter()
        .filter(|entry| entry.get("idtype").and_then(Value::as_str) == Some("doi"))
        .map(|entry| str_at(entry, "/value"))
        .last();

    Article {
        id: id.to_string(),
        title: clean_text(&str_at(record, "/title")),
        authors: author_names(record),
        journal: str_at(record, "/fulljournalname"),
        publication_date: str_at(record, "/pubdate"),
        abstract_url: format!("https://pubmed.ncbi.nlm.nih.gov/{id}/"),
        doi,
    }
}

#[async_trait]
impl Tool for PubmedSearch {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn call(&self, args: &ToolArgs) -> Arc<Envelope> {
        let args = Args::new(args);
        let Some(query) = args.text("query") else {
            return invalid("Search query is required");
        };
        let query = PubmedQuery {
            query,
            max_results: args.count("max_results", DEFAULT_MAX, MAX_RESULTS),
            date_range: args.text_or_empty("date_range"),
            open_access: args.flag("open_access"),
        };
        self.search(&query).await
    }
}
