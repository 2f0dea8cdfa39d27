//! NCBI Bookshelf document search.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use super::eutils::{author_names, esearch, esummary};
use super::{
    clean_text, invalid, str_at, Args, ParamDef, Tool, ToolArgs, ToolContext, ToolSpec,
    TTL_24_HOURS,
};
use crate::cache::CacheKey;
use crate::envelope::Envelope;
use crate::types::Result;

const NAME: &str = "ncbi_bookshelf_search";
const DEFAULT_MAX: u32 = 10;
const MAX_RESULTS: u32 = 100;

#[derive(Debug)]
pub struct NcbiBookshelfSearch {
    ctx: ToolContext,
    spec: ToolSpec,
}

impl NcbiBookshelfSearch {
    pub fn new(ctx: ToolContext) -> Self {
        let spec = ToolSpec::new(NAME, "Search the NCBI Bookshelf for biomedical books and documents")
            .param(ParamDef::string("query", "Search query for NCBI Bookshelf").required())
            .param(
                ParamDef::number("max_results", "Maximum number of results to return")
                    .default_value(DEFAULT_MAX)
                    .range(1, MAX_RESULTS),
            );
        Self { ctx, spec }
    }

    pub async fn search(&self, query: &str, max_results: u32) -> Arc<Envelope> {
        let key = CacheKey::derive("ncbi_bookshelf_search", &[&query, &max_results]);
        self.ctx
            .cached(NAME, key, TTL_24_HOURS, "Error searching NCBI Bookshelf", || {
                self.fetch(query, max_results)
            })
            .await
    }

    async fn fetch(&self, query: &str, max_results: u32) -> Result<Envelope> {
        tracing::info!(query, max_results, "bookshelf_search");
        let api_key = self.ctx.api_keys.ncbi.as_deref();
        let page = esearch(&self.ctx, "books", query, max_results, api_key).await?;

        let mut books = Vec::with_capacity(page.ids.len());
        if !page.ids.is_empty() {
            let summaries = esummary(&self.ctx, "books", &page.ids, api_key).await?;
            for id in &page.ids {
                let Some(record) = summaries.get(id) else {
                    continue;
                };
                books.push(json!({
                    "id": id,
                    "title": clean_text(&str_at(record, "/title")),
                    "authors": author_names(record),
                    "publication_date": str_at(record, "/pubdate"),
                    "url": format!("https://www.ncbi.nlm.nih.gov/books/{id}/"),
                }));
            }
        }

        Envelope::success(json!({
            "query": query,
            "total_results": page.total,
            "books": Value::Array(books),
        }))
    }
}

#[async_trait]
impl Tool for NcbiBookshelfSearch {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{args, context_with, json_reply};
    use crate::types::Config;
    use crate::upstream::MockUpstream;

    #[tokio::test]
    async fn test_api_key_sent_on_both_requests() {
        let mut config = Config::default();
        config.api_keys.ncbi = Some("k3y".into());

        let mut upstream = MockUpstream::new();
        upstream
            .expect_request()
            .withf(|url, _| url.contains("esearch.fcgi?db=books") && url.ends_with("&api_key=k3y"))
            .times(1)
            .returning(|_, _| json_reply(json!({"esearchresult": {"count": "7", "idlist": ["NBK1"]}})));
        upstream
            .expect_request()
            .withf(|url, _| url.contains("esummary.fcgi?db=books&id=NBK1") && url.ends_with("&api_key=k3y"))
            .times(1)
            .returning(|_, _| {
                json_reply(json!({"result": {"NBK1": {
                    "title": "Genetics Primer",
                    "authors": [{"name": "Smith A"}],
                    "pubdate": "2020"
                }}}))
            });
        let tool = NcbiBookshelfSearch::new(context_with(upstream, &config));

        let env = tool.call(&args(json!({"query": "genetics"}))).await;
        assert_eq!(env.field("total_results"), Some(&json!(7)));
        assert_eq!(
            env.field("books"),
            Some(&json!([{
                "id": "NBK1",
                "title": "Genetics Primer",
                "authors": ["Smith A"],
                "publication_date": "2020",
                "url": "https://www.ncbi.nlm.nih.gov/books/NBK1/"
            }]))
        );
    }

    #[tokio::test]
    async fn test_missing_query_is_validation_error() {
        let tool = NcbiBookshelfSearch::new(crate::tools::test_support::context(MockUpstream::new()));
        let env = tool.call(&args(json!({}))).await;
        assert_eq!(env.error_message(), Some("Search query is required"));
    }
}
