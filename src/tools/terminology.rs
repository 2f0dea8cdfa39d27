//! ICD-10-CM code lookup via the NLM Clinical Tables service.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{invalid, Args, ParamDef, Tool, ToolArgs, ToolContext, ToolSpec, TTL_24_HOURS};
use crate::cache::CacheKey;
use crate::envelope::Envelope;
use crate::types::Result;
use crate::upstream::{build_url, QueryParams};

const NAME: &str = "lookup_icd_code";
const DEFAULT_MAX: u32 = 10;
const MAX_RESULTS: u32 = 50;

#[derive(Debug)]
pub struct IcdCodeLookup {
    ctx: ToolContext,
    spec: ToolSpec,
}

impl IcdCodeLookup {
    pub fn new(ctx: ToolContext) -> Self {
        let spec = ToolSpec::new(NAME, "Look up ICD-10 codes by code or description")
            .param(ParamDef::string(
                "code",
                "ICD-10 code to look up (optional if description is provided)",
            ))
            .param(ParamDef::string(
                "description",
                "Medical condition description to search for (optional if code is provided)",
            ))
            .param(
                ParamDef::number("max_results", "Maximum number of results to return")
                    .default_value(DEFAULT_MAX)
                    .range(1, MAX_RESULTS),
            );
        Self { ctx, spec }
    }

    /// Look up by `code`, or by `description` when `code` is empty.
    pub async fn lookup(&self, code: &str, description: &str, max_results: u32) -> Arc<Envelope> {
        if code.is_empty() && description.is_empty() {
            return invalid("Either code or description is required");
        }
        let key = CacheKey::derive("icd_code", &[&code, &description, &max_results]);
        self.ctx
            .cached(NAME, key, TTL_24_HOURS, "Error looking up ICD-10 code", || {
                self.fetch(code, description, max_results)
            })
            .await
    }

    async fn fetch(&self, code: &str, description: &str, max_results: u32) -> Result<Envelope> {
        let (search_type, term) = if code.is_empty() {
            ("description", description)
        } else {
            ("code", code)
        };
        tracing::info!(search_type, term, "icd_lookup");

        let params = QueryParams::new()
            .push("sf", "code,name")
            .push("terms", term)
            .push("maxList", max_results);
        let data = self
            .ctx
            .fetch_json(&build_url(&self.ctx.endpoints.icd10, &params)?)
            .await?;

        // Response is [total, codes, extra, [[code, name, ...], ...]].
        let codes: Vec<Value> = data
            .get(3)
            .and_then(Value::as_array)
            .map(|rows| rows.iter().map(code_entry).collect())
            .unwrap_or_default();

        Envelope::success(json!({
            "search_type": search_type,
            "search_term": term,
            "total_results": codes.len(),
            "codes": codes,
        }))
    }
}

fn code_entry(row: &Value) -> Value {
    let cell = |i: usize| row.get(i).and_then(Value::as_str).unwrap_or_default();
    json!({
        "code": cell(0),
        "description": cell(1),
        "category": cell(2),
    })
}

#[async_trait]
impl Tool for IcdCodeLookup {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn call(&self, args: &ToolArgs) -> Arc<Envelope> {
        let args = Args::new(args);
        let code = args.text_or_empty("code");
        let description = args.text_or_empty("description");
        let max_results = args.count("max_results", DEFAULT_MAX, MAX_RESULTS);
        self.lookup(&code, &description, max_results).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{args, context, json_reply};
    use crate::upstream::MockUpstream;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_neither_code_nor_description() {
        let tool = IcdCodeLookup::new(context(MockUpstream::new()));
        let env = tool.call(&args(json!({"max_results": 5}))).await;
        assert_eq!(env.error_message(), Some("Either code or description is required"));
    }

    #[tokio::test]
    async fn test_description_search() {
        let mut upstream = MockUpstream::new();
        upstream
            .expect_request()
            .withf(|url, _| url.ends_with("search?sf=code%2Cname&terms=diabetes&maxList=50"))
            .times(1)
            .returning(|_, _| {
                json_reply(json!([2, ["E11.9", "E10.9"], null, [
                    ["E11.9", "Type 2 diabetes mellitus without complications"],
                    ["E10.9", "Type 1 diabetes mellitus without complications", "Endocrine"]
                ]]))
            });
        let tool = IcdCodeLookup::new(context(upstream));

        let env = tool
            .call(&args(json!({"description": "diabetes", "max_results": 80})))
            .await;
        assert_eq!(env.field("search_type"), Some(&json!("description")));
        assert_eq!(env.field("search_term"), Some(&json!("diabetes")));
        assert_eq!(env.field("total_results"), Some(&json!(2)));
        assert_eq!(
            env.field("codes").unwrap()[0],
            json!({"code": "E11.9", "description": "Type 2 diabetes mellitus without complications", "category": ""})
        );
    }

    #[tokio::test]
    async fn test_code_takes_precedence() {
        let mut upstream = MockUpstream::new();
        upstream
            .expect_request()
            .withf(|url, _| url.contains("terms=J45&"))
            .times(1)
            .returning(|_, _| json_reply(json!([0, [], null, []])));
        let tool = IcdCodeLookup::new(context(upstream));

        let env = tool
            .call(&args(json!({"code": "J45", "description": "asthma"})))
            .await;
        assert_eq!(env.field("search_type"), Some(&json!("code")));
        assert_eq!(env.field("codes"), Some(&json!([])));
    }
}
