//! MyHealthfinder topic search.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{
    array_at, invalid, str_at, Args, ParamDef, Tool, ToolArgs, ToolContext, ToolSpec, TTL_24_HOURS,
};
use crate::cache::CacheKey;
use crate::envelope::Envelope;
use crate::sanitize::{strip_markup, truncate_with_ellipsis};
use crate::types::Result;
use crate::upstream::{build_url, QueryParams};

const NAME: &str = "health_topics";
const LANGUAGES: [&str; 2] = ["en", "es"];
const MAX_SECTION_CHARS: usize = 500;

#[derive(Debug)]
pub struct HealthTopics {
    ctx: ToolContext,
    spec: ToolSpec,
}

impl HealthTopics {
    pub fn new(ctx: ToolContext) -> Self {
        let spec = ToolSpec::new(NAME, "Get evidence-based health information on various topics")
            .param(ParamDef::string("topic", "Health topic to search for information").required())
            .param(
                ParamDef::one_of("language", "Language for content (en or es)", &LANGUAGES)
                    .default_value("en"),
            );
        Self { ctx, spec }
    }

    pub async fn search(&self, topic: &str, language: &'static str) -> Arc<Envelope> {
        let key = CacheKey::derive("health_topics", &[&topic, &language]);
        self.ctx
            .cached(NAME, key, TTL_24_HOURS, "Error searching health topics", || {
                self.fetch(topic, language)
            })
            .await
    }

    async fn fetch(&self, topic: &str, language: &str) -> Result<Envelope> {
        tracing::info!(topic, language, "health_topics_search");
        let endpoint = format!(
            "{}/topicsearch.json",
            self.ctx.endpoints.health_finder.trim_end_matches('/')
        );
        let params = QueryParams::new().push("keyword", topic).push("lang", language);
        let data = self.ctx.fetch_json(&build_url(&endpoint, &params)?).await?;

        let resources = array_at(&data, "/Result/Resources/Resource");
        let topics: Vec<Value> = resources.iter().map(topic_entry).collect();

        Envelope::success(json!({
            "search_term": topic,
            "language": language,
            "total_results": resources.len(),
            "health_topics": topics,
        }))
    }
}

fn topic_entry(resource: &Value) -> Value {
    let mut url = str_at(resource, "/AccessibleVersion");
    if url.is_empty() {
        url = str_at(resource, "/LastUpdate");
    }
    let sections = array_at(resource, "/Sections/Section");
    let content: Vec<String> = sections
        .iter()
        .filter_map(|section| section.get("Content").and_then(Value::as_str))
        .map(|raw| truncate_with_ellipsis(&strip_markup(raw), MAX_SECTION_CHARS))
        .filter(|text| !text.is_empty())
        .collect();

    json!({
        "title": str_at(resource, "/Title"),
        "url": url,
        "last_updated": str_at(resource, "/LastUpdate"),
        "section": str_at(resource, "/Sections/Section/0/Title"),
        "description": str_at(resource, "/Sections/Section/0/Description"),
        "content": content,
    })
}

#[async_trait]
impl Tool for HealthTopics {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn call(&self, args: &ToolArgs) -> Arc<Envelope> {
        let args = Args::new(args);
        let Some(topic) = args.text("topic") else {
            return invalid("Topic is required");
        };
        let language = args.choice("language", &LANGUAGES, "en");
        self.search(&topic, language).await
    }
}
