//! FDA drug label and NDC directory lookup.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use super::{
    array_at, invalid, str_at, value_or, Args, ParamDef, Tool, ToolArgs, ToolContext, ToolSpec,
    TTL_24_HOURS,
};
use crate::cache::CacheKey;
use crate::envelope::Envelope;
use crate::sanitize::sanitize_value;
use crate::types::Result;
use crate::upstream::{build_url, QueryParams};

const NAME: &str = "fda_drug_lookup";
const SEARCH_TYPES: [&str; 3] = ["general", "label", "adverse_events"];

#[derive(Debug)]
pub struct FdaDrugLookup {
    ctx: ToolContext,
    spec: ToolSpec,
}

impl FdaDrugLookup {
    pub fn new(ctx: ToolContext) -> Self {
        let spec = ToolSpec::new(NAME, "Look up drug information from the FDA database")
            .param(ParamDef::string("drug_name", "Name of the drug to search for").required())
            .param(
                ParamDef::one_of(
                    "search_type",
                    "Type of information to retrieve: 'label', 'adverse_events', or 'general'",
                    &SEARCH_TYPES,
                )
                .default_value("general"),
            );
        Self { ctx, spec }
    }

    /// `search_type` must already be one of `general`, `label`, `adverse_events`.
    pub async fn lookup(&self, drug_name: &str, search_type: &'static str) -> Arc<Envelope> {
        let key = CacheKey::derive("fda_drug", &[&search_type, &drug_name]);
        self.ctx
            .cached(NAME, key, TTL_24_HOURS, "Error fetching drug information", || {
                self.fetch(drug_name, search_type)
            })
            .await
    }

    async fn fetch(&self, drug_name: &str, search_type: &str) -> Result<Envelope> {
        tracing::info!(drug_name, search_type, "fda_lookup");
        let (path, search) = match search_type {
            "label" | "adverse_events" => (
                "label.json",
                format!("openfda.generic_name:{drug_name} OR openfda.brand_name:{drug_name}"),
            ),
            _ => (
                "ndc.json",
                format!("generic_name:{drug_name} OR brand_name:{drug_name}"),
            ),
        };

        let params = QueryParams::new()
            .push("search", search)
            .push("limit", 1)
            .push_opt("api_key", self.ctx.api_keys.fda.as_deref());
        let endpoint = format!("{}/{path}", self.ctx.endpoints.fda.trim_end_matches('/'));
        let data = self.ctx.fetch_json(&build_url(&endpoint, &params)?).await?;

        let extracted = extract_key_info(&data, search_type);
        let drugs: Vec<Value> = match data.get("results").and_then(Value::as_array) {
            Some(results) => results.iter().map(|drug| drug_entry(drug, &extracted)).collect(),
            None => vec![Value::Object(extracted)],
        };

        Envelope::success(json!({
            "drug_name": drug_name,
            "search_type": search_type,
            "drugs": drugs,
            "total_results": data.pointer("/meta/results/total").and_then(Value::as_u64).unwrap_or(0),
        }))
    }
}

/// One drug record: identity fields first, then the extracted details, which
/// win on name clashes.
fn drug_entry(drug: &Value, extracted: &Map<String, Value>) -> Value {
    let pick = |own: &str, fallback: &str| -> Value {
        let own = str_at(drug, own);
        if !own.is_empty() {
            return json!(own);
        }
        match extracted.get(fallback) {
            None | Some(Value::Null) => json!(""),
            Some(Value::String(s)) if s.is_empty() => json!(""),
            Some(found) => found.clone(),
        }
    };

    let mut product_number = str_at(drug, "/product_ndc");
    if product_number.is_empty() {
        product_number = str_at(drug, "/ndc_product_code");
    }

    let mut entry = Map::new();
    entry.insert("product_number".into(), json!(product_number));
    entry.insert("generic_name".into(), pick("/generic_name", "generic_name"));
    entry.insert("brand_name".into(), pick("/brand_name", "brand_name"));
    entry.insert("labeler_name".into(), pick("/labeler_name", "manufacturer"));
    entry.insert("product_type".into(), pick("/product_type", "product_type"));
    for (k, v) in extracted {
        entry.insert(k.clone(), v.clone());
    }
    Value::Object(entry)
}

/// Sanitised highlights from the most relevant (first) result.
fn extract_key_info(data: &Value, search_type: &str) -> Map<String, Value> {
    let mut out = Map::new();
    let Some(results) = data.get("results").and_then(Value::as_array) else {
        return out;
    };
    let result = results.first().cloned().unwrap_or_else(|| json!({}));
    let head = |pointer: &str, n: usize| -> Value {
        Value::Array(array_at(&result, pointer).iter().take(n).cloned().collect())
    };
    let clean = |field: &str| json!(sanitize_value(result.get(field)));

    match search_type {
        "label" => {
            if result.get("openfda").is_some() {
                out.insert("brand_names".into(), head("/openfda/brand_name", 3));
                out.insert("generic_names".into(), head("/openfda/generic_name", 3));
                out.insert("manufacturer".into(), head("/openfda/manufacturer_name", 1));
            }
            out.insert("indications".into(), clean("indications_and_usage"));
            out.insert("dosage".into(), clean("dosage_and_administration"));
            out.insert("warnings".into(), clean("warnings_and_cautions"));
            out.insert("contraindications".into(), clean("contraindications"));
            out.insert("adverse_reactions".into(), clean("adverse_reactions"));
            out.insert("drug_interactions".into(), clean("drug_interactions"));
            out.insert("pregnancy".into(), clean("pregnancy"));
        }
        "adverse_events" => {
            if result.get("openfda").is_some() {
                out.insert("brand_names".into(), head("/openfda/brand_name", 3));
                out.insert("generic_names".into(), head("/openfda/generic_name", 3));
            }
            out.insert("adverse_reactions".into(), clean("adverse_reactions"));
            out.insert("warnings".into(), clean("warnings_and_cautions"));
            out.insert("boxed_warning".into(), clean("boxed_warning"));
        }
        _ => {
            out.insert("generic_name".into(), json!(str_at(&result, "/generic_name")));
            out.insert("brand_name".into(), json!(str_at(&result, "/brand_name")));
            out.insert("manufacturer".into(), json!(str_at(&result, "/labeler_name")));
            out.insert("product_type".into(), json!(str_at(&result, "/product_type")));
            out.insert("route".into(), value_or(&result, "/route", json!([])));
            out.insert("marketing_status".into(), json!(str_at(&result, "/marketing_status")));
        }
    }
    out
}

#[async_trait]
impl Tool for FdaDrugLookup {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn call(&self, args: &ToolArgs) -> Arc<Envelope> {
        let args = Args::new(args);
        let Some(drug_name) = args.text("drug_name") else {
            return invalid("Drug name is required");
        };
        let search_type = args.choice("search_type", &SEARCH_TYPES, "general");
        self.lookup(&drug_name, search_type).await
    }
}
