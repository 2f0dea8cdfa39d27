//! ClinicalTrials.gov study search.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{
    array_at, clean_text, invalid, str_at, value_or, Args, ParamDef, Tool, ToolArgs, ToolContext,
    ToolSpec, TTL_24_HOURS,
};
use crate::cache::CacheKey;
use crate::envelope::Envelope;
use crate::types::Result;
use crate::upstream::{build_url, QueryParams};

const NAME: &str = "clinical_trials_search";
const STATUSES: [&str; 5] = ["recruiting", "completed", "active", "not_recruiting", "all"];
const DEFAULT_MAX: u32 = 10;
const MAX_RESULTS: u32 = 100;
const MAX_LOCATIONS: usize = 3;

#[derive(Debug, Serialize)]
struct Location {
    facility: String,
    city: String,
    state: String,
    country: String,
}

#[derive(Debug, Serialize)]
struct Eligibility {
    gender: String,
    min_age: String,
    max_age: String,
    healthy_volunteers: &'static str,
}

#[derive(Debug, Serialize)]
struct Trial {
    nct_id: String,
    title: String,
    status: String,
    phase: Value,
    study_type: String,
    conditions: Value,
    locations: Vec<Location>,
    sponsor: String,
    url: String,
    eligibility: Eligibility,
}

/// ClinicalTrials.gov `filter.overallStatus` value; `None` means no filter.
fn status_filter(status: &str) -> Option<&'static str> {
    match status {
        "all" => None,
        "completed" => Some("COMPLETED"),
        "active" | "not_recruiting" => Some("ACTIVE_NOT_RECRUITING"),
        _ => Some("RECRUITING"),
    }
}

#[derive(Debug)]
pub struct ClinicalTrialsSearch {
    ctx: ToolContext,
    spec: ToolSpec,
}

impl ClinicalTrialsSearch {
    pub fn new(ctx: ToolContext) -> Self {
        let spec = ToolSpec::new(
            NAME,
            "Search for clinical trials by condition, status, and other parameters",
        )
        .param(ParamDef::string("condition", "Medical condition or disease to search for").required())
        .param(ParamDef::one_of("status", "Trial status", &STATUSES).default_value("recruiting"))
        .param(
            ParamDef::number("max_results", "Maximum number of results to return")
                .default_value(DEFAULT_MAX)
                .range(1, MAX_RESULTS),
        );
        Self { ctx, spec }
    }

    pub async fn search(&self, condition: &str, status: &'static str, max_results: u32) -> Arc<Envelope> {
        let key = CacheKey::derive("clinical_trials", &[&condition, &status, &max_results]);
        self.ctx
            .cached(NAME, key, TTL_24_HOURS, "Error searching clinical trials", || {
                self.fetch(condition, status, max_results)
            })
            .await
    }

    async fn fetch(&self, condition: &str, status: &str, max_results: u32) -> Result<Envelope> {
        tracing::info!(condition, status, max_results, "clinical_trials_search");
        let params = QueryParams::new()
            .push("query.cond", condition)
            .push("pageSize", max_results)
            .push("format", "json")
            .push_opt("filter.overallStatus", status_filter(status));
        let data = self
            .ctx
            .fetch_json(&build_url(&self.ctx.endpoints.clinical_trials, &params)?)
            .await?;

        let (trials, total) = match data.get("studies").and_then(Value::as_array) {
            Some(studies) => {
                let total = data
                    .get("totalCount")
                    .and_then(Value::as_u64)
                    .filter(|n| *n > 0)
                    .unwrap_or(studies.len() as u64);
                (studies.iter().map(trial).collect::<Vec<_>>(), total)
            }
            None => (Vec::new(), 0),
        };

        Envelope::success(json!({
            "condition": condition,
            "search_status": status,
            "total_results": total,
            "trials": trials,
        }))
    }
}

fn trial(study: &Value) -> Trial {
    let protocol = study.get("protocolSection").cloned().unwrap_or(Value::Null);
    let nct_id = str_at(&protocol, "/identificationModule/nctId");
    let url = if nct_id.is_empty() {
        String::new()
    } else {
        format!("https://clinicaltrials.gov/study/{nct_id}")
    };

    let locations = array_at(&protocol, "/contactsLocationsModule/locations")
        .iter()
        .take(MAX_LOCATIONS)
        .map(location)
        .collect();

    let healthy = protocol
        .pointer("/eligibilityModule/healthyVolunteers")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    Trial {
        title: clean_text(&str_at(&protocol, "/identificationModule/briefTitle")),
        nct_id,
        status: str_at(&protocol, "/statusModule/overallStatus"),
        phase: value_or(&protocol, "/designModule/phases", json!([])),
        study_type: str_at(&protocol, "/designModule/studyType"),
        conditions: value_or(&protocol, "/conditionsModule/conditions", json!([])),
        locations,
        sponsor: str_at(&protocol, "/sponsorCollaboratorsModule/leadSponsor/name"),
        url,
        eligibility: Eligibility {
            gender: str_at(&protocol, "/eligibilityModule/sex"),
            min_age: str_at(&protocol, "/eligibilityModule/minimumAge"),
            max_age: str_at(&protocol, "/eligibilityModule/maximumAge"),
            healthy_volunteers: if healthy { "Yes" } else { "No" },
        },
    }
}

/// Study sites carry the facility either as a nested object or as a bare name
/// next to the address fields.
fn location(site: &Value) -> Location {
    match site.get("facility") {
        Some(facility @ Value::Object(_)) => Location {
            facility: str_at(facility, "/name"),
            city: str_at(facility, "/city"),
            state: str_at(facility, "/state"),
            country: str_at(facility, "/country"),
        },
        _ => Location {
            facility: str_at(site, "/facility"),
            city: str_at(site, "/city"),
            state: str_at(site, "/state"),
            country: str_at(site, "/country"),
        },
    }
}

#[async_trait]
impl Tool for ClinicalTrialsSearch {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn call(&self, args: &ToolArgs) -> Arc<Envelope> {
        let args = Args::new(args);
        let Some(condition) = args.text("condition") else {
            return invalid("Condition is required");
        };
        let status = args.choice("status", &STATUSES, "recruiting");
        let max_results = args.count("max_results", DEFAULT_MAX, MAX_RESULTS);
        self.search(&condition, status, max_results).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{args, context, json_reply};
    use crate::upstream::MockUpstream;
    use pretty_assertions::assert_eq;

    fn study(nct: &str, sites: usize) -> Value {
        let locations: Vec<Value> = (0..sites)
            .map(|i| json!({"facility": format!("Site {i}"), "city": "Boston", "state": "MA", "country": "United States"}))
            .collect();
        json!({"protocolSection": {
            "identificationModule": {"nctId": nct, "briefTitle": "A <b>Study</b>"},
            "statusModule": {"overallStatus": "RECRUITING"},
            "designModule": {"phases": ["PHASE2"], "studyType": "INTERVENTIONAL"},
            "conditionsModule": {"conditions": ["Asthma"]},
            "sponsorCollaboratorsModule": {"leadSponsor": {"name": "NIH"}},
            "eligibilityModule": {"sex": "ALL", "minimumAge": "18 Years", "healthyVolunteers": true},
            "contactsLocationsModule": {"locations": locations}
        }})
    }

    #[test]
    fn test_status_filter_mapping() {
        assert_eq!(status_filter("recruiting"), Some("RECRUITING"));
        assert_eq!(status_filter("completed"), Some("COMPLETED"));
        assert_eq!(status_filter("active"), Some("ACTIVE_NOT_RECRUITING"));
        assert_eq!(status_filter("not_recruiting"), Some("ACTIVE_NOT_RECRUITING"));
        assert_eq!(status_filter("all"), None);
    }

    #[test]
    fn test_nested_facility_object() {
        let site = json!({"facility": {"name": "General", "city": "Lyon", "country": "France"}});
        let loc = location(&site);
        assert_eq!(loc.facility, "General");
        assert_eq!(loc.city, "Lyon");
        assert_eq!(loc.state, "");
    }

    #[tokio::test]
    async fn test_trials_mapped_with_location_cap() {
        let mut upstream = MockUpstream::new();
        upstream
            .expect_request()
            .withf(|url, _| {
                url == "https://clinicaltrials.gov/api/v2/studies?query.cond=asthma&pageSize=10&format=json&filter.overallStatus=RECRUITING"
            })
            .times(1)
            .returning(|_, _| json_reply(json!({"studies": [study("NCT01", 5)]})));
        let tool = ClinicalTrialsSearch::new(context(upstream));

        let env = tool.call(&args(json!({"condition": "asthma"}))).await;
        assert_eq!(env.field("search_status"), Some(&json!("recruiting")));
        assert_eq!(env.field("total_results"), Some(&json!(1)));
        let trial = &env.field("trials").unwrap()[0];
        assert_eq!(trial["title"], "A Study");
        assert_eq!(trial["url"], "https://clinicaltrials.gov/study/NCT01");
        assert_eq!(trial["phase"], json!(["PHASE2"]));
        assert_eq!(trial["locations"].as_array().unwrap().len(), 3);
        assert_eq!(trial["locations"][0]["facility"], "Site 0");
        assert_eq!(
            trial["eligibility"],
            json!({"gender": "ALL", "min_age": "18 Years", "max_age": "", "healthy_volunteers": "Yes"})
        );
    }

    #[tokio::test]
    async fn test_all_status_omits_filter_and_uses_total_count() {
        let mut upstream = MockUpstream::new();
        upstream
            .expect_request()
            .withf(|url, _| !url.contains("filter.overallStatus") && url.contains("pageSize=2"))
            .times(1)
            .returning(|_, _| json_reply(json!({"totalCount": 250, "studies": [study("NCT02", 0)]})));
        let tool = ClinicalTrialsSearch::new(context(upstream));

        let env = tool
            .call(&args(json!({"condition": "flu", "status": "All", "max_results": "2"})))
            .await;
        assert_eq!(env.field("search_status"), Some(&json!("all")));
        assert_eq!(env.field("total_results"), Some(&json!(250)));
    }

    #[tokio::test]
    async fn test_missing_condition() {
        let tool = ClinicalTrialsSearch::new(context(MockUpstream::new()));
        let env = tool.call(&args(json!({"status": "completed"}))).await;
        assert_eq!(env.error_message(), Some("Condition is required"));
    }
}
