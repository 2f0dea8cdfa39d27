//! Shared fixtures for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use healthcare_mcp::types::{Error, Result};
use healthcare_mcp::upstream::{Payload, RequestOptions, Upstream};
use healthcare_mcp::{Config, Dispatcher};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Canned upstream: the first route whose fragment occurs in the URL answers.
/// Unrouted URLs fail with HTTP 404.
#[derive(Debug, Default)]
pub struct StubUpstream {
    routes: Vec<(String, Value)>,
    calls: AtomicUsize,
    urls: Mutex<Vec<String>>,
}

impl StubUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, fragment: &str, body: Value) -> Self {
        self.routes.push((fragment.to_string(), body));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().clone()
    }
}

#[async_trait]
impl Upstream for StubUpstream {
    async fn request(&self, url: &str, _options: RequestOptions) -> Result<Payload> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().push(url.to_string());
        self.routes
            .iter()
            .find(|(fragment, _)| url.contains(fragment.as_str()))
            .map(|(_, body)| Payload::Json(body.clone()))
            .ok_or_else(|| Error::upstream(404, "Not Found"))
    }
}

pub fn dispatcher(stub: &Arc<StubUpstream>) -> Arc<Dispatcher> {
    let upstream: Arc<dyn Upstream> = Arc::clone(stub) as Arc<dyn Upstream>;
    Arc::new(Dispatcher::new(&Config::default(), upstream).expect("dispatcher builds"))
}

/// Two recruiting studies, the first with four sites.
pub fn trials_body() -> Value {
    let site = |city: &str| json!({"facility": {"name": format!("{city} General")}, "city": city, "country": "United States"});
    json!({
        "totalCount": 2,
        "studies": [
            {
                "protocolSection": {
                    "identificationModule": {"nctId": "NCT00000001", "briefTitle": "<b>Asthma</b> inhaler study"},
                    "statusModule": {"overallStatus": "RECRUITING"},
                    "designModule": {"phases": ["PHASE2"], "studyType": "INTERVENTIONAL"},
                    "conditionsModule": {"conditions": ["Asthma"]},
                    "contactsLocationsModule": {"locations": [site("Boston"), site("Austin"), site("Denver"), site("Miami")]},
                    "sponsorCollaboratorsModule": {"leadSponsor": {"name": "Example University"}},
                    "eligibilityModule": {"sex": "ALL", "minimumAge": "18 Years", "maximumAge": "65 Years"}
                }
            },
            {
                "protocolSection": {
                    "identificationModule": {"nctId": "NCT00000002", "briefTitle": "Pediatric asthma registry"},
                    "statusModule": {"overallStatus": "RECRUITING"},
                    "designModule": {"studyType": "OBSERVATIONAL"}
                }
            }
        ]
    })
}

pub fn medrxiv_body() -> Value {
    json!({
        "collection": [
            {"rel_title": "Long COVID outcomes", "rel_authors": "A. Author; B. Author", "rel_doi": "10.1101/2024.01.01.000001", "rel_date": "2024-01-02"}
        ]
    })
}
