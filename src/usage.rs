//! Process-wide tool usage counters.
//!
//! There is a single bucket for the whole process. The session id passed to
//! [`UsageTracker::record_usage`] is only used for log attribution, and the
//! per-session report echoes the caller's id over the shared totals.
//! `tool_usage` lists tools in the order they were first called.

use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use indexmap::IndexMap;

use crate::envelope::Envelope;
use crate::types::{Result, SessionId};

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UsageSnapshot {
    pub total_calls: u64,
    pub tool_usage: IndexMap<String, u64>,
}

#[derive(Debug, Default)]
struct Counters {
    total_calls: u64,
    tool_usage: IndexMap<String, u64>,
}

#[derive(Debug)]
pub struct UsageTracker {
    session_start: String,
    counters: Mutex<Counters>,
}

impl Default for UsageTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl UsageTracker {
    pub fn new() -> Self {
        Self {
            session_start: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            counters: Mutex::new(Counters::default()),
        }
    }

    /// RFC 3339 timestamp taken when the tracker was created.
    pub fn session_start(&self) -> &str {
        &self.session_start
    }

    /// Count one call. Unknown tool names are counted too.
    pub fn record_usage(&self, session: &SessionId, tool: &str) {
        let mut counters = self.counters.lock();
        counters.total_calls += 1;
        *counters.tool_usage.entry(tool.to_string()).or_insert(0) += 1;
        drop(counters);
        tracing::info!(tool, session = %session, "tool_usage_recorded");
    }

    pub fn snapshot(&self) -> UsageSnapshot {
        let counters = self.counters.lock();
        UsageSnapshot {
            total_calls: counters.total_calls,
            tool_usage: counters.tool_usage.clone(),
        }
    }

    /// Shared totals labelled with `session`.
    pub fn session_usage(&self, session: &SessionId) -> Result<Envelope> {
        #[derive(Serialize)]
        struct SessionUsage<'a> {
            session_id: &'a str,
            session_start: &'a str,
            total_calls: u64,
            tool_usage: IndexMap<String, u64>,
        }

        let snapshot = self.snapshot();
        Envelope::success(SessionUsage {
            session_id: session.as_str(),
            session_start: &self.session_start,
            total_calls: snapshot.total_calls,
            tool_usage: snapshot.tool_usage,
        })
    }

    /// Shared totals under `overall_stats`.
    pub fn all_usage_stats(&self) -> Result<Envelope> {
        #[derive(Serialize)]
        struct Overall<'a> {
            session_start: &'a str,
            total_calls: u64,
            tool_usage: IndexMap<String, u64>,
        }
        #[derive(Serialize)]
        struct AllUsage<'a> {
            overall_stats: Overall<'a>,
        }

        let snapshot = self.snapshot();
        Envelope::success(AllUsage {
            overall_stats: Overall {
                session_start: &self.session_start,
                total_calls: snapshot.total_calls,
                tool_usage: snapshot.tool_usage,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tracing_test::traced_test;

    #[test]
    fn test_three_calls_are_counted() {
        let tracker = UsageTracker::new();
        let session = SessionId::new();
        for _ in 0..3 {
            tracker.record_usage(&session, "x");
        }

        let env = tracker.session_usage(&session).unwrap();
        assert_eq!(env.field("total_calls"), Some(&json!(3)));
        assert_eq!(env.field("tool_usage"), Some(&json!({"x": 3})));
        assert_eq!(env.field("session_id"), Some(&json!(session.as_str())));
    }

    #[test]
    fn test_sessions_share_one_bucket() {
        let tracker = UsageTracker::new();
        let a = SessionId::new();
        let b = SessionId::new();
        tracker.record_usage(&a, "pubmed_search");
        tracker.record_usage(&b, "fda_drug_lookup");

        let for_a = tracker.session_usage(&a).unwrap();
        let for_b = tracker.session_usage(&b).unwrap();
        assert_eq!(for_a.field("total_calls"), Some(&json!(2)));
        assert_eq!(for_a.field("tool_usage"), for_b.field("tool_usage"));
    }

    #[test]
    fn test_all_usage_shape() {
        let tracker = UsageTracker::new();
        tracker.record_usage(&SessionId::new(), "calculate_bmi");

        let value = tracker.all_usage_stats().unwrap().to_value();
        assert_eq!(value["status"], json!("success"));
        assert_eq!(value["overall_stats"]["total_calls"], json!(1));
        assert_eq!(value["overall_stats"]["tool_usage"], json!({"calculate_bmi": 1}));
        assert_eq!(
            value["overall_stats"]["session_start"],
            json!(tracker.session_start())
        );
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let tracker = UsageTracker::new();
        let session = SessionId::new();
        tracker.record_usage(&session, "a");
        let mut snapshot = tracker.snapshot();
        snapshot.tool_usage.insert("a".to_string(), 99);
        snapshot.total_calls = 0;

        assert_eq!(tracker.snapshot().tool_usage["a"], 1);
        assert_eq!(tracker.snapshot().total_calls, 1);
    }

    #[test]
    fn test_counters_never_decrease() {
        let tracker = UsageTracker::new();
        let session = SessionId::new();
        let mut last = 0;
        for tool in ["a", "b", "a", "c", "a"] {
            tracker.record_usage(&session, tool);
            let total = tracker.snapshot().total_calls;
            assert!(total > last);
            last = total;
        }
        assert_eq!(tracker.snapshot().tool_usage["a"], 3);
    }

    #[test]
    fn test_session_start_is_utc_millis() {
        let tracker = UsageTracker::new();
        let start = tracker.session_start();
        assert!(start.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(start).is_ok());
    }

    #[test]
    fn test_tool_usage_keeps_first_call_order() {
        let tracker = UsageTracker::new();
        let session = SessionId::new();
        for tool in ["pubmed_search", "calculate_bmi", "pubmed_search", "fda_drug_lookup"] {
            tracker.record_usage(&session, tool);
        }

        let names: Vec<_> = tracker.snapshot().tool_usage.keys().cloned().collect();
        assert_eq!(names, ["pubmed_search", "calculate_bmi", "fda_drug_lookup"]);

        let rendered = tracker.all_usage_stats().unwrap().to_pretty_json();
        let pubmed = rendered.find("pubmed_search").unwrap();
        let bmi = rendered.find("calculate_bmi").unwrap();
        let fda = rendered.find("fda_drug_lookup").unwrap();
        assert!(pubmed < bmi && bmi < fda);
    }

    #[traced_test]
    #[test]
    fn test_record_is_logged() {
        let tracker = UsageTracker::new();
        tracker.record_usage(&SessionId::new(), "health_topics");
        assert!(logs_contain("tool_usage_recorded"));
    }
}
