//! Usage reporting tools over the shared [`UsageTracker`].

use async_trait::async_trait;
use std::sync::Arc;

use super::{Tool, ToolArgs, ToolSpec};
use crate::envelope::Envelope;
use crate::types::{Result, SessionId};
use crate::usage::UsageTracker;

fn into_arc(result: Result<Envelope>) -> Arc<Envelope> {
    Arc::new(result.unwrap_or_else(|e| Envelope::error(format!("Error reading usage: {e}"))))
}

/// `get_usage_stats`: totals labelled with this process's session.
#[derive(Debug)]
pub struct SessionUsageStats {
    spec: ToolSpec,
    tracker: Arc<UsageTracker>,
    session: SessionId,
}

impl SessionUsageStats {
    pub fn new(tracker: Arc<UsageTracker>, session: SessionId) -> Self {
        Self {
            spec: ToolSpec::new("get_usage_stats", "Get usage statistics for the current session"),
            tracker,
            session,
        }
    }
}

#[async_trait]
impl Tool for SessionUsageStats {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn call(&self, _args: &ToolArgs) -> Arc<Envelope> {
        into_arc(self.tracker.session_usage(&self.session))
    }
}

/// `get_all_usage_stats`: totals under `overall_stats`.
#[derive(Debug)]
pub struct AllUsageStats {
    spec: ToolSpec,
    tracker: Arc<UsageTracker>,
}

impl AllUsageStats {
    pub fn new(tracker: Arc<UsageTracker>) -> Self {
        Self {
            spec: ToolSpec::new(
                "get_all_usage_stats",
                "Get overall usage statistics for all sessions",
            ),
            tracker,
        }
    }
}

#[async_trait]
impl Tool for AllUsageStats {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn call(&self, _args: &ToolArgs) -> Arc<Envelope> {
        into_arc(self.tracker.all_usage_stats())
    }
}
