//! Tool registry and the dispatcher shared by every transport.

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cache::EnvelopeCache;
use crate::envelope::Envelope;
use crate::tools::{
    AllUsageStats, BmiCalculator, ClinicalTrialsSearch, DicomMetadata, FdaDrugLookup, HealthTopics,
    IcdCodeLookup, MedrxivSearch, NcbiBookshelfSearch, PubmedSearch, SessionUsageStats, Tool,
    ToolArgs, ToolContext,
};
use crate::types::{Config, Error, Result, SessionId};
use crate::upstream::Upstream;
use crate::usage::UsageTracker;

// =============================================================================
// Registry
// =============================================================================

/// Name-indexed tools, listed in registration order.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<&'static str, usize>,
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Names must be non-empty and unique.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.spec().name;
        if name.is_empty() {
            return Err(Error::validation("Tool name cannot be empty"));
        }
        if self.index.contains_key(name) {
            return Err(Error::validation(format!("Tool already registered: {name}")));
        }
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|t| t.spec().name).collect()
    }

    /// `{name, description, inputSchema}` for every tool.
    pub fn listings(&self) -> Vec<Value> {
        self.tools.iter().map(|t| t.spec().to_listing()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

/// Result of one dispatch. `is_error` is set only when the call could not be
/// routed; tool-level failures travel inside the envelope.
#[derive(Debug, Clone)]
pub struct CallOutcome {
    pub envelope: Arc<Envelope>,
    pub is_error: bool,
}

pub struct Dispatcher {
    registry: ToolRegistry,
    cache: Arc<EnvelopeCache>,
    usage: Arc<UsageTracker>,
    session: SessionId,
    started: Instant,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Build a fresh cache, usage tracker and session, then every tool over
    /// `upstream`.
    pub fn new(config: &Config, upstream: Arc<dyn Upstream>) -> Result<Self> {
        Self::with_parts(
            config,
            upstream,
            Arc::new(EnvelopeCache::new(config.cache.default_ttl_secs)),
            Arc::new(UsageTracker::new()),
            SessionId::new(),
        )
    }

    /// Register every tool over caller-owned shared state. The cache's own TTL
    /// wins over `config.cache`.
    pub fn with_parts(
        config: &Config,
        upstream: Arc<dyn Upstream>,
        cache: Arc<EnvelopeCache>,
        usage: Arc<UsageTracker>,
        session: SessionId,
    ) -> Result<Self> {
        let ctx = ToolContext::new(Arc::clone(&cache), upstream, config);

        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(FdaDrugLookup::new(ctx.clone())))?;
        registry.register(Arc::new(PubmedSearch::new(ctx.clone())))?;
        registry.register(Arc::new(MedrxivSearch::new(ctx.clone())))?;
        registry.register(Arc::new(BmiCalculator::new()))?;
        registry.register(Arc::new(NcbiBookshelfSearch::new(ctx.clone())))?;
        registry.register(Arc::new(DicomMetadata::new()))?;
        registry.register(Arc::new(HealthTopics::new(ctx.clone())))?;
        registry.register(Arc::new(ClinicalTrialsSearch::new(ctx.clone())))?;
        registry.register(Arc::new(IcdCodeLookup::new(ctx)))?;
        registry.register(Arc::new(SessionUsageStats::new(
            Arc::clone(&usage),
            session.clone(),
        )))?;
        registry.register(Arc::new(AllUsageStats::new(Arc::clone(&usage))))?;

        tracing::info!(tools = registry.len(), session = %session, "dispatcher_ready");
        Ok(Self {
            registry,
            cache,
            usage,
            session,
            started: Instant::now(),
        })
    }

    pub fn list_tools(&self) -> Vec<Value> {
        self.registry.listings()
    }

    /// Record usage, then route `name`. Only declared parameters reach the
    /// tool; defaulting is left to the tool.
    pub async fn call_tool(&self, name: &str, args: &ToolArgs) -> CallOutcome {
        self.usage.record_usage(&self.session, name);

        let Some(tool) = self.registry.get(name) else {
            tracing::warn!(tool = name, "unknown_tool");
            return CallOutcome {
                envelope: Arc::new(Envelope::error(format!("Unknown tool: {name}"))),
                is_error: true,
            };
        };

        let declared: ToolArgs = tool
            .spec()
            .parameters
            .iter()
            .filter_map(|p| args.get(p.name).map(|v| (p.name.to_string(), v.clone())))
            .collect();

        CallOutcome {
            envelope: tool.call(&declared).await,
            is_error: false,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &Arc<EnvelopeCache> {
        &self.cache
    }

    pub fn usage(&self) -> &Arc<UsageTracker> {
        &self.usage
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session
    }

    pub fn cache_ttl(&self) -> Duration {
        self.cache.default_ttl()
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }
}
