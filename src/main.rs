//! Healthcare MCP server entry point.
//!
//! `healthcare-mcp stdio` (default) speaks MCP over stdin/stdout;
//! `healthcare-mcp http` serves the HTTP API.

use clap::{Args, Parser, Subcommand};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use healthcare_mcp::cache::{CacheSweeper, EnvelopeCache};
use healthcare_mcp::transport;
use healthcare_mcp::types::SessionId;
use healthcare_mcp::upstream::HttpUpstream;
use healthcare_mcp::usage::UsageTracker;
use healthcare_mcp::{Config, Dispatcher};

#[derive(Debug, Parser)]
#[command(name = "healthcare-mcp", version, about = "Healthcare data tools over MCP and HTTP")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve MCP tool calls over stdin/stdout.
    Stdio(CommonArgs),
    /// Serve the HTTP API.
    Http {
        /// Listen port (overrides PORT).
        #[arg(long)]
        port: Option<u16>,
        /// Listen host (overrides HOST).
        #[arg(long)]
        host: Option<String>,
        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Debug, Args)]
struct CommonArgs {
    /// Default cache TTL in seconds; 0 keeps entries forever (overrides CACHE_TTL).
    #[arg(long)]
    cache_ttl: Option<u64>,
    /// Fixed session id reported by get_usage_stats; a random UUID otherwise.
    #[arg(long, env = "HEALTHCARE_MCP_SESSION_ID")]
    session_id: Option<String>,
}

impl CommonArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(ttl) = self.cache_ttl {
            config.cache.default_ttl_secs = ttl;
        }
    }

    fn session(&self) -> Result<SessionId, &'static str> {
        match &self.session_id {
            Some(id) => SessionId::from_string(id.clone()),
            None => Ok(SessionId::new()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    healthcare_mcp::observability::init_tracing();

    let cli = Cli::parse();
    let mut config = Config::from_env();
    let command = cli.command.unwrap_or(Command::Stdio(CommonArgs {
        cache_ttl: None,
        session_id: std::env::var("HEALTHCARE_MCP_SESSION_ID").ok(),
    }));
    let session = match &command {
        Command::Stdio(common) | Command::Http { common, .. } => common.session()?,
    };
    match &command {
        Command::Stdio(common) => common.apply(&mut config),
        Command::Http { port, host, common } => {
            common.apply(&mut config);
            if let Some(port) = port {
                config.server.port = *port;
            }
            if let Some(host) = host {
                config.server.host = host.clone();
            }
        }
    }

    let upstream = Arc::new(HttpUpstream::new(&config.upstream)?);
    let dispatcher = Arc::new(Dispatcher::with_parts(
        &config,
        upstream,
        Arc::new(EnvelopeCache::new(config.cache.default_ttl_secs)),
        Arc::new(UsageTracker::new()),
        session,
    )?);

    let mut sweeper = CacheSweeper::new(Arc::clone(dispatcher.cache()), config.cache.sweep_interval);
    sweeper.start();

    match command {
        Command::Stdio(_) => {
            transport::serve_stdio(dispatcher, tokio::io::stdin(), tokio::io::stdout()).await?;
        }
        Command::Http { .. } => {
            let shutdown = CancellationToken::new();
            let trigger = shutdown.clone();
            tokio::spawn(async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        tracing::info!("shutdown_signal_received");
                        trigger.cancel();
                    }
                    Err(err) => tracing::warn!(error = %err, "ctrl_c handler unavailable"),
                }
            });
            transport::serve_http(dispatcher, &config.server.bind_addr(), shutdown).await?;
        }
    }

    sweeper.stop();
    Ok(())
}
