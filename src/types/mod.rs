//! Core types shared by every component.
//!
//! - **IDs**: the per-process `SessionId`
//! - **Errors**: application error type with thiserror derives
//! - **Config**: server, cache, upstream and API-key configuration

mod config;
mod errors;
mod ids;

pub use config::{ApiKeys, CacheConfig, Config, Endpoints, ServerConfig, UpstreamConfig};
pub use errors::{Error, Result};
pub use ids::SessionId;
