//! # Healthcare MCP
//!
//! Aggregates public healthcare data APIs (openFDA, PubMed, medRxiv, NCBI
//! Bookshelf, MyHealthfinder, ClinicalTrials.gov, ICD-10-CM) plus two local
//! utilities (BMI, DICOM metadata) behind one tool-call surface:
//! - Uniform success/error envelopes
//! - Shared TTL response cache keyed by tool and normalised arguments
//! - Process-wide usage counters
//! - MCP over stdio and a plain HTTP API
//!
//! ## Architecture
//!
//! ```text
//!   stdio (JSON-RPC) ─┐                 ┌─ ToolContext ─┬─ ResponseCache
//!                     ├─→ Dispatcher ─→ │   (per tool)  ├─ Upstream (reqwest)
//!   HTTP (axum) ──────┘       │         └───────────────┴─ sanitize
//!                             └─→ UsageTracker
//! ```

// Enforce strict safety at compile time
#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

pub mod cache;
pub mod dispatch;
pub mod envelope;
pub mod sanitize;
pub mod tools;
pub mod transport;
pub mod types;
pub mod upstream;
pub mod usage;

// Internal utilities
pub mod observability;

pub use dispatch::{CallOutcome, Dispatcher};
pub use envelope::Envelope;
pub use types::{Config, Error, Result};
