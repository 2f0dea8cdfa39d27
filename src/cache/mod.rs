//! Response cache.
//!
//! - **Keys**: deterministic SHA-256 digests of a prefix plus call arguments
//! - **Store**: `Arc`-sharing TTL map with lazy expiry and hit/miss stats
//! - **Sweeper**: background task reclaiming expired entries

mod key;
mod store;
mod sweeper;

pub use key::{CacheKey, KeyArg};
pub use store::{CacheStats, ResponseCache};
pub use sweeper::CacheSweeper;

/// The cache every tool shares: finished response envelopes.
pub type EnvelopeCache = ResponseCache<crate::envelope::Envelope>;
