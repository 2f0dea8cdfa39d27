//! Background expiry sweep.
//!
//! Lazy expiry on `get` already hides stale entries; the sweeper only keeps
//! memory bounded for keys that are never read again.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};

use super::store::ResponseCache;

/// Periodically calls [`ResponseCache::sweep`] until stopped.
#[derive(Debug)]
pub struct CacheSweeper<V> {
    cache: Arc<ResponseCache<V>>,
    interval: Duration,
    stop_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl<V: Send + Sync + 'static> CacheSweeper<V> {
    pub fn new(cache: Arc<ResponseCache<V>>, interval: Duration) -> Self {
        Self {
            cache,
            interval,
            stop_tx: None,
        }
    }

    /// Start the sweep loop in the background.
    /// Returns immediately; sweeping runs in a spawned task.
    pub fn start(&mut self) -> tokio::task::JoinHandle<()> {
        let cache = Arc::clone(&self.cache);
        let period = self.interval;
        let (stop_tx, mut stop_rx) = tokio::sync::oneshot::channel();
        self.stop_tx = Some(stop_tx);

        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = cache.sweep();
                        if removed > 0 {
                            tracing::debug!(removed, remaining = cache.len(), "cache_sweep_completed");
                        }
                    }
                    _ = &mut stop_rx => {
                        tracing::info!("cache_sweeper_stopped");
                        break;
                    }
                }
            }
        })
    }

    /// Stop the sweep loop.
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl<V> Drop for CacheSweeper<V> {
    fn drop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheKey;
    use serde_json::{json, Value};

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_reclaims_expired_entries() {
        let cache: Arc<ResponseCache<Value>> = Arc::new(ResponseCache::new(60));
        cache.set(CacheKey::derive("t", &[&"a"]), json!(1), Some(Duration::from_secs(5)));
        cache.set(CacheKey::derive("t", &[&"b"]), json!(2), None);

        let mut sweeper = CacheSweeper::new(Arc::clone(&cache), Duration::from_secs(10));
        let handle = sweeper.start();

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(cache.len(), 1);

        sweeper.stop();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_ends_task() {
        let cache: Arc<ResponseCache<Value>> = Arc::new(ResponseCache::new(60));
        let mut sweeper = CacheSweeper::new(cache, Duration::from_secs(600));
        let handle = sweeper.start();
        sweeper.stop();
        handle.await.unwrap();
    }
}
