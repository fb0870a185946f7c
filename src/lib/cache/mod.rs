use std::{
    future::Future,
    time::{Duration, Instant},
};

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::*;

/// Hit/miss counters for one cache slot, exposed for observability.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct CacheInfo {
    pub hits: u64,
    pub misses: u64,
    pub last_lookup_was_hit: bool,
    /// Seconds since the cached value was produced, when there is one
    pub age_seconds: Option<f64>,
}

#[derive(Debug)]
struct Slot<T> {
    value: Option<T>,
    last_refresh: Option<Instant>,
    hits: u64,
    misses: u64,
    last_lookup_was_hit: bool,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self {
            value: None,
            last_refresh: None,
            hits: 0,
            misses: 0,
            last_lookup_was_hit: false,
        }
    }
}

/// Single-slot refresh-on-expiry memoizer shielding an expensive read.
///
/// The slot holds the last produced value and the instant it was produced;
/// `get_with` serves it until `ttl` has elapsed, then re-runs the producer.
/// There is no key space: one instance caches exactly one value.
#[derive(Debug)]
pub struct TtlCache<T> {
    name: &'static str,
    ttl: Duration,
    slot: Mutex<Slot<T>>,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            name,
            ttl,
            slot: Mutex::new(Slot::default()),
        }
    }

    /// Return the cached value, refreshing it through `producer` when stale.
    ///
    /// The refresh runs while the slot lock is held, so a burst of concurrent
    /// callers on an expired slot costs a single producer invocation; the
    /// laggards briefly block and then observe the fresh value as a hit.
    /// A failing producer leaves `last_refresh` untouched — errors are never
    /// cached, and the next caller retries immediately.
    pub async fn get_with<F, Fut, E>(&self, producer: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut slot = self.slot.lock().await;

        let fresh = slot
            .last_refresh
            .map(|at| at.elapsed() <= self.ttl)
            .unwrap_or(false);
        if fresh {
            if let Some(value) = slot.value.clone() {
                slot.hits += 1;
                slot.last_lookup_was_hit = true;
                trace!("{} cache hit", self.name);
                return Ok(value);
            }
        }

        slot.misses += 1;
        slot.last_lookup_was_hit = false;
        let value = producer().await?;
        slot.value = Some(value.clone());
        slot.last_refresh = Some(Instant::now());
        debug!("{} cache refreshed", self.name);
        Ok(value)
    }

    pub async fn last_refresh(&self) -> Option<Instant> {
        self.slot.lock().await.last_refresh
    }

    pub async fn info(&self) -> CacheInfo {
        let slot = self.slot.lock().await;
        CacheInfo {
            hits: slot.hits,
            misses: slot.misses,
            last_lookup_was_hit: slot.last_lookup_was_hit,
            age_seconds: slot.last_refresh.map(|at| at.elapsed().as_secs_f64()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use super::*;

    fn counting_producer(
        calls: &Arc<AtomicUsize>,
    ) -> impl Future<Output = Result<usize, String>> {
        let calls = calls.clone();
        async move {
            let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(call)
        }
    }

    #[tokio::test]
    async fn test_second_call_within_ttl_is_a_hit() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = TtlCache::new("test", Duration::from_secs(60));

        let first: Result<usize, String> = cache.get_with(|| counting_producer(&calls)).await;
        let second: Result<usize, String> = cache.get_with(|| counting_producer(&calls)).await;

        assert_eq!(first.unwrap(), 1);
        assert_eq!(second.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let info = cache.info().await;
        assert_eq!((info.hits, info.misses), (1, 1));
        assert!(info.last_lookup_was_hit);
    }

    #[tokio::test]
    async fn test_expiry_triggers_exactly_one_new_invocation() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = TtlCache::new("test", Duration::from_millis(20));

        let _: Result<usize, String> = cache.get_with(|| counting_producer(&calls)).await;
        tokio::time::sleep(Duration::from_millis(40)).await;
        let refreshed: Result<usize, String> = cache.get_with(|| counting_producer(&calls)).await;

        assert_eq!(refreshed.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(!cache.info().await.last_lookup_was_hit);
    }

    #[tokio::test]
    async fn test_producer_error_is_not_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache: TtlCache<usize> = TtlCache::new("test", Duration::from_secs(60));

        let failed = cache
            .get_with(|| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<usize, String>("probe failed".to_string())
                }
            })
            .await;
        assert!(failed.is_err());
        assert!(cache.last_refresh().await.is_none());

        // The slot stayed cold: the next call goes straight to the producer
        let recovered: Result<usize, String> = cache.get_with(|| counting_producer(&calls)).await;
        assert!(recovered.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_miss_invokes_producer_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = TtlCache::new("test", Duration::from_secs(60));

        let slow_producer = || {
            let calls = calls.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(30)).await;
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<usize, String>(42)
            }
        };

        let (a, b, c) = tokio::join!(
            cache.get_with(slow_producer),
            cache.get_with(slow_producer),
            cache.get_with(slow_producer),
        );

        assert_eq!((a.unwrap(), b.unwrap(), c.unwrap()), (42, 42, 42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
