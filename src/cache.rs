//! TTL response cache with in-flight request coalescing.
//!
//! Identical concurrent requests share a single upstream call via a
//! [`Shared`] future; completed values are kept until their TTL lapses.
//! Eviction is lazy: an expired entry is discarded the next time its key is
//! requested. Errors are never cached, so a failed computation does not
//! poison the key; they surface as `Arc<GenError>` because every waiter of
//! a coalesced call receives the same error.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;

use crate::error::GenError;
use crate::events::{emit, Event, EventHandler};

type SharedResult<V> = Result<V, Arc<GenError>>;
type InFlight<V> = Shared<BoxFuture<'static, SharedResult<V>>>;

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// A keyed cache of computed values with single-flight semantics.
pub(crate) struct CoalescingCache<V> {
    ttl: Duration,
    entries: Arc<Mutex<HashMap<u64, CacheEntry<V>>>>,
    in_flight: Arc<Mutex<HashMap<u64, InFlight<V>>>>,
}

impl<V: Clone + Send + Sync + 'static> CoalescingCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Arc::new(Mutex::new(HashMap::new())),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Look up `key`, computing it at most once across concurrent callers.
    pub async fn get_or_compute<F>(
        &self,
        key: u64,
        events: &Option<Arc<dyn EventHandler>>,
        compute: F,
    ) -> SharedResult<V>
    where
        F: FnOnce() -> BoxFuture<'static, crate::error::Result<V>>,
    {
        // fresh cached value?
        {
            let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            match entries.get(&key) {
                Some(entry) if entry.expires_at > Instant::now() => {
                    emit(events, Event::CacheHit { key });
                    return Ok(entry.value.clone());
                }
                Some(_) => {
                    entries.remove(&key);
                }
                None => {}
            }
        }

        // join an identical in-flight call, or start one. Retiring the
        // in-flight entry and storing the value happen inside the shared
        // future itself, so they run for whichever waiter drives it to
        // completion; the caller that started it may be dropped mid-flight.
        let (future, joined) = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
            match in_flight.get(&key) {
                Some(shared) => (shared.clone(), true),
                None => {
                    let ttl = self.ttl;
                    let entries = self.entries.clone();
                    let slots = self.in_flight.clone();
                    let inner = compute();
                    let shared: InFlight<V> = async move {
                        let result = inner.await.map_err(Arc::new);
                        if let Ok(value) = &result {
                            let mut entries =
                                entries.lock().unwrap_or_else(|e| e.into_inner());
                            entries.insert(
                                key,
                                CacheEntry {
                                    value: value.clone(),
                                    expires_at: Instant::now() + ttl,
                                },
                            );
                        }
                        slots.lock().unwrap_or_else(|e| e.into_inner()).remove(&key);
                        result
                    }
                    .boxed()
                    .shared();
                    in_flight.insert(key, shared.clone());
                    (shared, false)
                }
            }
        };
        if joined {
            emit(events, Event::CacheCoalesced { key });
        }

        future.await
    }
}

/// Hash anything hashable into a cache key.
pub(crate) fn cache_key(parts: &impl Hash) -> u64 {
    let mut hasher = DefaultHasher::new();
    parts.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_compute(
        calls: &Arc<AtomicUsize>,
        value: &str,
    ) -> BoxFuture<'static, crate::error::Result<String>> {
        calls.fetch_add(1, Ordering::SeqCst);
        let value = value.to_string();
        async move { Ok(value) }.boxed()
    }

    #[tokio::test]
    async fn second_lookup_is_a_hit() {
        let cache: CoalescingCache<String> = CoalescingCache::new(Duration::from_secs(60));
        let calls = Arc::new(AtomicUsize::new(0));

        let a = cache
            .get_or_compute(1, &None, || counting_compute(&calls, "v"))
            .await
            .unwrap();
        let b = cache
            .get_or_compute(1, &None, || counting_compute(&calls, "other"))
            .await
            .unwrap();

        assert_eq!(a, "v");
        assert_eq!(b, "v");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_entry_recomputed() {
        let cache: CoalescingCache<String> = CoalescingCache::new(Duration::from_millis(10));
        let calls = Arc::new(AtomicUsize::new(0));

        cache
            .get_or_compute(1, &None, || counting_compute(&calls, "first"))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        let fresh = cache
            .get_or_compute(1, &None, || counting_compute(&calls, "second"))
            .await
            .unwrap();

        assert_eq!(fresh, "second");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn concurrent_lookups_share_one_computation() {
        let cache: Arc<CoalescingCache<String>> =
            Arc::new(CoalescingCache::new(Duration::from_secs(60)));
        let calls = Arc::new(AtomicUsize::new(0));

        let slow = |calls: Arc<AtomicUsize>| {
            move || {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok("shared".to_string())
                }
                .boxed()
            }
        };

        let c1 = cache.clone();
        let calls1 = calls.clone();
        let t1 = tokio::spawn(async move { c1.get_or_compute(7, &None, slow(calls1)).await });
        let c2 = cache.clone();
        let calls2 = calls.clone();
        let t2 = tokio::spawn(async move { c2.get_or_compute(7, &None, slow(calls2)).await });

        let a = t1.await.unwrap().unwrap();
        let b = t2.await.unwrap().unwrap();
        assert_eq!(a, "shared");
        assert_eq!(b, "shared");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn aborted_initiator_does_not_leak_the_in_flight_slot() {
        let cache: Arc<CoalescingCache<String>> =
            Arc::new(CoalescingCache::new(Duration::from_millis(50)));
        let calls = Arc::new(AtomicUsize::new(0));

        // the caller that starts the computation is aborted mid-flight
        let c = cache.clone();
        let owner_calls = calls.clone();
        let owner = tokio::spawn(async move {
            c.get_or_compute(9, &None, move || {
                owner_calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    tokio::time::sleep(Duration::from_millis(40)).await;
                    Ok("first".to_string())
                }
                .boxed()
            })
            .await
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        owner.abort();
        let _ = owner.await;

        // a later caller joins the pending call and drives it to completion
        let joined = cache
            .get_or_compute(9, &None, || counting_compute(&calls, "second"))
            .await
            .unwrap();
        assert_eq!(joined, "first");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // past the TTL the key is recomputed instead of serving the old
        // value out of a stuck in-flight slot
        tokio::time::sleep(Duration::from_millis(80)).await;
        let fresh = cache
            .get_or_compute(9, &None, || counting_compute(&calls, "third"))
            .await
            .unwrap();
        assert_eq!(fresh, "third");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let cache: CoalescingCache<String> = CoalescingCache::new(Duration::from_secs(60));
        let calls = Arc::new(AtomicUsize::new(0));

        let fail_calls = calls.clone();
        let err = cache
            .get_or_compute(1, &None, move || {
                fail_calls.fetch_add(1, Ordering::SeqCst);
                async move { Err(GenError::Timeout) }.boxed()
            })
            .await
            .unwrap_err();
        assert!(matches!(*err, GenError::Timeout));

        let ok = cache
            .get_or_compute(1, &None, || counting_compute(&calls, "recovered"))
            .await
            .unwrap();
        assert_eq!(ok, "recovered");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn cache_key_is_stable() {
        assert_eq!(cache_key(&("a", 1)), cache_key(&("a", 1)));
        assert_ne!(cache_key(&("a", 1)), cache_key(&("a", 2)));
    }
}
