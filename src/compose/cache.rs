// Short-lived scan cache with in-flight de-duplication.
//
// Concurrent callers for the same key share one pending scan future; a finished result is
// served until the TTL passes or the key is invalidated.

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::error::{Error, Result};

type ScanFuture<T> = Shared<BoxFuture<'static, std::result::Result<Arc<T>, Arc<Error>>>>;

enum Slot<T> {
    Ready { at: Instant, value: Arc<T> },
    Pending { generation: u64, future: ScanFuture<T> },
}

pub struct ScanCache<T> {
    ttl: Duration,
    generation: AtomicU64,
    slots: Mutex<HashMap<PathBuf, Slot<T>>>,
}

impl<T: Send + Sync + 'static> ScanCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            generation: AtomicU64::new(0),
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<PathBuf, Slot<T>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cached value for `key`, joining a scan already in flight or starting one with `scan`.
    /// The lock is never held across an await.
    pub async fn get_or_scan<F, Fut>(&self, key: &Path, scan: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let (future, generation) = {
            let mut slots = self.slots();
            let in_flight = match slots.get(key) {
                Some(Slot::Ready { at, value }) if at.elapsed() < self.ttl => {
                    debug!(key = %key.display(), "scan cache hit");
                    return Ok(value.clone());
                }
                Some(Slot::Pending { generation, future }) => Some((future.clone(), *generation)),
                _ => None,
            };
            match in_flight {
                Some(pending) => {
                    debug!(key = %key.display(), "joining in-flight scan");
                    pending
                }
                None => {
                    debug!(key = %key.display(), "scan cache miss");
                    let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
                    let future = scan()
                        .map(|r| r.map(Arc::new).map_err(Arc::new))
                        .boxed()
                        .shared();
                    slots.insert(
                        key.to_path_buf(),
                        Slot::Pending {
                            generation,
                            future: future.clone(),
                        },
                    );
                    (future, generation)
                }
            }
        };

        let result = future.await;

        {
            let mut slots = self.slots();
            let still_current = matches!(
                slots.get(key),
                Some(Slot::Pending { generation: g, .. }) if *g == generation
            );
            if still_current {
                match &result {
                    Ok(value) => {
                        slots.insert(
                            key.to_path_buf(),
                            Slot::Ready {
                                at: Instant::now(),
                                value: value.clone(),
                            },
                        );
                    }
                    Err(_) => {
                        slots.remove(key);
                    }
                }
            }
        }

        result.map_err(Error::Shared)
    }

    /// Drops the entry for `key`. A scan still in flight finishes for its current callers but
    /// its result is not stored.
    pub fn invalidate(&self, key: &Path) {
        if self.slots().remove(key).is_some() {
            debug!(key = %key.display(), "scan cache invalidated");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_scan(
        counter: &Arc<AtomicUsize>,
    ) -> impl FnOnce() -> BoxFuture<'static, Result<usize>> {
        let counter = counter.clone();
        move || {
            async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(counter.fetch_add(1, Ordering::SeqCst) + 1)
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_scan() {
        let cache = ScanCache::new(Duration::from_secs(60));
        let counter = Arc::new(AtomicUsize::new(0));
        let key = Path::new("/projects");
        let (a, b, c) = tokio::join!(
            cache.get_or_scan(key, counting_scan(&counter)),
            cache.get_or_scan(key, counting_scan(&counter)),
            cache.get_or_scan(key, counting_scan(&counter)),
        );
        assert_eq!((*a.unwrap(), *b.unwrap(), *c.unwrap()), (1, 1, 1));
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        // served from cache afterwards
        assert_eq!(*cache.get_or_scan(key, counting_scan(&counter)).await.unwrap(), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalidate_forces_a_rescan() {
        let cache = ScanCache::new(Duration::from_secs(60));
        let counter = Arc::new(AtomicUsize::new(0));
        let key = Path::new("/projects");
        cache.get_or_scan(key, counting_scan(&counter)).await.unwrap();
        cache.invalidate(key);
        assert_eq!(*cache.get_or_scan(key, counting_scan(&counter)).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn expired_entries_rescan() {
        let cache = ScanCache::new(Duration::ZERO);
        let counter = Arc::new(AtomicUsize::new(0));
        let key = Path::new("/projects");
        cache.get_or_scan(key, counting_scan(&counter)).await.unwrap();
        cache.get_or_scan(key, counting_scan(&counter)).await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let cache = ScanCache::new(Duration::from_secs(60));
        let counter = Arc::new(AtomicUsize::new(0));
        cache.get_or_scan(Path::new("/a"), counting_scan(&counter)).await.unwrap();
        cache.get_or_scan(Path::new("/b"), counting_scan(&counter)).await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn errors_are_shared_and_not_cached() {
        let cache: ScanCache<usize> = ScanCache::new(Duration::from_secs(60));
        let key = Path::new("/projects");
        let err = cache
            .get_or_scan(key, || async { Err(Error::invalid("boom")) })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Shared(_)));
        assert_eq!(
            *cache.get_or_scan(key, || async { Ok(7) }).await.unwrap(),
            7
        );
    }
}
