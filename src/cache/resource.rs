//! Generic resource cache with singleflight and negative memoization.
//!
//! Every resource cache (fonts, styles, images, template nodes) shares this
//! shape:
//!
//! - Resolved values and failures are both cached. A failure becomes a
//!   negative marker that short-circuits later lookups for the same key.
//! - Concurrent lookups for the same key share one host call.
//! - [`ResourceCache::clear`] drops every entry, positive and negative. A stale
//!   handle cannot be detected per key without another failing round trip, so
//!   invalidation is always coarse.
//! - The first failure for a key produces one user-facing notification.
//! - A leader that panics or is cancelled releases its waiters, which retry.

use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{Notify, RwLock};
use tracing::{debug, warn};

use super::notify::Notifier;
use crate::error::{HostError, ResourceError, ResourceKind};
use crate::host::ResourceHost;

/// A cached lookup outcome.
#[derive(Debug, Clone)]
enum Entry<V> {
    Resolved(V),
    Negative(String),
}

/// State shared between the leader of a lookup and the tasks waiting on it.
struct InFlight<V> {
    notify: Notify,
    result: Mutex<Option<Result<V, ResourceError>>>,
}

impl<V: Clone> InFlight<V> {
    fn result(&self) -> Option<Result<V, ResourceError>> {
        lock(&self.result).clone()
    }
}

/// Owned by the leader of a lookup. Dropping it unregisters the lookup and
/// wakes every waiter, whether the leader finished, panicked or was cancelled.
struct LeaderGuard<'a, K: Eq + Hash, V> {
    in_flight: &'a Mutex<HashMap<K, Arc<InFlight<V>>>>,
    key: &'a K,
    state: Arc<InFlight<V>>,
}

impl<K: Eq + Hash, V> Drop for LeaderGuard<'_, K, V> {
    fn drop(&mut self) {
        {
            let mut in_flight = lock(self.in_flight);
            if in_flight
                .get(self.key)
                .is_some_and(|current| Arc::ptr_eq(current, &self.state))
            {
                in_flight.remove(self.key);
            }
        }
        self.state.notify.notify_waiters();
    }
}

/// The maps are never left half-updated, so a poisoned lock is still usable.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct ResourceCache<K, V> {
    kind: ResourceKind,

    /// Resolved values and negative markers
    entries: RwLock<HashMap<K, Entry<V>>>,

    /// Lookups currently running against the host
    in_flight: Mutex<HashMap<K, Arc<InFlight<V>>>>,

    /// Bumped by `clear` so lookups started earlier do not repopulate the cache
    generation: AtomicU64,

    notifier: Arc<Notifier>,
}

impl<K, V> ResourceCache<K, V>
where
    K: Clone + Eq + Hash + Display + Send + Sync,
    V: Clone + Send + Sync,
{
    pub fn new(kind: ResourceKind, notifier: Arc<Notifier>) -> Self {
        Self {
            kind,
            entries: RwLock::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
            notifier,
        }
    }

    /// Return the cached value for `key`, or resolve it through `resolve`.
    ///
    /// A memoized failure returns [`ResourceError::Memoized`] without calling
    /// the host. If another task is already resolving `key`, this waits for its
    /// result instead of starting a second host call. When that task dies
    /// before producing a result, one of the waiters takes over.
    pub async fn get_or_resolve<H, F, Fut>(
        &self,
        key: &K,
        host: &H,
        resolve: F,
    ) -> Result<V, ResourceError>
    where
        H: ResourceHost + ?Sized,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, HostError>>,
    {
        let mut resolve = Some(resolve);

        loop {
            // Fast path: resolved or memoized failure
            if let Some(entry) = self.entries.read().await.get(key) {
                return self.entry_result(key, entry);
            }

            // Slow path: join an in-flight lookup or become its leader
            let (state, is_leader) = {
                let mut in_flight = lock(&self.in_flight);
                match in_flight.get(key) {
                    Some(state) => (state.clone(), false),
                    None => {
                        let state = Arc::new(InFlight {
                            notify: Notify::new(),
                            result: Mutex::new(None),
                        });
                        in_flight.insert(key.clone(), state.clone());
                        (state, true)
                    }
                }
            };

            if !is_leader {
                let notified = state.notify.notified();
                tokio::pin!(notified);
                // Register before checking the result so a completion between
                // the check and the await is not missed.
                notified.as_mut().enable();

                if let Some(result) = state.result() {
                    return result;
                }
                notified.await;
                if let Some(result) = state.result() {
                    return result;
                }
                // The leader went away without a result; retry
                continue;
            }

            let guard = LeaderGuard {
                in_flight: &self.in_flight,
                key,
                state,
            };
            let Some(resolve) = resolve.take() else {
                // Only reachable if a leader is elected twice in one call.
                continue;
            };

            let generation = self.generation.load(Ordering::SeqCst);
            let outcome = resolve().await;

            let result = match outcome {
                Ok(value) => Ok(value),
                Err(e) => Err(ResourceError::Unresolved {
                    kind: self.kind,
                    key: key.to_string(),
                    reason: e.to_string(),
                }),
            };

            {
                let mut entries = self.entries.write().await;
                if self.generation.load(Ordering::SeqCst) == generation {
                    let entry = match &result {
                        Ok(value) => Entry::Resolved(value.clone()),
                        Err(e) => Entry::Negative(failure_reason(e)),
                    };
                    entries.insert(key.clone(), entry);
                }
            }

            *lock(&guard.state.result) = Some(result.clone());
            drop(guard);

            if let Err(ref e) = result {
                warn!(kind = %self.kind, key = %key, "Resource resolution failed: {}", e);
                self.notifier.notify_once(
                    host,
                    &format!("{}:{}", self.kind, key),
                    &format!("Could not load {} \"{}\"", self.kind, key),
                );
            }

            return result;
        }
    }

    fn entry_result(&self, key: &K, entry: &Entry<V>) -> Result<V, ResourceError> {
        match entry {
            Entry::Resolved(value) => Ok(value.clone()),
            Entry::Negative(reason) => Err(ResourceError::Memoized {
                kind: self.kind,
                key: key.to_string(),
                reason: reason.clone(),
            }),
        }
    }

    /// Drop every entry, positive and negative.
    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        self.generation.fetch_add(1, Ordering::SeqCst);
        debug!(kind = %self.kind, entries = entries.len(), "Clearing resource cache");
        entries.clear();
    }

    /// Number of cached entries, including negative markers.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Number of memoized failures.
    pub async fn negative_count(&self) -> usize {
        self.entries
            .read()
            .await
            .values()
            .filter(|entry| matches!(entry, Entry::Negative(_)))
            .count()
    }
}

fn failure_reason(error: &ResourceError) -> String {
    match error {
        ResourceError::Unresolved { reason, .. } | ResourceError::Memoized { reason, .. } => {
            reason.clone()
        }
    }
}
