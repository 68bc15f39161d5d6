use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::runtime::Handle;
use tracing::debug;

use super::FetchKey;
use crate::cache::{CacheEntry, EntityCache};
use crate::error::SyncError;
use crate::revision::RevisionStore;

type Outcome<T, E> = Shared<BoxFuture<'static, Result<T, SyncError<E>>>>;

struct InFlight<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    id: u64,
    outcome: Outcome<T, E>,
}

type Registry<T, E> = Arc<Mutex<HashMap<FetchKey, InFlight<T, E>>>>;

/// How a single `resolve` call treats the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Skip the cache-hit shortcut (pull-to-refresh). Still joins an
    /// in-flight fetch for the same key.
    pub force: bool,
    /// On a cache hit, return the cached value and refresh it in the background.
    pub revalidate: bool,
}

impl ResolveOptions {
    pub fn cache_first() -> Self {
        Self::default()
    }

    pub fn forced() -> Self {
        Self {
            force: true,
            ..Self::default()
        }
    }

    pub fn stale_while_revalidate() -> Self {
        Self {
            revalidate: true,
            ..Self::default()
        }
    }
}

enum Lookup<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    Cached(T),
    Pending(Outcome<T, E>),
}

/// Removes its registry entry when the fetch task finishes, fails or panics.
struct InFlightSlot<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    registry: Registry<T, E>,
    key: FetchKey,
    id: u64,
}

impl<T, E> Drop for InFlightSlot<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn drop(&mut self) {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        // A newer fetch may own the key after invalidate_all
        if registry.get(&self.key).is_some_and(|entry| entry.id == self.id) {
            registry.remove(&self.key);
        }
    }
}

/// Turns "give me entity X" into a settled value for one entity family.
///
/// Keys combine a logical id with the current values of the revision
/// counters the entity depends on. A stored value is served as long as its
/// key is still current; concurrent callers asking for the same key share a
/// single fetch; results are written back before any waiter resumes.
///
/// Fetches run on spawned tasks and always complete, even if every caller
/// stops waiting. Clone is cheap and clones share all state.
pub struct FetchCoordinator<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    family: &'static str,
    revisions: RevisionStore,
    cache: Arc<EntityCache<T>>,
    in_flight: Registry<T, E>,
    next_fetch_id: Arc<AtomicU64>,
}

impl<T, E> Clone for FetchCoordinator<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            family: self.family,
            revisions: self.revisions.clone(),
            cache: Arc::clone(&self.cache),
            in_flight: Arc::clone(&self.in_flight),
            next_fetch_id: Arc::clone(&self.next_fetch_id),
        }
    }
}

impl<T, E> FetchCoordinator<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    /// Create a coordinator for one entity family. `family` only labels logs.
    pub fn new(family: &'static str, revisions: RevisionStore) -> Self {
        Self {
            family,
            revisions,
            cache: Arc::new(EntityCache::new()),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            next_fetch_id: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn family(&self) -> &'static str {
        self.family
    }

    pub fn cache(&self) -> &EntityCache<T> {
        &self.cache
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, HashMap<FetchKey, InFlight<T, E>>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Key for `logical_id` at the current revision values.
    pub fn key_for(
        &self,
        logical_id: &str,
        revision_names: &[&str],
    ) -> Result<FetchKey, SyncError<E>> {
        let values = self.revisions.snapshot(revision_names);
        let components: Vec<(&str, u64)> = revision_names.iter().copied().zip(values).collect();
        FetchKey::build(logical_id, &components).map_err(SyncError::InvalidKey)
    }

    /// Resolve an entity, from cache when its key is current, otherwise by
    /// starting or joining the single fetch for that key.
    ///
    /// `fetch` is called at most once, synchronously and while the registry
    /// is locked, so it must only build the future and not touch this
    /// coordinator itself. The future it returns may do anything.
    pub async fn resolve<F, Fut>(
        &self,
        logical_id: &str,
        revision_names: &[&str],
        fetch: F,
        options: ResolveOptions,
    ) -> Result<T, SyncError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let key = self.key_for(logical_id, revision_names)?;

        match self.lookup_or_start(key, fetch, options)? {
            Lookup::Cached(value) => Ok(value),
            Lookup::Pending(outcome) => outcome.await,
        }
    }

    fn lookup_or_start<F, Fut>(
        &self,
        key: FetchKey,
        fetch: F,
        options: ResolveOptions,
    ) -> Result<Lookup<T, E>, SyncError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        // Cache check, join and start all happen under this lock. A settling
        // fetch writes the cache before it takes the lock to leave the
        // registry, so a miss here can't race with a fetch that just finished.
        let mut in_flight = self.lock_in_flight();

        if !options.force {
            if let Some(entry) = self.cache.get(key.as_str()) {
                if options.revalidate && !in_flight.contains_key(&key) {
                    debug!(family = self.family, key = %key, "Cache hit, revalidating in background");
                    // Nobody awaits this; the spawned task stores the result
                    if let Err(e) = self.start(&mut in_flight, key, fetch) {
                        debug!(family = self.family, error = %e, "Background revalidation not started");
                    }
                } else {
                    debug!(family = self.family, key = %key, "Cache hit");
                }
                return Ok(Lookup::Cached(entry.value));
            }
        }

        if let Some(existing) = in_flight.get(&key) {
            debug!(family = self.family, key = %key, force = options.force, "Joining in-flight fetch");
            return Ok(Lookup::Pending(existing.outcome.clone()));
        }

        debug!(family = self.family, key = %key, force = options.force, "Starting fetch");
        self.start(&mut in_flight, key, fetch).map(Lookup::Pending)
    }

    fn start<F, Fut>(
        &self,
        in_flight: &mut HashMap<FetchKey, InFlight<T, E>>,
        key: FetchKey,
        fetch: F,
    ) -> Result<Outcome<T, E>, SyncError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        // Checked before the slot exists and before `fetch` is called: a
        // failed spawn must not drop a slot while the registry lock is held
        let runtime = Handle::try_current().map_err(|e| SyncError::NoRuntime(e.to_string()))?;
        let fetch = fetch();
        let id = self.next_fetch_id.fetch_add(1, Ordering::Relaxed);
        let generation = self.cache.generation();
        let cache = Arc::clone(&self.cache);
        let family = self.family;
        let slot = InFlightSlot {
            registry: Arc::clone(&self.in_flight),
            key: key.clone(),
            id,
        };

        // On a multi-threaded runtime the task can finish before the entry is
        // inserted below; its slot then blocks on the registry lock we hold
        // until the insert is done, so the entry is still removed.
        let task = runtime.spawn(async move {
            let result = fetch.await;
            match &result {
                Ok(value) => {
                    let stored = cache.set_if_generation(generation, slot.key.as_str(), value.clone());
                    debug!(family, key = %slot.key, stored, "Fetch succeeded");
                }
                Err(e) => {
                    debug!(family, key = %slot.key, error = %e, "Fetch failed");
                }
            }
            drop(slot);
            result
        });

        let outcome = async move {
            match task.await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(e)) => Err(SyncError::Fetch(Arc::new(e))),
                Err(join_error) => Err(SyncError::Aborted(join_error.to_string())),
            }
        }
        .boxed()
        .shared();

        in_flight.insert(
            key,
            InFlight {
                id,
                outcome: outcome.clone(),
            },
        );
        Ok(outcome)
    }

    /// The stored entry for the current key, without fetching.
    pub fn cached(
        &self,
        logical_id: &str,
        revision_names: &[&str],
    ) -> Result<Option<CacheEntry<T>>, SyncError<E>> {
        let key = self.key_for(logical_id, revision_names)?;
        Ok(self.cache.get(key.as_str()))
    }

    pub fn is_in_flight(
        &self,
        logical_id: &str,
        revision_names: &[&str],
    ) -> Result<bool, SyncError<E>> {
        let key = self.key_for(logical_id, revision_names)?;
        Ok(self.lock_in_flight().contains_key(&key))
    }

    pub fn in_flight_count(&self) -> usize {
        self.lock_in_flight().len()
    }

    /// Drop the stored entry for the current key.
    pub fn invalidate(&self, logical_id: &str, revision_names: &[&str]) -> Result<(), SyncError<E>> {
        let key = self.key_for(logical_id, revision_names)?;
        self.cache.clear(key.as_str());
        Ok(())
    }

    /// Drop every stored entry and forget in-flight fetches.
    ///
    /// Forgotten fetches still settle for the callers already waiting on
    /// them, but their results are not stored and new callers start afresh.
    pub fn invalidate_all(&self) {
        let mut in_flight = self.lock_in_flight();
        self.cache.clear_all();
        let detached = in_flight.len();
        in_flight.clear();
        debug!(family = self.family, detached, "Cache invalidated");
    }
}

// ============================================================================
// Tests
// ============================================================================
