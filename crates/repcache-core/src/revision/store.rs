use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::{debug, warn};

/// Bumped after a workout day is marked complete.
pub const WORKOUT_COMPLETIONS: &str = "workoutCompletions";

/// Bumped after a routine is created, edited or activated.
pub const ROUTINE_EDITS: &str = "routineEdits";

type Listener = Arc<dyn Fn(u64) + Send + Sync>;

#[derive(Default)]
struct Inner {
    counters: HashMap<String, u64>,
    listeners: HashMap<String, Vec<(u64, Listener)>>,
    next_listener_id: u64,
}

/// Bank of named, monotonically increasing revision counters.
///
/// Any code path that performs a successful write bumps the counter of the
/// domain it touched. Readers never look at timestamps: a cached value is
/// stale exactly when one of the counters it was keyed on has moved.
///
/// Clone is cheap and every clone observes the same counters.
#[derive(Clone, Default)]
pub struct RevisionStore {
    inner: Arc<Mutex<Inner>>,
}

impl RevisionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Increment `name` by one and notify its subscribers before returning.
    pub fn bump(&self, name: &str) -> u64 {
        let (value, listeners) = {
            let mut inner = self.lock();
            let counter = inner.counters.entry(name.to_string()).or_insert(0);
            *counter += 1;
            let value = *counter;
            (value, inner.listeners_for(name))
        };

        debug!(revision = name, value, listeners = listeners.len(), "Revision bumped");
        notify(name, value, listeners);
        value
    }

    /// Current value of `name`, 0 if it was never bumped.
    pub fn get(&self, name: &str) -> u64 {
        self.lock().counters.get(name).copied().unwrap_or(0)
    }

    /// Read several counters at once, in the order given.
    pub fn snapshot(&self, names: &[&str]) -> Vec<u64> {
        let inner = self.lock();
        names
            .iter()
            .map(|name| inner.counters.get(*name).copied().unwrap_or(0))
            .collect()
    }

    /// Register `listener` to be called with the new value on every bump of `name`.
    ///
    /// The listener stays registered for as long as the returned handle lives.
    pub fn subscribe<F>(&self, name: &str, listener: F) -> Subscription
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        let mut inner = self.lock();
        let id = inner.next_listener_id;
        inner.next_listener_id += 1;
        inner
            .listeners
            .entry(name.to_string())
            .or_default()
            .push((id, Arc::new(listener)));

        Subscription {
            store: Arc::downgrade(&self.inner),
            name: name.to_string(),
            id,
        }
    }

    /// Zero every counter, run `settle`, then tell the subscribers of every
    /// counter that was non-zero that it is back to 0.
    ///
    /// Only an application-level reset (logout) may do this. `settle` runs
    /// after the counters are zeroed but before any listener, so listeners
    /// that re-read never see entries cached under the old counters.
    pub(crate) fn reset<F: FnOnce()>(&self, settle: F) {
        let notices: Vec<(String, Vec<Listener>)> = {
            let mut inner = self.lock();
            let counters = std::mem::take(&mut inner.counters);
            counters
                .into_keys()
                .map(|name| {
                    let listeners = inner.listeners_for(&name);
                    (name, listeners)
                })
                .collect()
        };
        debug!(revisions = notices.len(), "Revision counters reset");

        settle();

        for (name, listeners) in notices {
            notify(&name, 0, listeners);
        }
    }
}

impl Inner {
    fn listeners_for(&self, name: &str) -> Vec<Listener> {
        self.listeners
            .get(name)
            .map(|list| list.iter().map(|(_, l)| Arc::clone(l)).collect())
            .unwrap_or_default()
    }
}

/// Called outside the lock so listeners may read or bump the store.
fn notify(name: &str, value: u64, listeners: Vec<Listener>) {
    for listener in listeners {
        if panic::catch_unwind(AssertUnwindSafe(|| listener(value))).is_err() {
            warn!(revision = name, value, "Revision listener panicked");
        }
    }
}

impl std::fmt::Debug for RevisionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevisionStore")
            .field("counters", &self.lock().counters)
            .finish()
    }
}

/// Handle returned by [`RevisionStore::subscribe`]. Dropping it unsubscribes.
#[must_use = "dropping a Subscription immediately unsubscribes the listener"]
pub struct Subscription {
    store: Weak<Mutex<Inner>>,
    name: String,
    id: u64,
}

impl Subscription {
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(store) = self.store.upgrade() else {
            return;
        };
        let mut inner = store.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(list) = inner.listeners.get_mut(&self.name) {
            list.retain(|(id, _)| *id != self.id);
            if list.is_empty() {
                inner.listeners.remove(&self.name);
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    #[test]
    fn test_unknown_counter_is_zero() {
        let store = RevisionStore::new();
        assert_eq!(store.get(WORKOUT_COMPLETIONS), 0);
    }

    #[test]
    fn test_bump_increments_by_one() {
        let store = RevisionStore::new();
        assert_eq!(store.bump(ROUTINE_EDITS), 1);
        assert_eq!(store.bump(ROUTINE_EDITS), 2);
        assert_eq!(store.get(ROUTINE_EDITS), 2);
        assert_eq!(store.get(WORKOUT_COMPLETIONS), 0);
    }

    #[test]
    fn test_clones_share_counters() {
        let store = RevisionStore::new();
        let other = store.clone();
        other.bump(WORKOUT_COMPLETIONS);
        assert_eq!(store.get(WORKOUT_COMPLETIONS), 1);
    }

    #[test]
    fn test_snapshot_preserves_order() {
        let store = RevisionStore::new();
        store.bump(ROUTINE_EDITS);
        store.bump(ROUTINE_EDITS);
        store.bump(WORKOUT_COMPLETIONS);
        assert_eq!(store.snapshot(&[WORKOUT_COMPLETIONS, ROUTINE_EDITS, "other"]), vec![1, 2, 0]);
    }

    #[test]
    fn test_subscriber_sees_new_value_before_bump_returns() {
        let store = RevisionStore::new();
        let seen = Arc::new(AtomicU64::new(0));
        let seen_in_listener = Arc::clone(&seen);
        let _sub = store.subscribe(WORKOUT_COMPLETIONS, move |value| {
            seen_in_listener.store(value, Ordering::SeqCst);
        });

        store.bump(WORKOUT_COMPLETIONS);
        assert_eq!(seen.load(Ordering::SeqCst), 1);

        // Other names don't reach this listener
        store.bump(ROUTINE_EDITS);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let store = RevisionStore::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_listener = Arc::clone(&calls);
        let sub = store.subscribe(ROUTINE_EDITS, move |_| {
            calls_in_listener.fetch_add(1, Ordering::SeqCst);
        });

        store.bump(ROUTINE_EDITS);
        sub.unsubscribe();
        store.bump(ROUTINE_EDITS);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.get(ROUTINE_EDITS), 2);
    }

    #[test]
    fn test_panicking_listener_does_not_block_others() {
        let store = RevisionStore::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let _bad = store.subscribe(ROUTINE_EDITS, |_| panic!("listener failure"));
        let calls_in_listener = Arc::clone(&calls);
        let _good = store.subscribe(ROUTINE_EDITS, move |_| {
            calls_in_listener.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(store.bump(ROUTINE_EDITS), 1);
        assert_eq!(store.bump(ROUTINE_EDITS), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(store.get(ROUTINE_EDITS), 2);
    }

    #[test]
    fn test_listener_can_read_store() {
        let store = RevisionStore::new();
        let observed = Arc::new(AtomicU64::new(0));
        let observed_in_listener = Arc::clone(&observed);
        let reader = store.clone();
        let _sub = store.subscribe(WORKOUT_COMPLETIONS, move |_| {
            observed_in_listener.store(reader.get(WORKOUT_COMPLETIONS), Ordering::SeqCst);
        });

        store.bump(WORKOUT_COMPLETIONS);
        assert_eq!(observed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reset_zeroes_counters() {
        let store = RevisionStore::new();
        store.bump(ROUTINE_EDITS);
        store.bump(WORKOUT_COMPLETIONS);
        store.reset(|| {});
        assert_eq!(store.get(ROUTINE_EDITS), 0);
        assert_eq!(store.bump(WORKOUT_COMPLETIONS), 1);
    }

    #[test]
    fn test_reset_notifies_moved_counters_after_settle() {
        let store = RevisionStore::new();
        store.bump(WORKOUT_COMPLETIONS);
        store.bump(WORKOUT_COMPLETIONS);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_in_listener = Arc::clone(&seen);
        let _completions = store.subscribe(WORKOUT_COMPLETIONS, move |value| {
            seen_in_listener.lock().unwrap().push(format!("completions={}", value));
        });
        let untouched = Arc::new(AtomicUsize::new(0));
        let untouched_in_listener = Arc::clone(&untouched);
        let _edits = store.subscribe(ROUTINE_EDITS, move |_| {
            untouched_in_listener.fetch_add(1, Ordering::SeqCst);
        });

        let seen_in_settle = Arc::clone(&seen);
        store.reset(move || seen_in_settle.lock().unwrap().push("settled".to_string()));

        assert_eq!(*seen.lock().unwrap(), vec!["settled", "completions=0"]);
        // Never bumped, so nothing changed for it
        assert_eq!(untouched.load(Ordering::SeqCst), 0);
    }
}
