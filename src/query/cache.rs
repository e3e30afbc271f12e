//! Time-to-live cache with tracked expiry timers.
//!
//! Each insert schedules an expiry task on the current tokio runtime. Timer
//! handles are kept alongside the entries so a bulk [`TtlCache::clear`] (or
//! dropping the cache) cancels every pending expiry. Reads also check the
//! entry age, so correctness never depends on a timer having fired.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

struct CacheState<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    timers: HashMap<K, JoinHandle<()>>,
}

impl<K, V> Default for CacheState<K, V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            timers: HashMap::new(),
        }
    }
}

/// Key → value map whose entries expire after a fixed TTL.
pub struct TtlCache<K, V> {
    state: Arc<Mutex<CacheState<K, V>>>,
    ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(CacheState::default())),
            ttl,
        }
    }

    /// Return a copy of a live entry.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut state = self.lock();
        let expired = match state.entries.get(key) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => {
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            state.entries.remove(key);
            if let Some(timer) = state.timers.remove(key) {
                timer.abort();
            }
        }
        None
    }

    /// Store a value and schedule its expiry.
    pub fn insert(&self, key: K, value: V) {
        let inserted_at = Instant::now();
        let mut state = self.lock();

        if let Some(previous) = state.timers.remove(&key) {
            previous.abort();
        }
        state.entries.insert(key.clone(), CacheEntry { value, inserted_at });

        // Without a runtime, expiry falls back to the age check in `get`.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let weak = Arc::downgrade(&self.state);
            let ttl = self.ttl;
            let timer_key = key.clone();
            let timer = handle.spawn(async move {
                tokio::time::sleep(ttl).await;
                expire(&weak, &timer_key, inserted_at);
            });
            state.timers.insert(key, timer);
        }
    }

    /// Drop every entry and cancel all pending expiry timers.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        for (_, timer) in state.timers.drain() {
            timer.abort();
        }
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of expiry timers not yet fired or cancelled.
    pub fn pending_timers(&self) -> usize {
        self.lock()
            .timers
            .values()
            .filter(|timer| !timer.is_finished())
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, CacheState<K, V>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Remove `key` if it still holds the entry the timer was scheduled for.
fn expire<K, V>(state: &Weak<Mutex<CacheState<K, V>>>, key: &K, inserted_at: Instant)
where
    K: Eq + Hash,
{
    let Some(state) = state.upgrade() else {
        return;
    };
    let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
    if state
        .entries
        .get(key)
        .is_some_and(|entry| entry.inserted_at == inserted_at)
    {
        state.entries.remove(key);
        state.timers.remove(key);
    }
}

impl<K, V> Drop for TtlCache<K, V> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        for (_, timer) in state.timers.drain() {
            timer.abort();
        }
    }
}
