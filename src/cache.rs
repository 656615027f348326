//! The synchronized opaque cache.
//!
//! ## Architecture
//!
//! ```text
//!   ┌───────────────────────────────────────────────────────────────────────┐
//!   │ Cache<K, V, C>                                                        │
//!   │                                                                       │
//!   │   name ───────────── diagnostics only (tracing field, error text)     │
//!   │   callbacks: Arc<C>  shared with every value cell                     │
//!   │                                                                       │
//!   │   state: InstanceLock<CacheState>                                     │
//!   │     ├── Live(EntryTable<K, Arc<ValueCell>>)                           │
//!   │     └── Destroyed                                                     │
//!   └───────────────────────────────────────────────────────────────────────┘
//!
//!   set(k, v)      lock ─► hash(k) ─► remove equal(k) ─► destroy old ─► insert
//!   get(k)         lock ─► hash(k) ─► find equal(k)   ─► retain value
//!   remove(k)      lock ─► hash(k) ─► remove equal(k) ─► destroy
//!   remove_all()   lock ─► drain                      ─► destroy each
//!   destroy()      lock ─► drain ─► Destroyed         ─► destroy each
//! ```
//!
//! ## Instance States
//!
//! | State       | Reached by          | Operations                              |
//! |-------------|---------------------|-----------------------------------------|
//! | live        | `create` / `new`    | all                                     |
//! | destroyed   | `destroy()`         | every call returns `CacheError::Destroyed` |
//!
//! Dropping a live cache evacuates it exactly like `destroy()`.
//!
//! ## Concurrency
//!
//! One lock per instance serializes `set`, `get`, `contains`, `remove`,
//! `remove_all` and `destroy`; there is no reader/writer split. Operations
//! are linearizable per instance and unordered across instances. Nothing
//! times out: a contended acquire blocks the caller until the holder is done.
//!
//! Callbacks run under the lock. A callback that re-enters its own instance
//! gets `CacheError::Reentrant` instead of deadlocking.
//!
//! ## Example Usage
//!
//! ```rust
//! use opaque_cache::cache::Cache;
//!
//! let cache: Cache<u64, &str> = Cache::new("example");
//! cache.set(1, "a").unwrap();
//! cache.set(2, "b").unwrap();
//!
//! assert_eq!(cache.get(&1).unwrap().as_deref(), Some(&"a"));
//! assert!(cache.remove(&1).unwrap());
//! assert!(cache.get(&1).unwrap().is_none());
//!
//! cache.destroy().unwrap();
//! assert!(cache.get(&2).is_err());
//! ```

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::{debug, trace, warn};

use crate::builder::CacheConfig;
use crate::callbacks::DefaultCallbacks;
use crate::error::{CacheError, InvariantError};
use crate::lock::{InstanceGuard, InstanceLock};
use crate::store::handle::{CacheValue, ValueCell};
use crate::store::table::EntryTable;
use crate::traits::CacheCallbacks;

type Slot<K, V, C> = Arc<ValueCell<K, V, C>>;

enum CacheState<K, V, C>
where
    C: CacheCallbacks<K, V>,
{
    Live(EntryTable<K, Slot<K, V, C>>),
    Destroyed,
}

/// Key/value cache whose identity and teardown come from `C`.
///
/// Keys and values are owned by the cache while stored. `destroy_key` runs
/// as soon as a key leaves the cache; `destroy_value` runs once the value has
/// left the cache *and* every [`CacheValue`] retaining it has been released.
pub struct Cache<K, V, C = DefaultCallbacks<K, V>>
where
    C: CacheCallbacks<K, V>,
{
    name: String,
    callbacks: Arc<C>,
    state: InstanceLock<CacheState<K, V, C>>,
}

impl<K, V> Cache<K, V, DefaultCallbacks<K, V>>
where
    K: Hash + Eq,
{
    /// Creates an empty cache keyed by `K`'s own `Hash` and `Eq`.
    pub fn new(name: impl Into<String>) -> Self {
        Self::create(name, DefaultCallbacks::new())
    }
}

impl<K, V, C> Cache<K, V, C>
where
    C: CacheCallbacks<K, V>,
{
    /// Creates an empty cache bound to `callbacks`.
    ///
    /// Never fails; allocation failure aborts the process.
    pub fn create(name: impl Into<String>, callbacks: C) -> Self {
        Self::with_config(CacheConfig::new(name), callbacks)
    }

    /// Creates an empty cache from a [`CacheConfig`].
    pub fn with_config(config: CacheConfig, callbacks: C) -> Self {
        let state = InstanceLock::new(CacheState::Live(EntryTable::with_capacity(
            config.initial_capacity,
        )));
        debug!(
            cache = %config.name,
            id = state.id(),
            initial_capacity = config.initial_capacity,
            "created cache"
        );
        Self {
            name: config.name,
            callbacks: Arc::new(callbacks),
            state,
        }
    }

    /// Diagnostic name given at creation.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The callback table this instance is bound to.
    pub fn callbacks(&self) -> &C {
        &self.callbacks
    }

    /// Inserts or replaces the entry for `key`.
    ///
    /// The cost passed along is [`CacheCallbacks::cost`] of `value`; see
    /// [`set_with_cost`](Self::set_with_cost).
    pub fn set(&self, key: K, value: V) -> Result<(), CacheError> {
        let cost = self.callbacks.cost(&value);
        self.set_with_cost(key, value, cost)
    }

    /// Inserts or replaces the entry for `key` with an explicit cost.
    ///
    /// If an equivalent key is present, its key is destroyed and its value
    /// released before the new pair is stored. `cost` is currently inert:
    /// there is no eviction policy, so it is only traced.
    ///
    /// When the call is rejected, `key` and `value` are handed straight to
    /// the destroy callbacks.
    pub fn set_with_cost(&self, key: K, value: V, cost: usize) -> Result<(), CacheError> {
        let mut guard = match self.lock("set") {
            Ok(guard) => guard,
            Err(err) => return Err(self.reject(key, value, err)),
        };
        let CacheState::Live(table) = &mut *guard else {
            let err = self.destroyed_error("set");
            return Err(self.reject(key, value, err));
        };

        let callbacks = &*self.callbacks;
        let hash = callbacks.hash(&key);
        let replaced = table.remove(hash, |stored| callbacks.equal(stored, &key));
        let was_present = replaced.is_some();
        if let Some((old_key, old_cell)) = replaced {
            callbacks.destroy_key(old_key);
            drop(old_cell);
        }
        let cell = ValueCell::new(value, Arc::clone(&self.callbacks), self.state.id());
        table.insert_unique(hash, key, cell);
        trace!(hash, cost, replaced = was_present, "set entry");
        Ok(())
    }

    /// Looks up `key` and retains its value.
    ///
    /// Returns `Ok(None)` when no equivalent key is present. The value stays
    /// alive until the returned handle is released, even if the entry is
    /// replaced or removed in the meantime.
    pub fn get(&self, key: &K) -> Result<Option<CacheValue<K, V, C>>, CacheError> {
        self.with_table("get", |table, callbacks| {
            let hash = callbacks.hash(key);
            let found = table
                .find(hash, |stored| callbacks.equal(stored, key))
                .map(CacheValue::retain);
            trace!(hash, hit = found.is_some(), "get entry");
            found
        })
    }

    /// Looks up `key` and returns an owned clone of its value.
    pub fn get_cloned(&self, key: &K) -> Result<Option<V>, CacheError>
    where
        V: Clone,
    {
        self.with_table("get", |table, callbacks| {
            let hash = callbacks.hash(key);
            table
                .find(hash, |stored| callbacks.equal(stored, key))
                .map(|cell| cell.value().clone())
        })
    }

    /// Returns `true` if an equivalent key is present.
    pub fn contains(&self, key: &K) -> Result<bool, CacheError> {
        self.with_table("contains", |table, callbacks| {
            let hash = callbacks.hash(key);
            table
                .find(hash, |stored| callbacks.equal(stored, key))
                .is_some()
        })
    }

    /// Removes the entry for `key`, destroying its key and releasing its
    /// value. Returns whether anything was removed.
    pub fn remove(&self, key: &K) -> Result<bool, CacheError> {
        self.with_table("remove", |table, callbacks| {
            let hash = callbacks.hash(key);
            match table.remove(hash, |stored| callbacks.equal(stored, key)) {
                Some((old_key, old_cell)) => {
                    callbacks.destroy_key(old_key);
                    drop(old_cell);
                    trace!(hash, "removed entry");
                    true
                },
                None => false,
            }
        })
    }

    /// Removes every entry, destroying keys and releasing values.
    pub fn remove_all(&self) -> Result<(), CacheError> {
        self.with_table("remove_all", |table, callbacks| {
            let evicted = evacuate(table, callbacks);
            debug!(evicted, "cleared cache");
        })
    }

    /// Evacuates every entry and moves the instance to the destroyed state.
    ///
    /// Later calls, including a second `destroy`, return
    /// [`CacheError::Destroyed`]. Values still retained by readers are
    /// destroyed when their last handle is released.
    pub fn destroy(&self) -> Result<(), CacheError> {
        let mut guard = self.lock("destroy")?;
        let state = std::mem::replace(&mut *guard, CacheState::Destroyed);
        match state {
            CacheState::Live(mut table) => {
                let evicted = evacuate(&mut table, &*self.callbacks);
                debug!(cache = %self.name, id = self.state.id(), evicted, "destroyed cache");
                Ok(())
            },
            CacheState::Destroyed => Err(self.destroyed_error("destroy")),
        }
    }

    /// Releases a value obtained from [`get`](Self::get).
    ///
    /// Equivalent to dropping the handle, except that misuse is reported:
    /// [`CacheError::ForeignValue`] if the handle was retained from another
    /// instance, [`CacheError::Destroyed`] if this instance has been
    /// destroyed. The handle is released in every case, outside the lock, so
    /// a deferred `destroy_value` still runs.
    pub fn release_value(&self, value: CacheValue<K, V, C>) -> Result<(), CacheError> {
        let owner = value.owner();
        let destroyed = self
            .lock("release_value")
            .map(|guard| matches!(*guard, CacheState::Destroyed));
        drop(value);

        if owner != self.state.id() {
            warn!(cache = %self.name, owner, "released value from another cache");
            return Err(CacheError::ForeignValue {
                name: self.name.clone(),
            });
        }
        if destroyed? {
            return Err(self.destroyed_error("release_value"));
        }
        Ok(())
    }

    /// Number of entries currently stored.
    pub fn len(&self) -> Result<usize, CacheError> {
        self.with_table("len", |table, _| table.len())
    }

    /// Returns `true` if no entries are stored.
    pub fn is_empty(&self) -> Result<bool, CacheError> {
        self.with_table("is_empty", |table, _| table.is_empty())
    }

    /// Returns `true` once [`destroy`](Self::destroy) has completed.
    ///
    /// Fails only when called from one of this instance's own callbacks.
    pub fn is_destroyed(&self) -> Result<bool, CacheError> {
        let guard = self.lock("is_destroyed")?;
        Ok(matches!(*guard, CacheState::Destroyed))
    }

    /// Verifies that the table honors the callback contract: every key still
    /// hashes to the hash it was filed under and no two stored keys are equal.
    ///
    /// A destroyed cache trivially passes.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let guard = self
            .lock("check_invariants")
            .map_err(|err| InvariantError::new(err.to_string()))?;
        let CacheState::Live(table) = &*guard else {
            return Ok(());
        };

        let mut by_hash: FxHashMap<u64, Vec<&K>> = FxHashMap::default();
        for (hash, key, _) in table.iter() {
            if self.callbacks.hash(key) != hash {
                return Err(InvariantError::new(format!(
                    "key filed under hash {hash} no longer hashes there"
                )));
            }
            let peers = by_hash.entry(hash).or_default();
            if peers.iter().any(|other| self.callbacks.equal(key, other)) {
                return Err(InvariantError::new(format!(
                    "duplicate key filed under hash {hash}"
                )));
            }
            peers.push(key);
        }
        Ok(())
    }

    fn lock(
        &self,
        op: &'static str,
    ) -> Result<InstanceGuard<'_, CacheState<K, V, C>>, CacheError> {
        self.state.lock().ok_or_else(|| {
            warn!(cache = %self.name, op, "rejected reentrant call from a callback");
            CacheError::Reentrant {
                name: self.name.clone(),
            }
        })
    }

    fn with_table<R>(
        &self,
        op: &'static str,
        f: impl FnOnce(&mut EntryTable<K, Slot<K, V, C>>, &C) -> R,
    ) -> Result<R, CacheError> {
        let mut guard = self.lock(op)?;
        match &mut *guard {
            CacheState::Live(table) => Ok(f(table, &*self.callbacks)),
            CacheState::Destroyed => Err(self.destroyed_error(op)),
        }
    }

    fn reject(&self, key: K, value: V, err: CacheError) -> CacheError {
        self.callbacks.destroy_key(key);
        self.callbacks.destroy_value(value);
        err
    }

    fn destroyed_error(&self, op: &'static str) -> CacheError {
        warn!(cache = %self.name, op, "rejected call on destroyed cache");
        CacheError::Destroyed {
            name: self.name.clone(),
        }
    }
}

/// Drains `table`, destroying each key and releasing each value in turn.
fn evacuate<K, V, C>(table: &mut EntryTable<K, Slot<K, V, C>>, callbacks: &C) -> usize
where
    C: CacheCallbacks<K, V>,
{
    let mut count = 0;
    for (key, cell) in table.drain() {
        callbacks.destroy_key(key);
        drop(cell);
        count += 1;
    }
    count
}

impl<K, V, C> Drop for Cache<K, V, C>
where
    C: CacheCallbacks<K, V>,
{
    fn drop(&mut self) {
        if let CacheState::Live(table) = self.state.get_mut() {
            let evicted = evacuate(table, &*self.callbacks);
            debug!(cache = %self.name, evicted, "dropped live cache");
        }
    }
}

impl<K, V, C> fmt::Debug for Cache<K, V, C>
where
    C: CacheCallbacks<K, V>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("name", &self.name)
            .field("id", &self.state.id())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{OnceLock, Weak};

    use parking_lot::Mutex;

    use super::*;
    use crate::callbacks::CallbackTable;

    /// Callback table that records every destroy call.
    fn recording(log: &Arc<Mutex<Vec<String>>>) -> CallbackTable<u64, String> {
        let keys = Arc::clone(log);
        let values = Arc::clone(log);
        CallbackTable::<u64, String>::new(|k| *k, |a, b| a == b)
            .with_destroy_key(move |k| keys.lock().push(format!("key:{k}")))
            .with_destroy_value(move |v| values.lock().push(format!("value:{v}")))
    }

    fn new_log() -> Arc<Mutex<Vec<String>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    // ==============================================
    // Basic Operations
    // ==============================================

    mod basic_operations {
        use super::*;

        #[test]
        fn integer_keys_scenario() {
            let cache = Cache::create(
                "scenario",
                CallbackTable::<u64, &str>::new(|x| *x, |a, b| a == b),
            );
            cache.set(1, "a").unwrap();
            cache.set(2, "b").unwrap();

            assert_eq!(*cache.get(&1).unwrap().unwrap(), "a");
            assert!(cache.remove(&1).unwrap());
            assert!(cache.get(&1).unwrap().is_none());
            assert_eq!(*cache.get(&2).unwrap().unwrap(), "b");

            cache.destroy().unwrap();
            assert!(matches!(cache.get(&2), Err(CacheError::Destroyed { .. })));
            assert!(matches!(cache.set(3, "c"), Err(CacheError::Destroyed { .. })));
            assert!(matches!(cache.remove(&2), Err(CacheError::Destroyed { .. })));
            assert!(matches!(cache.remove_all(), Err(CacheError::Destroyed { .. })));
            assert!(matches!(cache.destroy(), Err(CacheError::Destroyed { .. })));
            assert!(matches!(cache.len(), Err(CacheError::Destroyed { .. })));
        }

        #[test]
        fn default_callbacks_use_eq_and_hash() {
            let cache: Cache<String, u32> = Cache::new("strings");
            cache.set("one".to_string(), 1).unwrap();
            assert_eq!(cache.get_cloned(&"one".to_string()).unwrap(), Some(1));
            assert!(cache.contains(&"one".to_string()).unwrap());
            assert!(!cache.contains(&"two".to_string()).unwrap());
            assert_eq!(cache.len().unwrap(), 1);
            assert_eq!(cache.name(), "strings");
        }

        #[test]
        fn empty_cache_reports_empty() {
            let cache: Cache<u8, u8> = Cache::new("empty");
            assert!(cache.is_empty().unwrap());
            assert_eq!(cache.len().unwrap(), 0);
            assert!(!cache.is_destroyed().unwrap());
        }

        #[test]
        fn debug_names_the_instance() {
            let cache: Cache<u8, u8> = Cache::new("dbg");
            let dbg = format!("{cache:?}");
            assert!(dbg.contains("Cache"));
            assert!(dbg.contains("dbg"));
        }
    }

    // ==============================================
    // Destroy Callback Accounting
    // ==============================================

    mod destroy_accounting {
        use super::*;

        #[test]
        fn replace_destroys_old_pair_only() {
            let log = new_log();
            let cache = Cache::create("replace", recording(&log));

            cache.set(1, "v1".to_string()).unwrap();
            cache.set(1, "v2".to_string()).unwrap();

            assert_eq!(*log.lock(), vec!["key:1", "value:v1"]);
            assert_eq!(cache.len().unwrap(), 1);
            assert_eq!(cache.get_cloned(&1).unwrap().as_deref(), Some("v2"));
        }

        #[test]
        fn replace_uses_callback_equality() {
            let log = new_log();
            let keys = Arc::clone(&log);
            let callbacks = CallbackTable::<u64, &str>::new(|k| *k % 10, |a, b| a % 10 == b % 10)
                .with_destroy_key(move |k| keys.lock().push(format!("key:{k}")));
            let cache = Cache::create("mod10", callbacks);

            cache.set(3, "three").unwrap();
            cache.set(13, "thirteen").unwrap();

            assert_eq!(*log.lock(), vec!["key:3"]);
            assert_eq!(cache.len().unwrap(), 1);
            assert_eq!(cache.get_cloned(&23).unwrap(), Some("thirteen"));
        }

        #[test]
        fn remove_destroys_once_then_absent() {
            let log = new_log();
            let cache = Cache::create("remove", recording(&log));

            cache.set(5, "five".to_string()).unwrap();
            assert!(cache.remove(&5).unwrap());
            assert_eq!(*log.lock(), vec!["key:5", "value:five"]);
            assert!(cache.get(&5).unwrap().is_none());

            assert!(!cache.remove(&5).unwrap());
            assert_eq!(log.lock().len(), 2);
        }

        #[test]
        fn remove_on_empty_cache_invokes_nothing() {
            let log = new_log();
            let cache = Cache::create("idle", recording(&log));
            assert!(!cache.remove(&42).unwrap());
            assert!(log.lock().is_empty());
        }

        #[test]
        fn remove_all_destroys_each_entry_once() {
            let log = new_log();
            let cache = Cache::create("bulk", recording(&log));
            for i in 0..4 {
                cache.set(i, format!("v{i}")).unwrap();
            }

            cache.remove_all().unwrap();
            let mut entries = log.lock().clone();
            entries.sort();
            assert_eq!(
                entries,
                vec![
                    "key:0", "key:1", "key:2", "key:3", "value:v0", "value:v1", "value:v2",
                    "value:v3",
                ]
            );
            for i in 0..4 {
                assert!(cache.get(&i).unwrap().is_none());
            }
            assert!(cache.is_empty().unwrap());

            cache.set(9, "again".to_string()).unwrap();
            assert_eq!(cache.len().unwrap(), 1);
        }

        #[test]
        fn destroy_evacuates_then_rejects() {
            let log = new_log();
            let cache = Cache::create("teardown", recording(&log));
            cache.set(1, "a".to_string()).unwrap();
            cache.set(2, "b".to_string()).unwrap();

            cache.destroy().unwrap();
            assert_eq!(log.lock().len(), 4);
            assert!(cache.is_destroyed().unwrap());
            assert_eq!(
                cache.set(3, "c".to_string()),
                Err(CacheError::Destroyed {
                    name: "teardown".into()
                })
            );
            assert_eq!(log.lock().len(), 4);
        }

        #[test]
        fn rejected_set_hands_pair_to_destroyers() {
            let log = new_log();
            let cache = Cache::create("closed", recording(&log));
            cache.destroy().unwrap();

            assert!(cache.set(4, "late".to_string()).is_err());
            assert_eq!(*log.lock(), vec!["key:4", "value:late"]);
        }

        #[test]
        fn drop_evacuates_live_cache() {
            let log = new_log();
            {
                let cache = Cache::create("scoped", recording(&log));
                cache.set(1, "a".to_string()).unwrap();
            }
            assert_eq!(*log.lock(), vec!["key:1", "value:a"]);
        }

        #[test]
        fn drop_after_destroy_does_not_double_destroy() {
            let log = new_log();
            {
                let cache = Cache::create("once", recording(&log));
                cache.set(1, "a".to_string()).unwrap();
                cache.destroy().unwrap();
            }
            assert_eq!(log.lock().len(), 2);
        }
    }

    // ==============================================
    // Retain / Release
    // ==============================================

    mod retain_release {
        use super::*;

        #[test]
        fn retained_value_survives_replace() {
            let log = new_log();
            let cache = Cache::create("retain", recording(&log));
            cache.set(1, "old".to_string()).unwrap();

            let held = cache.get(&1).unwrap().unwrap();
            cache.set(1, "new".to_string()).unwrap();

            assert_eq!(*log.lock(), vec!["key:1"]);
            assert_eq!(*held, "old");

            cache.release_value(held).unwrap();
            assert_eq!(*log.lock(), vec!["key:1", "value:old"]);
        }

        #[test]
        fn retained_value_survives_remove_and_destroy() {
            let log = new_log();
            let cache = Cache::create("retain", recording(&log));
            cache.set(1, "kept".to_string()).unwrap();

            let held = cache.get(&1).unwrap().unwrap();
            assert_eq!(CacheValue::retain_count(&held), 2);
            cache.remove(&1).unwrap();
            assert_eq!(CacheValue::retain_count(&held), 1);
            cache.destroy().unwrap();
            assert_eq!(*log.lock(), vec!["key:1"]);

            drop(held);
            assert_eq!(*log.lock(), vec!["key:1", "value:kept"]);
        }

        #[test]
        fn release_after_destroy_reports_but_still_destroys() {
            let log = new_log();
            let cache = Cache::create("closed", recording(&log));
            cache.set(1, "late".to_string()).unwrap();

            let held = cache.get(&1).unwrap().unwrap();
            cache.destroy().unwrap();
            assert_eq!(*log.lock(), vec!["key:1"]);

            assert_eq!(
                cache.release_value(held),
                Err(CacheError::Destroyed {
                    name: "closed".into()
                })
            );
            assert_eq!(*log.lock(), vec!["key:1", "value:late"]);
        }

        #[test]
        fn retained_value_outlives_the_cache() {
            let log = new_log();
            let held = {
                let cache = Cache::create("short", recording(&log));
                cache.set(1, "orphan".to_string()).unwrap();
                cache.get(&1).unwrap().unwrap()
            };
            assert_eq!(*log.lock(), vec!["key:1"]);
            assert_eq!(*held, "orphan");
            drop(held);
            assert_eq!(*log.lock(), vec!["key:1", "value:orphan"]);
        }

        #[test]
        fn release_while_cached_destroys_nothing() {
            let log = new_log();
            let cache = Cache::create("cached", recording(&log));
            cache.set(1, "stay".to_string()).unwrap();

            let held = cache.get(&1).unwrap().unwrap();
            cache.release_value(held).unwrap();
            assert!(log.lock().is_empty());
            assert_eq!(cache.get_cloned(&1).unwrap().as_deref(), Some("stay"));
        }

        #[test]
        fn release_against_wrong_cache_is_reported() {
            let a: Cache<u8, u8> = Cache::new("a");
            let b: Cache<u8, u8> = Cache::new("b");
            a.set(1, 10).unwrap();

            let held = a.get(&1).unwrap().unwrap();
            assert_eq!(
                b.release_value(held),
                Err(CacheError::ForeignValue { name: "b".into() })
            );
            assert_eq!(a.get_cloned(&1).unwrap(), Some(10));
        }
    }

    // ==============================================
    // Reentrancy
    // ==============================================

    mod reentrancy {
        use super::*;

        type SelfCache = Cache<u64, u64, CallbackTable<u64, u64>>;

        #[test]
        fn callback_reentering_its_cache_fails_fast() {
            let slot: Arc<OnceLock<Weak<SelfCache>>> = Arc::new(OnceLock::new());
            let observed: Arc<Mutex<Vec<CacheError>>> = Arc::new(Mutex::new(Vec::new()));

            let cb_slot = Arc::clone(&slot);
            let cb_observed = Arc::clone(&observed);
            let callbacks = CallbackTable::<u64, u64>::new(|k| *k, |a, b| a == b)
                .with_destroy_key(move |k| {
                    if let Some(cache) = cb_slot.get().and_then(Weak::upgrade) {
                        if let Err(err) = cache.get(&k) {
                            cb_observed.lock().push(err);
                        }
                    }
                });

            let cache = Arc::new(Cache::create("self", callbacks));
            slot.set(Arc::downgrade(&cache)).unwrap();

            cache.set(1, 100).unwrap();
            assert!(cache.remove(&1).unwrap());

            assert_eq!(
                *observed.lock(),
                vec![CacheError::Reentrant {
                    name: "self".into()
                }]
            );
            // Still usable afterwards.
            cache.set(2, 200).unwrap();
            assert_eq!(cache.get_cloned(&2).unwrap(), Some(200));
        }

        #[test]
        fn callback_may_use_another_cache() {
            let side: Arc<Cache<u64, u64>> = Arc::new(Cache::new("side"));
            let side_cb = Arc::clone(&side);
            let callbacks = CallbackTable::<u64, u64>::new(|k| *k, |a, b| a == b)
                .with_destroy_value(move |v| side_cb.set(v, v).unwrap());
            let main = Cache::create("main", callbacks);

            main.set(1, 7).unwrap();
            main.remove(&1).unwrap();
            assert_eq!(side.get_cloned(&7).unwrap(), Some(7));
        }
    }

    // ==============================================
    // Cost
    // ==============================================

    mod cost {
        use super::*;

        #[test]
        fn cost_has_no_effect_on_storage() {
            let cache: Cache<u64, u64> = Cache::new("costly");
            cache.set_with_cost(1, 1, 0).unwrap();
            cache.set_with_cost(2, 2, usize::MAX).unwrap();
            assert_eq!(cache.len().unwrap(), 2);
            assert_eq!(cache.get_cloned(&2).unwrap(), Some(2));
        }
    }

    // ==============================================
    // Invariants
    // ==============================================

    mod invariants {
        use super::*;

        #[test]
        fn invariants_hold_with_colliding_hashes() {
            let cache = Cache::create(
                "collide",
                CallbackTable::<u64, u64>::new(|_| 0, |a, b| a == b),
            );
            for i in 0..32 {
                cache.set(i, i).unwrap();
            }
            cache.set(5, 55).unwrap();
            cache.remove(&7).unwrap();
            cache.check_invariants().unwrap();
            assert_eq!(cache.len().unwrap(), 31);
            assert_eq!(cache.get_cloned(&5).unwrap(), Some(55));
        }

        #[test]
        fn destroyed_cache_passes_invariants() {
            let cache: Cache<u8, u8> = Cache::new("gone");
            cache.destroy().unwrap();
            cache.check_invariants().unwrap();
        }
    }
}
