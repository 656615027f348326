//! # Callback Contract
//!
//! A cache instance never looks inside its keys or values. Identity, hashing
//! and teardown are delegated to a [`CacheCallbacks`] implementation that is
//! bound to the instance once, at creation, and shared by every entry.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                        CacheCallbacks<K, V>                          │
//!   │                                                                      │
//!   │   hash(&K) → u64              must agree with equal()                │
//!   │   equal(&K, &K) → bool        defines key identity                   │
//!   │   destroy_key(K)              key leaves the cache                   │
//!   │   destroy_value(V)            last reference to a value goes away    │
//!   │   cost(&V) → usize            inert, defaults to size_of::<V>()      │
//!   └───────────────────────────────┬──────────────────────────────────────┘
//!                                   │
//!              ┌────────────────────┴─────────────────────┐
//!              ▼                                          ▼
//!   ┌──────────────────────────┐              ┌──────────────────────────┐
//!   │   CallbackTable<K, V>    │              │   DefaultCallbacks<K, V> │
//!   │   four boxed functions   │              │   K: Hash + Eq, drop     │
//!   └──────────────────────────┘              └──────────────────────────┘
//! ```
//!
//! ## Rules for Implementors
//!
//! | Rule                         | Consequence of breaking it                  |
//! |------------------------------|---------------------------------------------|
//! | `equal(a, b)` ⇒ same hash    | duplicates per equivalence class            |
//! | cheap and non-blocking       | every caller of the instance stalls         |
//! | never touch a cache instance | same instance: `CacheError::Reentrant`      |
//! | handle own failures          | nothing is surfaced through the cache       |
//!
//! `hash`, `equal` and `destroy_key` always run while the instance lock is
//! held. `destroy_value` runs under the lock when the cache owns the last
//! reference to the value, and on the releasing thread (outside any cache
//! lock) when a retained [`CacheValue`](crate::store::handle::CacheValue) is
//! the last one out.

use std::mem;

/// Caller-supplied identity and teardown operations for one cache instance.
///
/// The cache calls into this trait and never the other way around. Each
/// instance owns its callbacks for as long as any of its keys or values is
/// alive, including values still retained by readers after
/// [`Cache::destroy`](crate::cache::Cache::destroy).
pub trait CacheCallbacks<K, V> {
    /// Hash a key. Keys that compare equal must hash equal.
    fn hash(&self, key: &K) -> u64;

    /// Decide whether two keys name the same entry.
    fn equal(&self, a: &K, b: &K) -> bool;

    /// Release whatever backs `key` once it has left the cache.
    fn destroy_key(&self, key: K) {
        drop(key);
    }

    /// Release whatever backs `value` once nothing references it any more.
    fn destroy_value(&self, value: V) {
        drop(value);
    }

    /// Cost reported for `value` when inserted through
    /// [`Cache::set`](crate::cache::Cache::set).
    ///
    /// Costs are accepted and traced but have no effect: the cache has no
    /// eviction policy.
    fn cost(&self, value: &V) -> usize {
        let _ = value;
        mem::size_of::<V>()
    }
}
