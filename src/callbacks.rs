//! Concrete callback tables.
//!
//! ## Key Components
//!
//! - [`CallbackTable`]: the four-function bundle (plus an optional cost
//!   function) for callers whose key identity is not the key type's own
//!   `Eq`/`Hash`, or whose keys and values own external resources.
//! - [`DefaultCallbacks`]: identity from `K: Hash + Eq`, teardown by `drop`.
//!
//! ## Example Usage
//!
//! ```rust
//! use opaque_cache::callbacks::CallbackTable;
//! use opaque_cache::traits::CacheCallbacks;
//!
//! // Case-insensitive string keys.
//! let table: CallbackTable<String, u32> = CallbackTable::new(
//!     |k: &String| k.to_ascii_lowercase().bytes().map(u64::from).sum(),
//!     |a: &String, b: &String| a.eq_ignore_ascii_case(b),
//! );
//! assert!(table.equal(&"Swift".to_string(), &"SWIFT".to_string()));
//! ```

use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::marker::PhantomData;

use rustc_hash::FxBuildHasher;

use crate::traits::CacheCallbacks;

type HashFn<K> = Box<dyn Fn(&K) -> u64 + Send + Sync>;
type EqualFn<K> = Box<dyn Fn(&K, &K) -> bool + Send + Sync>;
type DestroyFn<T> = Box<dyn Fn(T) + Send + Sync>;
type CostFn<V> = Box<dyn Fn(&V) -> usize + Send + Sync>;

/// Value-type bundle of hash, equality and destroy functions.
///
/// Destroyers default to dropping; override them with
/// [`with_destroy_key`](Self::with_destroy_key) and
/// [`with_destroy_value`](Self::with_destroy_value).
pub struct CallbackTable<K, V> {
    hash: HashFn<K>,
    equal: EqualFn<K>,
    destroy_key: Option<DestroyFn<K>>,
    destroy_value: Option<DestroyFn<V>>,
    cost: Option<CostFn<V>>,
}

impl<K, V> CallbackTable<K, V> {
    /// Creates a table from a hash and an equality function.
    pub fn new<H, E>(hash: H, equal: E) -> Self
    where
        H: Fn(&K) -> u64 + Send + Sync + 'static,
        E: Fn(&K, &K) -> bool + Send + Sync + 'static,
    {
        Self {
            hash: Box::new(hash),
            equal: Box::new(equal),
            destroy_key: None,
            destroy_value: None,
            cost: None,
        }
    }

    /// Replaces the key destroyer.
    pub fn with_destroy_key<F>(mut self, destroy_key: F) -> Self
    where
        F: Fn(K) + Send + Sync + 'static,
    {
        self.destroy_key = Some(Box::new(destroy_key));
        self
    }

    /// Replaces the value destroyer.
    pub fn with_destroy_value<F>(mut self, destroy_value: F) -> Self
    where
        F: Fn(V) + Send + Sync + 'static,
    {
        self.destroy_value = Some(Box::new(destroy_value));
        self
    }

    /// Sets the function used to compute the (inert) cost of a value.
    pub fn with_cost<F>(mut self, cost: F) -> Self
    where
        F: Fn(&V) -> usize + Send + Sync + 'static,
    {
        self.cost = Some(Box::new(cost));
        self
    }
}

impl<K, V> CacheCallbacks<K, V> for CallbackTable<K, V> {
    fn hash(&self, key: &K) -> u64 {
        (self.hash)(key)
    }

    fn equal(&self, a: &K, b: &K) -> bool {
        (self.equal)(a, b)
    }

    fn destroy_key(&self, key: K) {
        if let Some(destroy) = &self.destroy_key {
            destroy(key);
        }
    }

    fn destroy_value(&self, value: V) {
        if let Some(destroy) = &self.destroy_value {
            destroy(value);
        }
    }

    fn cost(&self, value: &V) -> usize {
        match &self.cost {
            Some(cost) => cost(value),
            None => std::mem::size_of::<V>(),
        }
    }
}

impl<K, V> fmt::Debug for CallbackTable<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackTable")
            .field("custom_destroy_key", &self.destroy_key.is_some())
            .field("custom_destroy_value", &self.destroy_value.is_some())
            .field("custom_cost", &self.cost.is_some())
            .finish_non_exhaustive()
    }
}

/// Callbacks derived from the key type's own `Hash` and `Eq`.
///
/// Hashing uses `FxHash`; keys and values are simply dropped on destroy.
pub struct DefaultCallbacks<K, V> {
    hasher: FxBuildHasher,
    _marker: PhantomData<fn(K, V)>,
}

impl<K, V> DefaultCallbacks<K, V> {
    /// Creates callbacks backed by `K: Hash + Eq` and `FxHash`.
    pub fn new() -> Self {
        Self {
            hasher: FxBuildHasher,
            _marker: PhantomData,
        }
    }
}

impl<K, V> Default for DefaultCallbacks<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Clone for DefaultCallbacks<K, V> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for DefaultCallbacks<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DefaultCallbacks")
    }
}

impl<K, V> CacheCallbacks<K, V> for DefaultCallbacks<K, V>
where
    K: Hash + Eq,
{
    fn hash(&self, key: &K) -> u64 {
        self.hasher.hash_one(key)
    }

    fn equal(&self, a: &K, b: &K) -> bool {
        a == b
    }
}
