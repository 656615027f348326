//! Retained value handles.
//!
//! Every value stored in a cache lives in a reference-counted cell. The cache
//! owns one reference; each [`CacheValue`] returned by
//! [`Cache::get`](crate::cache::Cache::get) owns another. The value's
//! `destroy_value` callback runs exactly once, when the last reference goes
//! away, so a concurrent `set` or `remove` can never destroy a value out from
//! under a reader.
//!
//! ## Architecture
//!
//! ```text
//!                 ┌──────────────────────────────┐
//!                 │        ValueCell<K, V, C>     │
//!                 │   value: ManuallyDrop<V>      │
//!                 │   callbacks: Arc<C>           │
//!                 │   owner: instance id          │
//!                 └──────────────┬───────────────┘
//!                                │ Arc
//!          ┌─────────────────────┼──────────────────────┐
//!          ▼                     ▼                      ▼
//!   ┌──────────────┐     ┌──────────────┐       ┌──────────────┐
//!   │ EntryTable   │     │ CacheValue   │  ...  │ CacheValue   │
//!   │ (the cache)  │     │ (reader 1)   │       │ (reader n)   │
//!   └──────────────┘     └──────────────┘       └──────────────┘
//!
//!   remove / replace:  table drops its Arc      ─┐
//!   release / drop:    reader drops its Arc     ─┴─► last one runs destroy_value
//! ```
//!
//! ## Lifecycle
//!
//! | Event                                  | Who runs `destroy_value`        |
//! |----------------------------------------|---------------------------------|
//! | entry removed, no reader holds it      | the cache, under its lock       |
//! | entry removed while retained           | the last reader, on release     |
//! | reader releases, entry still cached    | nobody (cache still owns it)    |
//!
//! The cell shares ownership of the callbacks, so deferred destruction stays
//! valid after the cache instance itself has been destroyed or dropped.

use std::fmt;
use std::marker::PhantomData;
use std::mem::ManuallyDrop;
use std::ops::Deref;
use std::sync::Arc;

use tracing::trace;

use crate::traits::CacheCallbacks;

/// Shared cell holding one cached value.
pub(crate) struct ValueCell<K, V, C>
where
    C: CacheCallbacks<K, V>,
{
    value: ManuallyDrop<V>,
    callbacks: Arc<C>,
    owner: u64,
    _key: PhantomData<fn(K)>,
}

impl<K, V, C> ValueCell<K, V, C>
where
    C: CacheCallbacks<K, V>,
{
    /// Wrap `value` for the cache instance `owner`.
    pub(crate) fn new(value: V, callbacks: Arc<C>, owner: u64) -> Arc<Self> {
        Arc::new(Self {
            value: ManuallyDrop::new(value),
            callbacks,
            owner,
            _key: PhantomData,
        })
    }

    pub(crate) fn value(&self) -> &V {
        &self.value
    }
}

impl<K, V, C> Drop for ValueCell<K, V, C>
where
    C: CacheCallbacks<K, V>,
{
    fn drop(&mut self) {
        // SAFETY: `drop` runs once and `value` is not touched afterwards.
        let value = unsafe { ManuallyDrop::take(&mut self.value) };
        trace!(owner = self.owner, "destroying cached value");
        self.callbacks.destroy_value(value);
    }
}

/// A value retained from a cache.
///
/// Dereferences to the cached value. Dropping the handle, or passing it to
/// [`Cache::release_value`](crate::cache::Cache::release_value), releases the
/// retain; if the entry has already left the cache, the value is destroyed at
/// that point.
///
/// Cloning a `CacheValue` retains the value once more.
pub struct CacheValue<K, V, C>
where
    C: CacheCallbacks<K, V>,
{
    cell: Arc<ValueCell<K, V, C>>,
}

impl<K, V, C> CacheValue<K, V, C>
where
    C: CacheCallbacks<K, V>,
{
    pub(crate) fn retain(cell: &Arc<ValueCell<K, V, C>>) -> Self {
        Self {
            cell: Arc::clone(cell),
        }
    }

    /// Returns the number of live references to the value, counting the
    /// cache's own reference while the entry is still cached.
    pub fn retain_count(this: &Self) -> usize {
        Arc::strong_count(&this.cell)
    }

    /// Returns `true` if both handles retain the same stored value.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.cell, &b.cell)
    }

    pub(crate) fn owner(&self) -> u64 {
        self.cell.owner
    }
}

impl<K, V, C> Deref for CacheValue<K, V, C>
where
    C: CacheCallbacks<K, V>,
{
    type Target = V;

    fn deref(&self) -> &V {
        self.cell.value()
    }
}

impl<K, V, C> AsRef<V> for CacheValue<K, V, C>
where
    C: CacheCallbacks<K, V>,
{
    fn as_ref(&self) -> &V {
        self.cell.value()
    }
}

impl<K, V, C> Clone for CacheValue<K, V, C>
where
    C: CacheCallbacks<K, V>,
{
    fn clone(&self) -> Self {
        Self::retain(&self.cell)
    }
}

impl<K, V, C> fmt::Debug for CacheValue<K, V, C>
where
    V: fmt::Debug,
    C: CacheCallbacks<K, V>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CacheValue").field(self.cell.value()).finish()
    }
}
