//! Callback-keyed entry table.
//!
//! ## Architecture
//! - Entries live in a `hashbrown::HashTable`, probed with the *caller's*
//!   hash of the entry key. Each slot remembers that hash, so growing the
//!   table never calls back into the caller.
//! - Identity is decided by a probe closure supplied by the caller (normally
//!   `CacheCallbacks::equal`), never by `K: Eq`. The probe only sees keys
//!   filed under the same hash.
//!
//! ## Core Operations
//! - `find`: locate an entry by hash + probe.
//! - `insert_unique`: add an entry the caller has proven absent.
//! - `remove`: detach an entry by hash + probe.
//! - `drain`: detach every entry at once.
//!
//! ## Performance Trade-offs
//! - O(1) average lookup when the caller's hash spreads well.
//! - A degenerate hash (e.g. constant) turns lookups into a linear probe over
//!   every entry, but never breaks uniqueness.
//!
//! ## Thread Safety
//! - Not synchronized; [`Cache`](crate::cache::Cache) guards it with the
//!   instance lock.

use hashbrown::HashTable;

#[derive(Debug)]
struct Slot<K, T> {
    hash: u64,
    key: K,
    item: T,
}

/// Hash table whose hashing and equality are delegated to the caller.
#[derive(Debug)]
pub(crate) struct EntryTable<K, T> {
    slots: HashTable<Slot<K, T>>,
}

impl<K, T> EntryTable<K, T> {
    /// Create an empty table sized for `capacity` entries.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: HashTable::with_capacity(capacity),
        }
    }

    /// Number of stored entries.
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Find the entry filed under `hash` whose key satisfies `probe`.
    pub(crate) fn find(&self, hash: u64, mut probe: impl FnMut(&K) -> bool) -> Option<&T> {
        self.slots
            .find(hash, |slot| slot.hash == hash && probe(&slot.key))
            .map(|slot| &slot.item)
    }

    /// Add an entry. The caller guarantees no equivalent key is present.
    pub(crate) fn insert_unique(&mut self, hash: u64, key: K, item: T) {
        self.slots
            .insert_unique(hash, Slot { hash, key, item }, |slot| slot.hash);
    }

    /// Detach and return the entry filed under `hash` whose key satisfies
    /// `probe`.
    pub(crate) fn remove(
        &mut self,
        hash: u64,
        mut probe: impl FnMut(&K) -> bool,
    ) -> Option<(K, T)> {
        let (slot, _) = self
            .slots
            .find_entry(hash, |slot| slot.hash == hash && probe(&slot.key))
            .ok()?
            .remove();
        Some((slot.key, slot.item))
    }

    /// Detach every entry, leaving the table empty.
    pub(crate) fn drain(&mut self) -> impl Iterator<Item = (K, T)> + '_ {
        self.slots.drain().map(|slot| (slot.key, slot.item))
    }

    /// Iterate over `(hash, key, item)` triples, `hash` being the one each
    /// entry was filed under.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (u64, &K, &T)> {
        self.slots
            .iter()
            .map(|slot| (slot.hash, &slot.key, &slot.item))
    }
}
