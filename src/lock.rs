//! Per-instance lock with reentrancy detection.
//!
//! Each cache instance serializes every operation through one
//! `parking_lot::Mutex`. Callbacks run while that lock is held, so a callback
//! that calls back into the same instance would self-deadlock. This lock
//! records, per thread, which instances the thread currently holds and
//! refuses a second acquisition up front instead of blocking forever.
//!
//! Holding locks of *different* instances on one thread is allowed (a
//! callback of cache A may use cache B); avoiding lock-order cycles between
//! instances is the caller's responsibility.
//!
//! Once the thread-local registry has been torn down (a cache used from
//! another thread-local's destructor), every acquisition is treated as
//! not-yet-held and goes unrecorded.

use std::cell::RefCell;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, MutexGuard};

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    /// Instance ids whose lock the current thread holds.
    static HELD: RefCell<Vec<u64>> = const { RefCell::new(Vec::new()) };
}

/// Mutex tagged with a process-unique instance id.
#[derive(Debug)]
pub(crate) struct InstanceLock<T> {
    id: u64,
    inner: Mutex<T>,
}

impl<T> InstanceLock<T> {
    pub(crate) fn new(value: T) -> Self {
        Self {
            id: NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed),
            inner: Mutex::new(value),
        }
    }

    /// Process-unique id of this instance.
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Acquire the lock, blocking while another thread holds it.
    ///
    /// Returns `None` if the current thread already holds this lock.
    pub(crate) fn lock(&self) -> Option<InstanceGuard<'_, T>> {
        if self.held_by_current_thread() {
            return None;
        }
        let guard = self.inner.lock();
        let _ = HELD.try_with(|held| held.borrow_mut().push(self.id));
        Some(InstanceGuard {
            id: self.id,
            guard,
        })
    }

    /// Exclusive access without locking; used during teardown.
    pub(crate) fn get_mut(&mut self) -> &mut T {
        self.inner.get_mut()
    }

    fn held_by_current_thread(&self) -> bool {
        HELD.try_with(|held| held.borrow().contains(&self.id))
            .unwrap_or(false)
    }
}

/// RAII guard; unregisters the instance from the current thread on drop.
pub(crate) struct InstanceGuard<'a, T> {
    id: u64,
    guard: MutexGuard<'a, T>,
}

impl<T> Deref for InstanceGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for InstanceGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

impl<T> Drop for InstanceGuard<'_, T> {
    fn drop(&mut self) {
        let _ = HELD.try_with(|held| {
            let mut held = held.borrow_mut();
            if let Some(pos) = held.iter().rposition(|id| *id == self.id) {
                held.swap_remove(pos);
            }
        });
    }
}
