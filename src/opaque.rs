//! Type-erased keys and values.
//!
//! [`OpaqueRef`] is an owned, boxed `Any`. A cache over `OpaqueRef` keys and
//! values ([`OpaqueCache`]) never knows what it stores: hashing, identity and
//! teardown all come from the [`CallbackTable`] it was created with, and
//! callbacks downcast to whatever concrete types their owner put in.
//!
//! ## Example Usage
//!
//! ```rust
//! use opaque_cache::callbacks::CallbackTable;
//! use opaque_cache::opaque::{OpaqueCache, OpaqueRef};
//!
//! let callbacks = CallbackTable::<OpaqueRef, OpaqueRef>::new(
//!     |k| k.downcast_ref::<u64>().copied().unwrap_or_default(),
//!     |a, b| {
//!         matches!(
//!             (a.downcast_ref::<u64>(), b.downcast_ref::<u64>()),
//!             (Some(x), Some(y)) if x == y
//!         )
//!     },
//! );
//! let cache = OpaqueCache::create("erased", callbacks);
//!
//! cache.set(OpaqueRef::new(7u64), OpaqueRef::new("seven")).unwrap();
//! let value = cache.get(&OpaqueRef::new(7u64)).unwrap().unwrap();
//! assert_eq!(value.downcast_ref::<&str>(), Some(&"seven"));
//! ```

use std::any::{Any, TypeId};
use std::fmt;

use crate::cache::Cache;
use crate::callbacks::CallbackTable;

/// Cache whose keys and values are type-erased handles.
pub type OpaqueCache = Cache<OpaqueRef, OpaqueRef, CallbackTable<OpaqueRef, OpaqueRef>>;

/// Owned handle to a value of any `Send + Sync` type.
pub struct OpaqueRef(Box<dyn Any + Send + Sync>);

impl OpaqueRef {
    /// Erase `value`.
    pub fn new<T>(value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        Self(Box::new(value))
    }

    /// Returns `true` if the handle holds a `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.0.is::<T>()
    }

    /// Borrow the contents as `T`, if that is what the handle holds.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// Recover the contents as `T`, or give the handle back unchanged.
    pub fn into_inner<T: Any>(self) -> Result<T, Self> {
        self.0.downcast::<T>().map(|boxed| *boxed).map_err(Self)
    }

    /// `TypeId` of the erased contents.
    pub fn type_id_of(&self) -> TypeId {
        (*self.0).type_id()
    }
}

impl fmt::Debug for OpaqueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OpaqueRef").field(&self.type_id_of()).finish()
    }
}
