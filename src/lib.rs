//! opaque-cache: a synchronized key/value cache whose key identity, hashing
//! and teardown are supplied by the caller.
//!
//! ## Key Components
//!
//! - [`cache::Cache`]: one lock-guarded table per instance.
//! - [`traits::CacheCallbacks`]: the hash / equal / destroy contract.
//! - [`callbacks::CallbackTable`]: the contract as a bundle of closures.
//! - [`store::handle::CacheValue`]: a retained value that outlives removal.
//! - [`opaque::OpaqueRef`]: type-erased keys and values.
//! - [`builder::CacheBuilder`]: configuration.
//!
//! ## Example Usage
//!
//! ```rust
//! use opaque_cache::prelude::*;
//!
//! let cache = CacheBuilder::new("example").build_default::<u32, String>();
//! cache.set(1, "one".to_string()).unwrap();
//!
//! let held = cache.get(&1).unwrap().unwrap();
//! cache.set(1, "uno".to_string()).unwrap();
//! assert_eq!(*held, "one");
//! cache.release_value(held).unwrap();
//! ```

pub mod builder;
pub mod cache;
pub mod callbacks;
pub mod error;
mod lock;
pub mod opaque;
pub mod prelude;
pub mod store;
pub mod traits;
