pub use crate::builder::{CacheBuilder, CacheConfig};
pub use crate::cache::Cache;
pub use crate::callbacks::{CallbackTable, DefaultCallbacks};
pub use crate::error::{CacheError, ConfigError, InvariantError};
pub use crate::opaque::{OpaqueCache, OpaqueRef};
pub use crate::store::handle::CacheValue;
pub use crate::traits::CacheCallbacks;
