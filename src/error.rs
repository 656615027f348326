//! Error types for the opaque cache.
//!
//! ## Key Components
//!
//! - [`CacheError`]: Returned by cache operations that were issued in a state
//!   where they cannot run (use after destroy, reentry from a callback, or a
//!   retained value released against the wrong instance).
//! - [`ConfigError`]: Returned when builder parameters are invalid.
//! - [`InvariantError`]: Returned by `check_invariants` when the internal
//!   table no longer honors the callback contract.
//!
//! Absent keys are never errors: `get` returns `Ok(None)` and `remove`
//! returns `Ok(false)`.
//!
//! ## Example Usage
//!
//! ```
//! use opaque_cache::cache::Cache;
//! use opaque_cache::error::CacheError;
//!
//! let cache: Cache<u32, &str> = Cache::new("interned");
//! cache.destroy().unwrap();
//!
//! let err = cache.set(1, "a").unwrap_err();
//! assert_eq!(err, CacheError::Destroyed { name: "interned".into() });
//! ```

use thiserror::Error;

// ---------------------------------------------------------------------------
// CacheError
// ---------------------------------------------------------------------------

/// Programming errors detected by a cache instance.
///
/// None of these are transient: retrying the same call in the same state
/// fails the same way.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// The instance was destroyed and accepts no further operations.
    #[error("cache `{name}` has been destroyed")]
    Destroyed { name: String },

    /// A callback tried to enter the instance whose lock its thread holds.
    #[error("cache `{name}` re-entered from one of its own callbacks")]
    Reentrant { name: String },

    /// A retained value was released against an instance that did not
    /// produce it.
    #[error("value released against cache `{name}` was retained from another cache")]
    ForeignValue { name: String },
}

impl CacheError {
    /// Returns the name of the cache that reported the error.
    pub fn cache_name(&self) -> &str {
        match self {
            CacheError::Destroyed { name }
            | CacheError::Reentrant { name }
            | CacheError::ForeignValue { name } => name,
        }
    }
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when cache configuration parameters are invalid.
///
/// Produced by [`CacheBuilder::try_build`](crate::builder::CacheBuilder::try_build)
/// and [`CacheConfig::validate`](crate::builder::CacheConfig::validate).
///
/// # Example
///
/// ```
/// use opaque_cache::builder::CacheBuilder;
///
/// let err = CacheBuilder::new("").try_build_default::<u64, u64>().unwrap_err();
/// assert!(err.to_string().contains("name"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ConfigError(String);

impl ConfigError {
    /// Creates a new `ConfigError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// InvariantError
// ---------------------------------------------------------------------------

/// Error returned when internal cache invariants are violated.
///
/// Produced by [`Cache::check_invariants`](crate::cache::Cache::check_invariants).
/// Carries a human-readable description of which invariant failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct InvariantError(String);

impl InvariantError {
    /// Creates a new `InvariantError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
